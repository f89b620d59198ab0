//! Removal of unproductive and unreachable variables.

use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::symbol::Symbol;
use crate::unit::DependencyGraph;
use crate::IndexSet;
use log::{debug, warn};

/// Variables that derive some terminal string (λ counts).
pub fn productive_variables(grammar: &Grammar) -> IndexSet<Symbol> {
    let mut productive: IndexSet<Symbol> = IndexSet::default();
    loop {
        let mut changed = false;
        for p in grammar.productions() {
            let Some(head) = p.head() else {
                continue;
            };
            if productive.contains(head) {
                continue;
            }
            if p.rhs().iter().all(|s| s.is_terminal() || productive.contains(s)) {
                productive.insert(head.clone());
                changed = true;
            }
        }
        if !changed {
            return productive;
        }
    }
}

/// Variables that occur in some sentential form derived from the start.
/// Empty when the grammar has no start.
pub fn reachable_variables(grammar: &Grammar) -> IndexSet<Symbol> {
    let Some(start) = grammar.start() else {
        return IndexSet::default();
    };
    let mut reachable = DependencyGraph::occurrences(grammar).dependencies(start);
    reachable.shift_insert(0, start.clone());
    reachable
}

#[derive(Debug, Clone)]
pub struct UselessRemoval {
    pub grammar: Grammar,
    pub unproductive: IndexSet<Symbol>,
    pub unreachable: IndexSet<Symbol>,
    /// no terminal survived, so the grammar derives no non-empty string
    pub empty_language: bool,
}

fn uses_any(p: &Production, variables: &IndexSet<Symbol>) -> bool {
    p.symbols().any(|s| variables.contains(s))
}

/// Alternates the two cuts until neither removes anything.
pub fn remove_useless(grammar: &Grammar) -> Result<UselessRemoval, GrammarError> {
    grammar.require_context_free()?;
    let mut current = grammar.clone();
    let mut unproductive: IndexSet<Symbol> = IndexSet::default();
    let mut unreachable: IndexSet<Symbol> = IndexSet::default();

    loop {
        let productive = productive_variables(&current);
        let dead: IndexSet<Symbol> = current
            .variables()
            .filter(|v| !productive.contains(*v))
            .cloned()
            .collect();
        if !dead.is_empty() {
            debug!("unproductive: {dead:?}");
            current = current.with_productions(current.productions().filter(|p| !uses_any(p, &dead)).cloned());
            unproductive.extend(dead.iter().cloned());
        }

        let reachable = reachable_variables(&current);
        let lost: IndexSet<Symbol> = current
            .variables()
            .filter(|v| !reachable.contains(*v))
            .cloned()
            .collect();
        if !lost.is_empty() {
            debug!("unreachable: {lost:?}");
            current = current.with_productions(current.productions().filter(|p| !uses_any(p, &lost)).cloned());
            unreachable.extend(lost.iter().cloned());
        }

        if dead.is_empty() && lost.is_empty() {
            break;
        }
    }

    let empty_language = current.terminal_count() == 0;
    if empty_language {
        warn!("grammar accepts no strings: no terminal survived useless-production removal");
    }
    Ok(UselessRemoval {
        grammar: current,
        unproductive,
        unreachable,
        empty_language,
    })
}
