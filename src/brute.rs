//! Breadth-first search over derivations, and step-by-step derivation
//! under the caller's direction.
//!
//! Context-free grammars are searched through leftmost derivations only.
//! A form is dropped when its terminal prefix or suffix disagrees with the
//! target, or when the shortest string it can still derive is too long.
//! Grammars with longer left sides are rewritten at every position; there
//! the only cut is length, and only when no production shrinks the form.
//!
//! A grammar whose nullable variables can pile up without bound makes the
//! search open-ended; the checkpoint schedule is what stops it then.

use crate::derivation::{substitute, DerivationStep, NodeId, ParseNode, ParseTree};
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::limits::{CancelFlag, Checkpoint, Guard, NeverContinue, SearchLimits};
use crate::property;
use crate::symbol::{SymList, Symbol};
use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use either::Either;
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

/// Every `(position, production)` that rewrites `form`: the leftmost
/// variable only, or every place some left side occurs.
pub fn expansions<'a>(
    grammar: &'a Grammar,
    leftmost: bool,
    form: &'a [Symbol],
) -> impl Iterator<Item = (usize, &'a Production)> + 'a {
    if leftmost {
        let at = form.iter().position(Symbol::is_variable);
        Either::Left(at.into_iter().flat_map(move |i| {
            grammar.productions_on(&form[i]).map(move |p| (i, p))
        }))
    } else {
        Either::Right((0..form.len()).flat_map(move |i| {
            grammar
                .productions()
                .filter(move |p| form[i..].starts_with(p.lhs()))
                .map(move |p| (i, p))
        }))
    }
}

/// Length of the shortest terminal string each productive variable derives.
fn min_yields(grammar: &Grammar) -> HashMap<Symbol, usize> {
    let mut yields: HashMap<Symbol, usize> = HashMap::new();
    loop {
        let mut changed = false;
        for p in grammar.productions() {
            let Some(head) = p.head() else {
                continue;
            };
            let total = p.rhs().iter().try_fold(0usize, |acc, s| {
                if s.is_terminal() {
                    Some(acc + 1)
                } else {
                    yields.get(s).map(|y| acc + y)
                }
            });
            if let Some(total) = total {
                let slot = yields.entry(head.clone()).or_insert(usize::MAX);
                if total < *slot {
                    *slot = total;
                    changed = true;
                }
            }
        }
        if !changed {
            return yields;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Searching,
    /// the node whose form is the target
    Accepted(NodeId),
    /// every viable form was expanded
    Rejected,
    /// cancelled, or the checkpoint declined
    Abandoned,
}

impl SearchStatus {
    pub fn is_done(&self) -> bool {
        *self != SearchStatus::Searching
    }
}

/// Exhaustive parser. Also an iterator over the forms it generates, in
/// generation order, ending when the search does.
#[derive(Debug, Clone)]
pub struct BruteParser<'g, C = NeverContinue> {
    grammar: &'g Grammar,
    target: Vec<Symbol>,
    context_free: bool,
    monotone: bool,
    min_yield: HashMap<Symbol, usize>,
    tree: ParseTree,
    queue: VecDeque<NodeId>,
    seen: HashSet<SymList>,
    guard: Guard<C>,
    status: SearchStatus,
    emitted: usize,
}

impl<'g> BruteParser<'g> {
    /// Gives up after the first 500 generated forms.
    pub fn with_defaults(grammar: &'g Grammar, target: &[Symbol]) -> Result<Self, GrammarError> {
        Self::new(grammar, target, SearchLimits::default(), NeverContinue)
    }
}

impl<'g, C: Checkpoint> BruteParser<'g, C> {
    pub fn new(
        grammar: &'g Grammar,
        target: &[Symbol],
        limits: SearchLimits,
        checkpoint: C,
    ) -> Result<Self, GrammarError> {
        let start = grammar.require_start()?.clone();
        let context_free = grammar.productions().all(property::is_restricted_on_lhs);
        let monotone = grammar.productions().all(|p| p.rhs().len() >= p.lhs().len());
        let root: SymList = vec![start].into();
        let mut parser = BruteParser {
            grammar,
            target: target.to_vec(),
            context_free,
            monotone,
            min_yield: if context_free {
                min_yields(grammar)
            } else {
                HashMap::new()
            },
            tree: ParseTree::new(root.clone()),
            queue: VecDeque::from([ParseTree::ROOT]),
            seen: HashSet::from([root]),
            guard: Guard::new(limits, checkpoint),
            status: SearchStatus::Searching,
            emitted: 0,
        };
        if let Some(unknown) = target.iter().find(|s| !grammar.has_terminal(s)) {
            debug!("brute force: `{unknown}` is not a terminal of the grammar");
            parser.status = SearchStatus::Rejected;
        }
        Ok(parser)
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.guard.cancel.clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    /// Forms generated so far, the start variable excluded.
    pub fn generated(&self) -> usize {
        self.tree.len() - 1
    }

    fn viable(&self, form: &[Symbol]) -> bool {
        let n = self.target.len();
        if !self.context_free {
            return !self.monotone || form.len() <= n;
        }
        let mut shortest = 0usize;
        for s in form {
            shortest += if s.is_terminal() {
                1
            } else {
                match self.min_yield.get(s) {
                    Some(&y) => y,
                    None => return false,
                }
            };
            if shortest > n {
                return false;
            }
        }
        let prefix = form.iter().take_while(|s| s.is_terminal()).count();
        let suffix = form.iter().rev().take_while(|s| s.is_terminal()).count();
        if prefix == form.len() {
            return form == self.target.as_slice();
        }
        form[..prefix] == self.target[..prefix] && form[form.len() - suffix..] == self.target[n - suffix..]
    }

    fn finish(&mut self, status: SearchStatus) -> SearchStatus {
        debug!(
            "brute force finished with {status:?} after {} form(s)",
            self.generated()
        );
        self.status = status;
        status
    }

    /// Expands the oldest unexpanded form.
    pub fn step(&mut self) -> SearchStatus {
        if self.status.is_done() {
            return self.status;
        }
        if self.guard.cancel.is_cancelled() {
            return self.finish(SearchStatus::Abandoned);
        }
        let Some(id) = self.queue.pop_front() else {
            return self.finish(SearchStatus::Rejected);
        };
        let form = self.tree.node(id).form.clone();
        let grammar = self.grammar;
        for (position, production) in expansions(grammar, self.context_free, &form) {
            let Some(next) = substitute(&form, production, position) else {
                continue;
            };
            if !self.viable(&next) {
                continue;
            }
            let next: SymList = next.into();
            if !self.seen.insert(next.clone()) {
                continue;
            }
            if !self.guard.advance() {
                return self.finish(SearchStatus::Abandoned);
            }
            let child = self.tree.add_child(id, next.clone(), production.clone(), position);
            trace!("brute force: {production} at {position}");
            if *next == *self.target {
                return self.finish(SearchStatus::Accepted(child));
            }
            self.queue.push_back(child);
        }
        SearchStatus::Searching
    }

    pub fn run(&mut self) -> SearchStatus {
        loop {
            let status = self.step();
            if status.is_done() {
                return status;
            }
        }
    }

    /// Steps from the start variable to the target, once accepted.
    pub fn derivation(&self) -> Option<Vec<DerivationStep>> {
        match self.status {
            SearchStatus::Accepted(id) => Some(self.tree.steps_to(id)),
            _ => None,
        }
    }
}

impl<C: Checkpoint> Iterator for BruteParser<'_, C> {
    type Item = ParseNode;

    fn next(&mut self) -> Option<ParseNode> {
        loop {
            if self.emitted < self.tree.len() {
                let node = self.tree.node(self.emitted).clone();
                self.emitted += 1;
                return Some(node);
            }
            if self.step().is_done() && self.emitted == self.tree.len() {
                return None;
            }
        }
    }
}

/// A derivation built one rewrite at a time by the caller. Every form
/// stays in the history; [`back`](Self::back) only moves the cursor.
#[derive(Debug, Clone)]
pub struct GuidedDerivation<'g> {
    grammar: &'g Grammar,
    tree: ParseTree,
    current: NodeId,
}

impl<'g> GuidedDerivation<'g> {
    pub fn new(grammar: &'g Grammar) -> Result<Self, GrammarError> {
        let start = grammar.require_start()?.clone();
        Ok(GuidedDerivation {
            grammar,
            tree: ParseTree::new(vec![start]),
            current: ParseTree::ROOT,
        })
    }

    pub fn form(&self) -> &[Symbol] {
        &self.tree.node(self.current).form
    }

    /// Every production and position that applies to the current form.
    pub fn options(&self) -> impl Iterator<Item = (usize, &Production)> + '_ {
        expansions(self.grammar, false, self.form())
    }

    pub fn apply(&mut self, production: &Production, position: usize) -> Result<&[Symbol], GrammarError> {
        let next = if self.grammar.contains(production) {
            substitute(self.form(), production, position)
        } else {
            None
        };
        let Some(next) = next else {
            return Err(GrammarError::NotApplicable {
                production: production.clone(),
                position,
            });
        };
        self.current = self
            .tree
            .add_child(self.current, next, production.clone(), position);
        Ok(self.form())
    }

    /// Returns to the previous form; false at the start variable.
    pub fn back(&mut self) -> bool {
        match self.tree.node(self.current).parent {
            Some(parent) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.form().iter().all(Symbol::is_terminal)
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn steps(&self) -> Vec<DerivationStep> {
        self.tree.steps_to(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::replay;
    use crate::grammar::Validity;
    use crate::limits::NeverContinue;
    use crate::symbol::{Convention, Sentential, Uppercase};
    use alloc::string::{String, ToString};
    use pretty_assertions::assert_eq;

    fn g(text: &str) -> Grammar {
        Grammar::parse(text, &Uppercase).unwrap()
    }

    fn p(lhs: &str, rhs: &str) -> Production {
        Production::parse(lhs, rhs, &Uppercase)
    }

    const ABC: &str = "S -> aSBC | aBC
        CB -> BC
        aB -> ab
        bB -> bb
        bC -> bc
        cC -> cc";

    #[test]
    fn finds_leftmost_derivation() {
        let grammar = g("S -> aSb | ab");
        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aabb")).unwrap();
        assert!(matches!(parser.run(), SearchStatus::Accepted(_)));
        let steps = parser.derivation().unwrap();
        let used: Vec<Production> = steps.iter().map(|s| s.production.clone()).collect();
        assert_eq!(used, [p("S", "aSb"), p("S", "ab")]);
        assert_eq!(replay(&grammar, steps).unwrap(), Uppercase.symbols("aabb"));
    }

    #[test]
    fn pruned_search_terminates_on_rejection() {
        let grammar = g("S -> aSb | ab");
        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aab")).unwrap();
        assert_eq!(parser.run(), SearchStatus::Rejected);
        assert_eq!(parser.derivation(), None);

        let unknown = BruteParser::with_defaults(&grammar, &Uppercase.symbols("ac")).unwrap();
        assert_eq!(unknown.status(), SearchStatus::Rejected);
    }

    #[test]
    fn nullable_variables_may_vanish() {
        let grammar = g("S -> AB\nA -> a | λ\nB -> b | λ");
        for (input, expected) in [("b", true), ("ab", true), ("", true), ("ba", false)] {
            let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols(input)).unwrap();
            assert_eq!(matches!(parser.run(), SearchStatus::Accepted(_)), expected, "{input}");
        }
    }

    #[test]
    fn iterates_generated_forms() {
        let grammar = g("S -> aSb | ab");
        let parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("ab")).unwrap();
        let forms: Vec<String> = parser.map(|n| Sentential(&n.form).to_string()).collect();
        assert_eq!(forms, ["S", "ab"]);
    }

    #[test]
    fn unrestricted_grammar_rewrites_anywhere() {
        let grammar = Grammar::parse_with(ABC, &Uppercase, Validity::Unrestricted).unwrap();
        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aabbcc")).unwrap();
        assert!(matches!(parser.run(), SearchStatus::Accepted(_)));
        let steps = parser.derivation().unwrap();
        assert_eq!(replay(&grammar, steps).unwrap(), Uppercase.symbols("aabbcc"));

        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aabcc")).unwrap();
        assert_eq!(parser.run(), SearchStatus::Rejected);
    }

    #[test]
    fn checkpoint_and_cancel_abandon() {
        let grammar = g("S -> aSb | ab");
        let limits = SearchLimits {
            first_checkpoint: 2,
            growth: 2,
        };
        let mut parser =
            BruteParser::new(&grammar, &Uppercase.symbols("aaabbb"), limits, NeverContinue).unwrap();
        assert_eq!(parser.run(), SearchStatus::Abandoned);
        assert_eq!(parser.generated(), 1);

        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aabb")).unwrap();
        parser.cancel_flag().cancel();
        assert_eq!(parser.step(), SearchStatus::Abandoned);

        // the first expansion of `S` yields nothing viable for `aab`
        let mut parser = BruteParser::with_defaults(&grammar, &Uppercase.symbols("aab")).unwrap();
        parser.cancel_flag().cancel();
        assert_eq!(parser.step(), SearchStatus::Abandoned);
        assert_eq!(parser.generated(), 0);
    }

    #[test]
    fn guided_derivation() {
        let grammar = g("S -> aSb | ab");
        let mut guided = GuidedDerivation::new(&grammar).unwrap();
        let options: Vec<(usize, Production)> = guided.options().map(|(i, p)| (i, p.clone())).collect();
        assert_eq!(options, [(0, p("S", "aSb")), (0, p("S", "ab"))]);

        assert_eq!(guided.apply(&p("S", "aSb"), 0).unwrap(), Uppercase.symbols("aSb").as_slice());
        assert_eq!(
            guided.apply(&p("S", "ab"), 0).unwrap_err(),
            GrammarError::NotApplicable {
                production: p("S", "ab"),
                position: 0
            }
        );
        assert!(guided.apply(&p("S", "c"), 1).is_err());
        guided.apply(&p("S", "ab"), 1).unwrap();
        assert!(guided.is_complete());
        assert_eq!(guided.steps().len(), 2);

        assert!(guided.back());
        assert_eq!(guided.form(), Uppercase.symbols("aSb").as_slice());
        assert_eq!(guided.tree().len(), 3);
    }

    #[test]
    fn guided_unrestricted_options() {
        let grammar = Grammar::parse_with(ABC, &Uppercase, Validity::Unrestricted).unwrap();
        let mut guided = GuidedDerivation::new(&grammar).unwrap();
        guided.apply(&p("S", "aBC"), 0).unwrap();
        let options: Vec<(usize, Production)> = guided.options().map(|(i, p)| (i, p.clone())).collect();
        assert_eq!(options, [(0, p("aB", "ab"))]);
    }
}
