//! FIRST and FOLLOW sets, shared by the LL(1) and SLR(1) builders.
//!
//! FIRST is a fixed point seeded with the nullable variables. FOLLOW is
//! built in two passes: a reverse walk over every right side that records
//! what directly follows each variable and which FOLLOW sets must flow
//! into which, then a worklist that pushes those flows until nothing grows.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::lambda;
use crate::symbol::{SymList, Symbol};
use crate::{IndexMap, IndexSet};
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::{HashMap, HashSet};
use log::debug;

/// Extended terminal domain of the set algebra.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookahead {
    /// end of input (`$`)
    End,
    /// λ, only ever in FIRST sets
    Empty,
    Term(Symbol),
}

impl Lookahead {
    /// The lookahead for the next input symbol, `None` meaning end of input.
    pub fn of(next: Option<&Symbol>) -> Self {
        match next {
            Some(s) => Lookahead::Term(s.clone()),
            None => Lookahead::End,
        }
    }

    /// As the drivers report it in a [`ParseError`](crate::ParseError).
    pub fn as_input(&self) -> Option<Symbol> {
        match self {
            Lookahead::Term(s) => Some(s.clone()),
            Lookahead::End | Lookahead::Empty => None,
        }
    }
}

impl From<Symbol> for Lookahead {
    fn from(s: Symbol) -> Self {
        Lookahead::Term(s)
    }
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookahead::End => f.write_str("$"),
            Lookahead::Empty => f.write_str("λ"),
            Lookahead::Term(s) => write!(f, "{s}"),
        }
    }
}

pub type LookaheadSet = IndexSet<Lookahead>;

#[derive(Debug, Clone)]
pub struct GrammarSets {
    /// FIRST(A), holding `Empty` iff A is nullable
    first: IndexMap<Symbol, LookaheadSet>,
    /// FIRST of every right side, computed once
    first_seq: HashMap<SymList, LookaheadSet>,
    /// FOLLOW(A), holding `End` for the start variable
    follow: IndexMap<Symbol, LookaheadSet>,
    /// A → B when FOLLOW(A) ⊆ FOLLOW(B)
    follow_update: IndexMap<Symbol, IndexSet<Symbol>>,
}

impl GrammarSets {
    pub fn new(grammar: &Grammar) -> Result<Self, GrammarError> {
        let start = grammar.require_context_free()?;
        let mut sets = GrammarSets {
            first: grammar
                .variables()
                .map(|v| (v.clone(), LookaheadSet::default()))
                .collect(),
            first_seq: HashMap::new(),
            follow: grammar
                .variables()
                .map(|v| (v.clone(), LookaheadSet::default()))
                .collect(),
            follow_update: IndexMap::default(),
        };
        sets.calculate_first(grammar);
        for p in grammar.productions() {
            let first = sets.first_of(p.rhs());
            sets.first_seq.insert(p.rhs_list().clone(), first);
        }
        sets.follow.entry(start.clone()).or_default().insert(Lookahead::End);
        sets.calculate_follow(grammar);
        Ok(sets)
    }

    fn calculate_first(&mut self, grammar: &Grammar) {
        for v in lambda::nullable_variables(grammar).iter() {
            self.first.entry(v.clone()).or_default().insert(Lookahead::Empty);
        }

        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            for p in grammar.productions() {
                let Some(head) = p.head() else {
                    continue;
                };
                let found = self.first_of(p.rhs());
                let target = self.first.entry(head.clone()).or_default();
                for x in found {
                    if x != Lookahead::Empty {
                        changed |= target.insert(x);
                    }
                }
            }
            if !changed {
                break;
            }
        }
        debug!("FIRST settled after {passes} pass(es)");
    }

    fn calculate_follow(&mut self, grammar: &Grammar) {
        for p in grammar.productions() {
            let Some(head) = p.head() else {
                continue;
            };
            self.update_follow_con(head, p.rhs());
        }
        let queue: VecDeque<Symbol> = self.follow.keys().cloned().collect();
        self.calculate_follow_for(queue);
    }

    /// Right to left over one right side: FIRST of the tail after each
    /// variable goes into its FOLLOW, and a nullable tail links FOLLOW of
    /// the head into it.
    fn update_follow_con(&mut self, target: &Symbol, symbols: &[Symbol]) {
        for (i, s) in symbols.iter().enumerate().rev() {
            if !s.is_variable() {
                continue;
            }
            let tail = self.first_of(&symbols[i + 1..]);
            let spot = self.follow.entry(s.clone()).or_default();
            for x in tail.iter().filter(|x| **x != Lookahead::Empty) {
                spot.insert(x.clone());
            }
            if s != target && tail.contains(&Lookahead::Empty) {
                self.follow_update
                    .entry(target.clone())
                    .or_default()
                    .insert(s.clone());
            }
        }
    }

    fn calculate_follow_for(&mut self, mut queue: VecDeque<Symbol>) {
        let mut in_queue: HashSet<Symbol> = queue.iter().cloned().collect();
        let mut rounds = 0usize;

        while let Some(u) = queue.pop_front() {
            in_queue.remove(&u);
            rounds += 1;

            let src: Vec<Lookahead> = self.follow.get(&u).into_iter().flatten().cloned().collect();
            let Some(dests) = self.follow_update.get(&u) else {
                continue;
            };
            for v in dests {
                let dest = self.follow.entry(v.clone()).or_default();
                let mut grew = false;
                for x in &src {
                    grew |= dest.insert(x.clone());
                }
                if grew && in_queue.insert(v.clone()) {
                    queue.push_back(v.clone());
                }
            }
        }
        debug!("FOLLOW settled after {rounds} worklist round(s)");
    }

    pub fn first(&self, variable: &Symbol) -> Option<&LookaheadSet> {
        self.first.get(variable)
    }

    pub fn follow(&self, variable: &Symbol) -> Option<&LookaheadSet> {
        self.follow.get(variable)
    }

    pub fn is_nullable(&self, variable: &Symbol) -> bool {
        self.first(variable)
            .is_some_and(|f| f.contains(&Lookahead::Empty))
    }

    /// FIRST of a string of symbols; holds `Empty` iff the whole string is
    /// nullable.
    pub fn first_of(&self, symbols: &[Symbol]) -> LookaheadSet {
        if let Some(known) = self.first_seq.get(symbols) {
            return known.clone();
        }
        let mut out = LookaheadSet::default();
        for s in symbols {
            if s.is_terminal() {
                out.insert(Lookahead::Term(s.clone()));
                return out;
            }
            let Some(first) = self.first.get(s) else {
                return out;
            };
            out.extend(first.iter().filter(|x| **x != Lookahead::Empty).cloned());
            if !first.contains(&Lookahead::Empty) {
                return out;
            }
        }
        out.insert(Lookahead::Empty);
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::symbol::{Convention, Words};
    use pretty_assertions::assert_eq;

    pub(crate) const EXPR_LL1: &str = "E -> T E'
        E' -> + T E' | λ
        T -> F T'
        T' -> * F T' | λ
        F -> ( E ) | id";

    fn la(items: &[&str]) -> LookaheadSet {
        items
            .iter()
            .map(|s| match *s {
                "$" => Lookahead::End,
                "λ" => Lookahead::Empty,
                t => Lookahead::Term(Symbol::term(t)),
            })
            .collect()
    }

    fn v(name: &str) -> Symbol {
        Symbol::var(name)
    }

    #[test]
    fn expression_first_sets() {
        let sets = GrammarSets::new(&Grammar::parse(EXPR_LL1, &Words).unwrap()).unwrap();
        assert_eq!(sets.first(&v("E")), Some(&la(&["(", "id"])));
        assert_eq!(sets.first(&v("E'")), Some(&la(&["+", "λ"])));
        assert_eq!(sets.first(&v("T'")), Some(&la(&["*", "λ"])));
        assert!(sets.is_nullable(&v("T'")) && !sets.is_nullable(&v("T")));
        assert_eq!(
            sets.first_of(&Words.symbols("T' E'")),
            la(&["*", "+", "λ"])
        );
    }

    #[test]
    fn expression_follow_sets() {
        let sets = GrammarSets::new(&Grammar::parse(EXPR_LL1, &Words).unwrap()).unwrap();
        assert_eq!(sets.follow(&v("E")), Some(&la(&["$", ")"])));
        assert_eq!(sets.follow(&v("E'")), Some(&la(&["$", ")"])));
        assert_eq!(sets.follow(&v("T")), Some(&la(&["+", "$", ")"])));
        assert_eq!(sets.follow(&v("F")), Some(&la(&["*", "+", "$", ")"])));
    }

    #[test]
    fn nullable_chain_reaches_first() {
        let sets =
            GrammarSets::new(&Grammar::parse("S -> A B c\nA -> λ | a\nB -> λ | b", &Words).unwrap()).unwrap();
        assert_eq!(sets.first(&v("S")), Some(&la(&["a", "b", "c"])));
        assert_eq!(sets.follow(&v("A")), Some(&la(&["b", "c"])));
        assert_eq!(sets.follow(&v("S")), Some(&la(&["$"])));
    }
}
