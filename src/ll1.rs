//! LL(1) parse tables and the predictive stack driver.
//!
//! The table keeps every candidate production per cell, so a grammar that
//! is not LL(1) still yields a usable table: each conflicting cell is
//! reported and the driver takes the first candidate.

use crate::error::{GrammarError, ParseError};
use crate::grammar::{Grammar, Production};
use crate::limits::{CancelFlag, Checkpoint, Guard, NeverContinue, SearchLimits};
use crate::sets::{GrammarSets, Lookahead};
use crate::symbol::{Sentential, Symbol};
use crate::{IndexMap, Step};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use log::{debug, trace, warn};

/// Index into [`Ll1Table::productions`].
pub type ProdId = usize;

/// A cell that more than one production claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Conflict {
    pub variable: Symbol,
    pub lookahead: Lookahead,
    pub candidates: Vec<Production>,
}

impl fmt::Display for Ll1Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]:", self.variable, self.lookahead)?;
        for p in &self.candidates {
            write!(f, " {p};")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Ll1Table {
    start: Symbol,
    productions: Vec<Production>,
    cells: IndexMap<Symbol, IndexMap<Lookahead, Vec<ProdId>>>,
    sets: GrammarSets,
    conflicts: Vec<Ll1Conflict>,
}

impl Ll1Table {
    pub fn build(grammar: &Grammar) -> Result<Self, GrammarError> {
        let start = grammar.require_context_free()?.clone();
        let sets = GrammarSets::new(grammar)?;
        let productions: Vec<Production> = grammar.productions().cloned().collect();

        let mut cells: IndexMap<Symbol, IndexMap<Lookahead, Vec<ProdId>>> = IndexMap::default();
        for (id, p) in productions.iter().enumerate() {
            let Some(head) = p.head() else {
                continue;
            };
            let row = cells.entry(head.clone()).or_default();
            let first = sets.first_of(p.rhs());
            let mut claim = |lookahead: &Lookahead| {
                let cell = row.entry(lookahead.clone()).or_default();
                if !cell.contains(&id) {
                    cell.push(id);
                }
            };
            for x in first.iter().filter(|x| **x != Lookahead::Empty) {
                claim(x);
            }
            if first.contains(&Lookahead::Empty) {
                for x in sets.follow(head).into_iter().flatten() {
                    claim(x);
                }
            }
        }

        let conflicts: Vec<Ll1Conflict> = get_conflicts(&cells)
            .map(|(variable, lookahead, ids)| Ll1Conflict {
                variable: variable.clone(),
                lookahead: lookahead.clone(),
                candidates: ids.iter().map(|&i| productions[i].clone()).collect(),
            })
            .collect();
        if conflicts.is_empty() {
            debug!("LL(1) table built: {} production(s)", productions.len());
        } else {
            warn!("grammar is not LL(1): {} conflicting cell(s)", conflicts.len());
            for c in &conflicts {
                debug!("LL(1) conflict {c}");
            }
        }

        Ok(Ll1Table {
            start,
            productions,
            cells,
            sets,
            conflicts,
        })
    }

    pub fn start(&self) -> &Symbol {
        &self.start
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn sets(&self) -> &GrammarSets {
        &self.sets
    }

    pub fn conflicts(&self) -> &[Ll1Conflict] {
        &self.conflicts
    }

    pub fn is_ll1(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Every production claiming the cell.
    pub fn candidates(&self, variable: &Symbol, lookahead: &Lookahead) -> impl Iterator<Item = &Production> {
        self.cells
            .get(variable)
            .and_then(|row| row.get(lookahead))
            .into_iter()
            .flatten()
            .map(|&id| &self.productions[id])
    }

    /// The production the driver uses: the first candidate.
    pub fn entry(&self, variable: &Symbol, lookahead: &Lookahead) -> Option<&Production> {
        self.candidates(variable, lookahead).next()
    }

    /// Lookaheads with a non-empty cell for `variable`, as input symbols.
    pub fn expected(&self, variable: &Symbol) -> Vec<Option<Symbol>> {
        self.cells
            .get(variable)
            .into_iter()
            .flat_map(|row| row.keys())
            .map(Lookahead::as_input)
            .collect()
    }

    /// A driver on the default schedule that stops at the first checkpoint,
    /// so a table that expands forever ends in [`Step::Abandoned`].
    pub fn driver(&self, input: &[Symbol]) -> Ll1Driver<'_> {
        Ll1Driver::new(self, input, SearchLimits::default(), NeverContinue)
    }
}

/// Scans the table for cells holding more than one candidate.
fn get_conflicts(
    table: &IndexMap<Symbol, IndexMap<Lookahead, Vec<ProdId>>>,
) -> impl Iterator<Item = (&Symbol, &Lookahead, &[ProdId])> {
    table.iter().flat_map(|(variable, row)| {
        row.iter().filter_map(move |(lookahead, ids)| {
            if ids.len() > 1 {
                Some((variable, lookahead, ids.as_slice()))
            } else {
                None
            }
        })
    })
}

/// Predictive parse of one input. Each [`step`](Self::step) either expands
/// the variable on top of the stack or matches a terminal against the input.
#[derive(Debug, Clone)]
pub struct Ll1Driver<'t, C = NeverContinue> {
    table: &'t Ll1Table,
    input: Vec<Symbol>,
    position: usize,
    /// top of the stack is the last element
    stack: Vec<Symbol>,
    applied: Vec<Production>,
    guard: Guard<C>,
    done: Option<Step>,
}

impl<'t, C: Checkpoint> Ll1Driver<'t, C> {
    /// A driver that consults `checkpoint` on the `limits` schedule of
    /// expansions.
    pub fn new(table: &'t Ll1Table, input: &[Symbol], limits: SearchLimits, checkpoint: C) -> Self {
        Ll1Driver {
            table,
            input: input.to_vec(),
            position: 0,
            stack: vec![table.start.clone()],
            applied: Vec::new(),
            guard: Guard::new(limits, checkpoint),
            done: None,
        }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.guard.cancel.clone()
    }

    fn finish(&mut self, step: Step) -> Step {
        trace!("LL(1) finished: {step:?}");
        self.done = Some(step.clone());
        step
    }

    /// One move. Once the parse has ended, repeats the final outcome.
    pub fn step(&mut self) -> Step {
        if let Some(done) = &self.done {
            return done.clone();
        }
        if !self.guard.advance() {
            return self.finish(Step::Abandoned);
        }
        let next = self.input.get(self.position).cloned();
        let Some(top) = self.stack.pop() else {
            let outcome = match next {
                None => Step::Accept,
                Some(found) => Step::Reject(ParseError {
                    found: Some(found),
                    expected: vec![None],
                }),
            };
            return self.finish(outcome);
        };

        if top.is_terminal() {
            if next.as_ref() == Some(&top) {
                trace!("LL(1) match {top}");
                self.position += 1;
                return Step::Continue;
            }
            self.stack.push(top.clone());
            return self.finish(Step::Reject(ParseError {
                found: next,
                expected: vec![Some(top)],
            }));
        }

        let lookahead = Lookahead::of(next.as_ref());
        let Some(production) = self.table.entry(&top, &lookahead) else {
            let expected = self.table.expected(&top);
            self.stack.push(top);
            return self.finish(Step::Reject(ParseError {
                found: next,
                expected,
            }));
        };
        trace!("LL(1) expand {production} on {lookahead}");
        self.stack.extend(production.rhs().iter().rev().cloned());
        self.applied.push(production.clone());
        Step::Continue
    }

    /// Steps until the parse ends.
    pub fn run(&mut self) -> Step {
        loop {
            let step = self.step();
            if step.is_done() {
                return step;
            }
        }
    }

    /// Productions expanded so far: a leftmost derivation prefix.
    pub fn applied(&self) -> &[Production] {
        &self.applied
    }

    pub fn stack(&self) -> &[Symbol] {
        &self.stack
    }

    pub fn remaining(&self) -> &[Symbol] {
        &self.input[self.position..]
    }

    /// The current leftmost sentential form: matched input, then the stack
    /// read from the top down.
    pub fn sentential(&self) -> Vec<Symbol> {
        let mut form = self.input[..self.position].to_vec();
        form.extend(self.stack.iter().rev().cloned());
        form
    }
}

impl<C: Checkpoint> fmt::Display for Ll1Driver<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Sentential(&self.sentential()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::tests::EXPR_LL1;
    use crate::symbol::{Convention, Uppercase, Words};
    use alloc::string::ToString;
    use pretty_assertions::assert_eq;

    fn expr() -> Ll1Table {
        Ll1Table::build(&Grammar::parse(EXPR_LL1, &Words).unwrap()).unwrap()
    }

    #[test]
    fn expression_grammar_is_ll1() {
        let table = expr();
        assert!(table.is_ll1());
        assert_eq!(
            table.entry(&Symbol::var("E'"), &Lookahead::End),
            Some(&Production::parse("E'", "", &Words))
        );
        assert_eq!(
            table.entry(&Symbol::var("F"), &Lookahead::Term(Symbol::term("id"))),
            Some(&Production::parse("F", "id", &Words))
        );
        assert_eq!(table.entry(&Symbol::var("F"), &Lookahead::Term(Symbol::term("+"))), None);
    }

    #[test]
    fn drives_id_plus_id_times_id() {
        let table = expr();
        let input = Words.symbols("id + id * id");
        let mut driver = table.driver(&input);
        assert_eq!(driver.run(), Step::Accept);
        assert_eq!(driver.step(), Step::Accept);
        assert_eq!(driver.sentential(), input);
        assert_eq!(driver.applied().first(), Some(&Production::parse("E", "T E'", &Words)));
        assert!(driver.stack().is_empty() && driver.remaining().is_empty());
    }

    #[test]
    fn stepwise_forms() {
        let table = Ll1Table::build(&Grammar::parse("S -> aSb | c", &Uppercase).unwrap()).unwrap();
        let input = Uppercase.symbols("acb");
        let mut driver = table.driver(&input);
        let mut forms = vec![driver.to_string()];
        while driver.step() == Step::Continue {
            forms.push(driver.to_string());
        }
        assert_eq!(forms, ["S", "aSb", "aSb", "acb", "acb", "acb"]);
    }

    #[test]
    fn rejects_with_expectations() {
        let table = expr();
        let mut driver = table.driver(&Words.symbols("id + * id"));
        let Step::Reject(error) = driver.run() else {
            panic!("expected a rejection");
        };
        assert_eq!(error.found, Some(Symbol::term("*")));
        assert_eq!(error.expected, vec![Some(Symbol::term("(")), Some(Symbol::term("id"))]);

        let mut trailing = table.driver(&Words.symbols("id )"));
        assert!(matches!(trailing.run(), Step::Reject(_)));
    }

    #[test]
    fn ambiguous_grammar_reports_conflict() {
        let table = Ll1Table::build(&Grammar::parse("S -> SS | a", &Uppercase).unwrap()).unwrap();
        assert!(!table.is_ll1());
        let conflict = &table.conflicts()[0];
        assert_eq!(conflict.variable, Symbol::var("S"));
        assert_eq!(conflict.lookahead, Lookahead::Term(Symbol::term("a")));
        assert_eq!(conflict.candidates.len(), 2);
        assert_eq!(conflict.to_string(), "[S, a]: S → SS; S → a;");
    }

    #[test]
    fn left_recursion_is_paced() {
        let table = Ll1Table::build(&Grammar::parse("S -> Sa | b", &Uppercase).unwrap()).unwrap();
        let limits = SearchLimits {
            first_checkpoint: 50,
            growth: 2,
        };
        let mut driver = Ll1Driver::new(&table, &Uppercase.symbols("ba"), limits, crate::limits::NeverContinue);
        assert_eq!(driver.run(), Step::Abandoned);
        assert_eq!(table.driver(&Uppercase.symbols("ba")).run(), Step::Abandoned);

        let mut cancelled = table.driver(&Uppercase.symbols("b"));
        cancelled.cancel_flag().cancel();
        assert_eq!(cancelled.run(), Step::Abandoned);
    }
}
