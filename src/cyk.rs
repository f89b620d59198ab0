//! CYK recognition over a Chomsky normal form grammar, and the tracer that
//! turns a filled table back into a derivation.
//!
//! Each cell records, for every variable placed in it, the first production
//! and split point that placed it. Walking those records from the top cell
//! down yields a tree over the CNF grammar, which [`parse`] then carries
//! back to the grammar normalization started from.

use crate::derivation::{Derivation, DerivationTree};
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::normalize::Normalization;
use crate::property;
use crate::symbol::Symbol;
use crate::IndexMap;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashMap;
use log::{debug, trace, warn};

/// Why a variable sits in a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// `A → a` over a span of one
    Terminal(Production),
    /// `A → BC`, with `B` covering the first `split` symbols
    Split { production: Production, split: usize },
}

/// Cells indexed by span start and span length.
#[derive(Debug, Clone, Default)]
pub struct CykTable {
    rows: Vec<Vec<IndexMap<Symbol, Provenance>>>,
}

impl CykTable {
    /// Variables deriving `input[start..start + len]`.
    pub fn cell(&self, start: usize, len: usize) -> Option<&IndexMap<Symbol, Provenance>> {
        self.rows.get(len.checked_sub(1)?)?.get(start)
    }

    /// Span lengths filled so far.
    pub fn filled(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CykState {
    Idle,
    /// spans up to `len` are filled
    Running { len: usize },
    Accepted,
    Rejected,
}

impl CykState {
    pub fn is_done(&self) -> bool {
        matches!(self, CykState::Accepted | CykState::Rejected)
    }
}

#[derive(Debug, Clone)]
pub struct CykParser<'g> {
    start: Symbol,
    input: Vec<Symbol>,
    terminals: HashMap<&'g Symbol, Vec<&'g Production>>,
    pairs: Vec<&'g Production>,
    grammar: &'g Grammar,
    table: CykTable,
    state: CykState,
}

impl<'g> CykParser<'g> {
    /// Fails unless every production of `cnf` is `A → BC` or `A → a`.
    pub fn new(cnf: &'g Grammar, input: &[Symbol]) -> Result<Self, GrammarError> {
        let start = cnf.require_context_free()?.clone();
        if let Some(bad) = cnf.productions().find(|p| !property::is_chomsky(p)) {
            return Err(GrammarError::BadGrammarShape(bad.clone()));
        }
        let mut terminals: HashMap<&Symbol, Vec<&Production>> = HashMap::new();
        let mut pairs = Vec::new();
        for p in cnf.productions() {
            match p.rhs() {
                [t] => terminals.entry(t).or_default().push(p),
                _ => pairs.push(p),
            }
        }
        Ok(CykParser {
            start,
            input: input.to_vec(),
            terminals,
            pairs,
            grammar: cnf,
            table: CykTable::default(),
            state: CykState::Idle,
        })
    }

    pub fn state(&self) -> CykState {
        self.state
    }

    pub fn table(&self) -> &CykTable {
        &self.table
    }

    pub fn input(&self) -> &[Symbol] {
        &self.input
    }

    fn fill_terminals(&mut self) {
        let row: Vec<IndexMap<Symbol, Provenance>> = self
            .input
            .iter()
            .map(|t| {
                let mut cell: IndexMap<Symbol, Provenance> = IndexMap::default();
                for p in self.terminals.get(t).into_iter().flatten() {
                    if let Some(head) = p.head() {
                        cell.entry(head.clone())
                            .or_insert_with(|| Provenance::Terminal((*p).clone()));
                    }
                }
                cell
            })
            .collect();
        self.table.rows.push(row);
    }

    fn fill_span(&mut self, len: usize) {
        let n = self.input.len();
        let mut row = Vec::with_capacity(n + 1 - len);
        for start in 0..=n - len {
            let mut cell: IndexMap<Symbol, Provenance> = IndexMap::default();
            for split in 1..len {
                let (Some(left), Some(right)) = (
                    self.table.cell(start, split),
                    self.table.cell(start + split, len - split),
                ) else {
                    continue;
                };
                for p in &self.pairs {
                    let (Some(head), [b, c]) = (p.head(), p.rhs()) else {
                        continue;
                    };
                    if !cell.contains_key(head) && left.contains_key(b) && right.contains_key(c) {
                        cell.insert(
                            head.clone(),
                            Provenance::Split {
                                production: (*p).clone(),
                                split,
                            },
                        );
                    }
                }
            }
            row.push(cell);
        }
        self.table.rows.push(row);
    }

    fn decide(&self) -> CykState {
        let n = self.input.len();
        if self.table.cell(0, n).is_some_and(|c| c.contains_key(&self.start)) {
            CykState::Accepted
        } else {
            CykState::Rejected
        }
    }

    /// Fills one more span length; the first call also screens the input.
    pub fn step(&mut self) -> CykState {
        let n = self.input.len();
        let state = self.state;
        self.state = match state {
            CykState::Idle => {
                if let Some(unknown) = self.input.iter().find(|t| !self.grammar.has_terminal(t)) {
                    debug!("CYK: `{unknown}` is not a terminal of the grammar");
                    CykState::Rejected
                } else if n == 0 {
                    CykState::Rejected
                } else {
                    self.fill_terminals();
                    if n == 1 { self.decide() } else { CykState::Running { len: 1 } }
                }
            }
            CykState::Running { len } => {
                self.fill_span(len + 1);
                trace!("CYK: filled spans of length {}", len + 1);
                if len + 1 == n {
                    self.decide()
                } else {
                    CykState::Running { len: len + 1 }
                }
            }
            done => done,
        };
        self.state
    }

    pub fn run(&mut self) -> CykState {
        while !self.step().is_done() {}
        self.state
    }

    /// The derivation tree over the CNF grammar, once accepted.
    pub fn tree(&self) -> Option<DerivationTree> {
        if self.state != CykState::Accepted {
            return None;
        }
        self.build(&self.start, 0, self.input.len())
    }

    fn build(&self, symbol: &Symbol, start: usize, len: usize) -> Option<DerivationTree> {
        match self.table.cell(start, len)?.get(symbol)? {
            Provenance::Terminal(p) => Some(DerivationTree::node(
                symbol.clone(),
                p.clone(),
                vec![DerivationTree::leaf(self.input.get(start)?.clone())],
            )),
            Provenance::Split { production, split } => {
                let [b, c] = production.rhs() else {
                    return None;
                };
                let left = self.build(b, start, *split)?;
                let right = self.build(c, start + split, len - split)?;
                Some(DerivationTree::node(
                    symbol.clone(),
                    production.clone(),
                    vec![left, right],
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CykOutcome {
    /// with a derivation over the original grammar
    Accepted(Derivation),
    Rejected,
    /// the normalized grammar derives no terminal string
    EmptyLanguage,
}

impl CykOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CykOutcome::Accepted(_))
    }

    pub fn derivation(&self) -> Option<&Derivation> {
        match self {
            CykOutcome::Accepted(d) => Some(d),
            _ => None,
        }
    }
}

/// Recognizes `input` with the CNF grammar of `normal` and traces an
/// accepted string back to the original grammar. The empty string is
/// decided by whether the original start variable was nullable.
pub fn parse(normal: &Normalization, input: &[Symbol]) -> Result<CykOutcome, GrammarError> {
    let start = normal.original.require_start()?;
    if input.is_empty() {
        if !normal.start_derives_lambda() {
            return Ok(CykOutcome::Rejected);
        }
        return Ok(normal
            .nullable()
            .empty_derivation(start)
            .map_or(CykOutcome::Rejected, |t| CykOutcome::Accepted(Derivation::new(t))));
    }
    if normal.empty_language() {
        warn!("CYK: the normalized grammar generates no strings");
        return Ok(CykOutcome::EmptyLanguage);
    }
    let mut parser = CykParser::new(normal.cnf_grammar(), input)?;
    if parser.run() != CykState::Accepted {
        return Ok(CykOutcome::Rejected);
    }
    Ok(parser
        .tree()
        .map_or(CykOutcome::Rejected, |tree| {
            CykOutcome::Accepted(Derivation::new(normal.restore(tree)))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::HelperNaming;
    use crate::derivation::replay;
    use crate::normalize::normalize;
    use crate::symbol::{Convention, Uppercase};
    use alloc::string::ToString;
    use pretty_assertions::assert_eq;

    fn g(text: &str) -> Grammar {
        Grammar::parse(text, &Uppercase).unwrap()
    }

    fn accepts(normal: &Normalization, input: &str) -> bool {
        parse(normal, &Uppercase.symbols(input)).unwrap().is_accepted()
    }

    #[test]
    fn fills_one_span_per_step() {
        let cnf = g("S -> AB | BA\nA -> a\nB -> b");
        let mut parser = CykParser::new(&cnf, &Uppercase.symbols("ab")).unwrap();
        assert_eq!(parser.state(), CykState::Idle);
        assert_eq!(parser.step(), CykState::Running { len: 1 });
        assert_eq!(parser.table().filled(), 1);
        assert_eq!(parser.step(), CykState::Accepted);
        assert_eq!(parser.step(), CykState::Accepted);
        let top = parser.table().cell(0, 2).unwrap();
        assert_eq!(
            top.get(&Symbol::var("S")),
            Some(&Provenance::Split {
                production: Production::parse("S", "AB", &Uppercase),
                split: 1
            })
        );
        assert_eq!(parser.tree().unwrap().frontier(), Uppercase.symbols("ab"));
    }

    #[test]
    fn unknown_terminal_fails_fast() {
        let cnf = g("S -> AB\nA -> a\nB -> b");
        let mut parser = CykParser::new(&cnf, &Uppercase.symbols("ac")).unwrap();
        assert_eq!(parser.step(), CykState::Rejected);
        assert_eq!(parser.table().filled(), 0);
        assert_eq!(parser.tree(), None);
    }

    #[test]
    fn needs_chomsky_form() {
        let not_cnf = g("S -> aSb | ab");
        assert_eq!(
            CykParser::new(&not_cnf, &[]).unwrap_err(),
            GrammarError::BadGrammarShape(Production::parse("S", "aSb", &Uppercase))
        );
    }

    #[test]
    fn traces_back_to_original() {
        let grammar = g("S -> aSb | ab");
        let normal = normalize(&grammar, HelperNaming::default()).unwrap();
        let outcome = parse(&normal, &Uppercase.symbols("aaabbb")).unwrap();
        let derivation = outcome.derivation().unwrap();
        assert_eq!(derivation.to_string(), "S ⇒ aSb ⇒ aaSbb ⇒ aaabbb");
        assert_eq!(
            replay(&grammar, derivation.steps()).unwrap(),
            Uppercase.symbols("aaabbb")
        );
        assert!(!accepts(&normal, "aab"));
        assert!(!accepts(&normal, "abab"));
    }

    #[test]
    fn empty_input_follows_nullable_start() {
        let nullable = normalize(&g("S -> AB\nA -> a | λ\nB -> b | λ"), HelperNaming::default()).unwrap();
        let outcome = parse(&nullable, &[]).unwrap();
        let derivation = outcome.derivation().unwrap();
        assert!(derivation.derived().is_empty());
        assert_eq!(derivation.to_string(), "S ⇒ AB ⇒ B ⇒ λ");

        let strict = normalize(&g("S -> a"), HelperNaming::default()).unwrap();
        assert!(accepts(&strict, "a"));
        assert!(!accepts(&strict, ""));
        assert!(!accepts(&strict, "aa"));
    }

    #[test]
    fn empty_language_is_a_classification() {
        let normal = normalize(&g("S -> aS"), HelperNaming::default()).unwrap();
        assert_eq!(
            parse(&normal, &Uppercase.symbols("a")).unwrap(),
            CykOutcome::EmptyLanguage
        );
    }
}
