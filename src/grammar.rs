//! The grammar model: productions over tagged symbols, plus the derived
//! variable/terminal sets that follow the production set around.

use crate::error::GrammarError;
use crate::symbol::{Convention, Sentential, SymList, Symbol};
use crate::{IndexMap, IndexSet};
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt;

/// Reserved for the end-of-input marker of the table builders.
pub const END_MARKER: &str = "$";

/// Spellings accepted for an empty right side in grammar text.
const LAMBDA_SPELLINGS: [&str; 3] = ["", "λ", "ε"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Production {
    lhs: SymList,
    rhs: SymList,
}

impl Production {
    pub fn new(lhs: impl Into<SymList>, rhs: impl Into<SymList>) -> Self {
        Production {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// A production restricted on its LHS: `head → rhs`.
    pub fn rule(head: Symbol, rhs: impl Into<SymList>) -> Self {
        Self::new([head], rhs)
    }

    /// Reads both sides with `convention`; `λ`, `ε` or nothing means an
    /// empty right side.
    pub fn parse<C: Convention + ?Sized>(lhs: &str, rhs: &str, convention: &C) -> Self {
        Self::new(convention.symbols(lhs), read_rhs(rhs, convention))
    }

    pub fn lhs(&self) -> &[Symbol] {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    pub fn rhs_list(&self) -> &SymList {
        &self.rhs
    }

    /// The LHS variable, when the LHS is exactly one variable.
    pub fn head(&self) -> Option<&Symbol> {
        match &*self.lhs {
            [v] if v.is_variable() => Some(v),
            _ => None,
        }
    }

    /// Same right side, new single-variable LHS.
    pub fn with_head(&self, head: Symbol) -> Self {
        Production {
            lhs: [head].into(),
            rhs: self.rhs.clone(),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.lhs.iter().chain(self.rhs.iter())
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", Sentential(&self.lhs), Sentential(&self.rhs))
    }
}

fn read_rhs<C: Convention + ?Sized>(text: &str, convention: &C) -> Vec<Symbol> {
    let text = text.trim();
    if LAMBDA_SPELLINGS.contains(&text) {
        Vec::new()
    } else {
        convention.symbols(text)
    }
}

/// Which productions a grammar accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validity {
    /// every LHS is a single variable
    #[default]
    ContextFree,
    /// any non-empty LHS
    Unrestricted,
    /// only the first production added must be restricted on its LHS, as
    /// for grammars converted from automata
    FirstRestricted,
}

/// A grammar owns its productions; the variable and terminal sets are
/// derived from them and kept in step on every insert and removal.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    validity: Validity,
    start: Option<Symbol>,
    productions: IndexSet<Production>,
    /// symbol → number of occurrences across all productions
    variables: IndexMap<Symbol, usize>,
    terminals: IndexMap<Symbol, usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validity(validity: Validity) -> Self {
        Grammar {
            validity,
            ..Self::default()
        }
    }

    /// Reads one `LHS -> alt | alt | ...` line per production group.
    /// The first LHS that is a single variable becomes the start variable.
    pub fn parse<C: Convention + ?Sized>(text: &str, convention: &C) -> Result<Self, GrammarError> {
        Self::parse_with(text, convention, Validity::ContextFree)
    }

    pub fn parse_with<C: Convention + ?Sized>(
        text: &str,
        convention: &C,
        validity: Validity,
    ) -> Result<Self, GrammarError> {
        let mut grammar = Grammar::with_validity(validity);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((lhs, alternatives)) = line.split_once("->").or_else(|| line.split_once('→'))
            else {
                return Err(GrammarError::Syntax(line.to_string()));
            };
            let lhs: SymList = convention.symbols(lhs).into();
            for alternative in alternatives.split('|') {
                grammar.add_production(Production::new(lhs.clone(), read_rhs(alternative, convention)))?;
            }
            if grammar.start.is_none() {
                if let [head] = &*lhs {
                    if head.is_variable() {
                        grammar.start = Some(head.clone());
                    }
                }
            }
        }
        Ok(grammar)
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn start(&self) -> Option<&Symbol> {
        self.start.as_ref()
    }

    pub fn set_start(&mut self, start: Symbol) -> Result<(), GrammarError> {
        if !start.is_variable() {
            return Err(GrammarError::StartNotVariable(start));
        }
        self.start = Some(start);
        Ok(())
    }

    pub fn require_start(&self) -> Result<&Symbol, GrammarError> {
        self.start.as_ref().ok_or(GrammarError::MissingStart)
    }

    /// Entry check for the normalization and table pipelines: the start
    /// variable is set and every LHS is a single variable.
    pub fn require_context_free(&self) -> Result<&Symbol, GrammarError> {
        let start = self.require_start()?;
        if let Some(p) = self.productions.iter().find(|p| p.head().is_none()) {
            return Err(GrammarError::UnrestrictedLhs(p.clone()));
        }
        Ok(start)
    }

    fn check(&self, production: &Production) -> Result<(), GrammarError> {
        if production.lhs().is_empty() {
            return Err(GrammarError::EmptyLhs(production.clone()));
        }
        if let Some(bad) = production
            .symbols()
            .find(|s| s.name().is_empty() || s.name() == END_MARKER)
        {
            return Err(GrammarError::ReservedSymbol(bad.name().to_string()));
        }
        let restricted = production.head().is_some();
        match self.validity {
            Validity::ContextFree if !restricted => {
                Err(GrammarError::UnrestrictedLhs(production.clone()))
            }
            Validity::FirstRestricted if !restricted && self.productions.is_empty() => {
                Err(GrammarError::UnrestrictedLhs(production.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Returns whether the production was new.
    pub fn add_production(&mut self, production: Production) -> Result<bool, GrammarError> {
        self.check(&production)?;
        Ok(self.insert(production))
    }

    /// Adds every production or, on the first invalid one, none of them.
    pub fn add_productions(
        &mut self,
        productions: impl IntoIterator<Item = Production>,
    ) -> Result<(), GrammarError> {
        let mut staged = self.clone();
        for p in productions {
            staged.add_production(p)?;
        }
        *self = staged;
        Ok(())
    }

    fn insert(&mut self, production: Production) -> bool {
        if self.productions.contains(&production) {
            return false;
        }
        for s in production.symbols() {
            let counts = if s.is_variable() {
                &mut self.variables
            } else {
                &mut self.terminals
            };
            *counts.entry(s.clone()).or_insert(0) += 1;
        }
        self.productions.insert(production)
    }

    pub fn remove_production(&mut self, production: &Production) -> bool {
        if !self.productions.shift_remove(production) {
            return false;
        }
        for s in production.symbols() {
            let counts = if s.is_variable() {
                &mut self.variables
            } else {
                &mut self.terminals
            };
            if let Some(n) = counts.get_mut(s) {
                *n -= 1;
                if *n == 0 {
                    counts.shift_remove(s);
                }
            }
        }
        true
    }

    /// Same start and validity, different productions. The productions are
    /// trusted to be valid; the removers only ever produce restricted ones.
    pub fn with_productions(&self, productions: impl IntoIterator<Item = Production>) -> Grammar {
        let mut out = Grammar {
            validity: self.validity,
            start: self.start.clone(),
            ..Grammar::default()
        };
        for p in productions {
            out.insert(p);
        }
        out
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.productions.iter()
    }

    pub fn productions_on<'a>(&'a self, head: &'a Symbol) -> impl Iterator<Item = &'a Production> {
        self.productions
            .iter()
            .filter(move |p| p.head() == Some(head))
    }

    pub fn contains(&self, production: &Production) -> bool {
        self.productions.contains(production)
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.variables.keys()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Symbol> {
        self.terminals.keys()
    }

    pub fn has_variable(&self, symbol: &Symbol) -> bool {
        self.variables.contains_key(symbol)
    }

    pub fn has_terminal(&self, symbol: &Symbol) -> bool {
        self.terminals.contains_key(symbol)
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Splits an input string into terminals, longest known terminal first.
    /// A character no terminal starts with becomes a terminal of its own,
    /// which the parsers then reject.
    pub fn lex_input(&self, text: &str) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut rest = text.trim_start();
        while let Some(c) = rest.chars().next() {
            let known = self
                .terminals
                .keys()
                .map(Symbol::name)
                .filter(|name| rest.starts_with(*name))
                .max_by_key(|name| name.len());
            let len = known.map_or(c.len_utf8(), str::len);
            out.push(Symbol::term(&rest[..len]));
            rest = rest[len..].trim_start();
        }
        out
    }
}

/// Two grammars are equal when they share a start variable and the same
/// production set, in any order.
impl PartialEq for Grammar {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.productions == other.productions
    }
}

impl Eq for Grammar {}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.productions {
            writeln!(f, "{p}")?;
        }
        Ok(())
    }
}
