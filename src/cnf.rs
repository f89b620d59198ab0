//! Chomsky normal form conversion of a lambda-free, unit-free grammar.
//!
//! Each production is split on its own: terminals in long right sides are
//! replaced by stand-in variables (`H → t`), then right sides longer than
//! two are cut into `A → x₁R` with `R` standing for the rest. Stand-ins are
//! memoized per right side so equal substrings share one helper.

use crate::derivation::DerivationTree;
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::property;
use crate::symbol::{Sentential, SymList, Symbol};
use crate::{IndexMap, IndexSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashSet;
use log::{debug, warn};

/// How fresh helper variables are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HelperNaming {
    /// `H1`, `H2`, … skipping any name already in use
    #[default]
    Unbounded,
    /// single uppercase letters not already in use; conversion fails once
    /// all 26 are taken
    Bounded,
}

/// Per-conversion name source. Names of every symbol in the grammar are
/// taken up front so helpers never collide with them.
#[derive(Debug, Clone)]
struct HelperNames {
    naming: HelperNaming,
    taken: HashSet<String>,
    counter: usize,
    /// helpers minted after the letters ran out
    overflow: usize,
}

impl HelperNames {
    fn new(grammar: &Grammar, naming: HelperNaming) -> Self {
        let taken = grammar
            .variables()
            .chain(grammar.terminals())
            .map(|s| s.name().to_string())
            .collect();
        HelperNames {
            naming,
            taken,
            counter: 0,
            overflow: 0,
        }
    }

    fn mint(&mut self) -> Symbol {
        if self.naming == HelperNaming::Bounded {
            for c in 'A'..='Z' {
                let name = c.to_string();
                if self.taken.insert(name.clone()) {
                    return Symbol::var(&name);
                }
            }
            self.overflow += 1;
        }
        loop {
            self.counter += 1;
            let name = format!("H{}", self.counter);
            if self.taken.insert(name.clone()) {
                return Symbol::var(&name);
            }
        }
    }
}

/// Which variables produce a given right side.
///
/// Seeded with the grammar being converted and extended with every helper,
/// recorded against the string it stands for.
#[derive(Debug, Clone, Default)]
pub struct ProductionDirectory {
    by_rhs: IndexMap<SymList, IndexSet<Symbol>>,
    by_lhs: IndexMap<Symbol, usize>,
}

impl ProductionDirectory {
    pub fn new(grammar: &Grammar) -> Self {
        let mut directory = Self::default();
        for p in grammar.productions() {
            directory.insert(p);
        }
        directory
    }

    /// Returns false for an unrestricted LHS or a known production.
    pub fn insert(&mut self, production: &Production) -> bool {
        let Some(head) = production.head() else {
            return false;
        };
        let fresh = self
            .by_rhs
            .entry(production.rhs_list().clone())
            .or_default()
            .insert(head.clone());
        if fresh {
            *self.by_lhs.entry(head.clone()).or_insert(0) += 1;
        }
        fresh
    }

    pub fn contains(&self, production: &Production) -> bool {
        production
            .head()
            .zip(self.by_rhs.get(production.rhs()))
            .is_some_and(|(head, producers)| producers.contains(head))
    }

    pub fn producers(&self, rhs: &[Symbol]) -> impl Iterator<Item = &Symbol> {
        self.by_rhs.get(rhs).into_iter().flatten()
    }

    /// The LHS of `rhs` when exactly one variable produces it.
    pub fn unique_producer(&self, rhs: &[Symbol]) -> Option<&Symbol> {
        match self.by_rhs.get(rhs) {
            Some(producers) if producers.len() == 1 => producers.first(),
            _ => None,
        }
    }

    /// A variable that can stand for `rhs`: its unique producer, provided
    /// that producer has no other production.
    pub fn reusable(&self, rhs: &[Symbol]) -> Option<&Symbol> {
        self.unique_producer(rhs)
            .filter(|v| self.by_lhs.get(*v) == Some(&1))
    }
}

/// What the converter has to do with a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    AlreadyCnf,
    /// a terminal inside a right side of two or more symbols
    Determinalize,
    /// three or more variables
    Binarize,
    Unit,
    Lambda,
    Unrestricted,
}

pub fn shape(p: &Production) -> Shape {
    if !property::is_restricted_on_lhs(p) {
        Shape::Unrestricted
    } else if property::is_lambda(p) {
        Shape::Lambda
    } else if property::is_unit(p) {
        Shape::Unit
    } else if property::is_chomsky(p) {
        Shape::AlreadyCnf
    } else if property::has_terminals_on_rhs(p) {
        Shape::Determinalize
    } else {
        Shape::Binarize
    }
}

/// Incremental converter: feed productions through [`split`](Self::split)
/// one at a time, then [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct Converter {
    template: Grammar,
    names: HelperNames,
    directory: ProductionDirectory,
    /// stand-ins minted in this run, by the string they stand for
    minted: IndexMap<SymList, Symbol>,
    helpers: IndexMap<Symbol, SymList>,
    origins: IndexMap<Production, Production>,
    output: IndexSet<Production>,
}

impl Converter {
    pub fn new(grammar: &Grammar, naming: HelperNaming) -> Self {
        Converter {
            template: grammar.with_productions(core::iter::empty()),
            names: HelperNames::new(grammar, naming),
            directory: ProductionDirectory::new(grammar),
            minted: IndexMap::default(),
            helpers: IndexMap::default(),
            origins: IndexMap::default(),
            output: IndexSet::default(),
        }
    }

    /// A variable for `rhs` and whether it was just minted.
    fn stand_in(&mut self, rhs: &[Symbol]) -> (Symbol, bool) {
        if let Some(helper) = self.minted.get(rhs) {
            return (helper.clone(), false);
        }
        if let Some(variable) = self.directory.reusable(rhs) {
            return (variable.clone(), false);
        }
        let helper = self.names.mint();
        let rhs: SymList = rhs.into();
        debug!("minted {helper} for {}", Sentential(&rhs));
        self.directory.insert(&Production::rule(helper.clone(), rhs.clone()));
        self.minted.insert(rhs.clone(), helper.clone());
        self.helpers.insert(helper.clone(), rhs);
        (helper, true)
    }

    /// The CNF productions replacing `production`, including those of any
    /// helper minted for it. Reused helpers are not repeated.
    pub fn split(&mut self, production: &Production) -> Result<Vec<Production>, GrammarError> {
        let head = match (shape(production), production.head()) {
            (Shape::Unrestricted, _) | (_, None) => {
                return Err(GrammarError::UnrestrictedLhs(production.clone()));
            }
            (Shape::Lambda | Shape::Unit, _) => {
                return Err(GrammarError::BadGrammarShape(production.clone()));
            }
            (Shape::AlreadyCnf, _) => {
                self.output.insert(production.clone());
                return Ok(vec![production.clone()]);
            }
            (_, Some(head)) => head.clone(),
        };

        let mut out = Vec::new();
        let mut variables = Vec::with_capacity(production.rhs().len());
        for s in production.rhs() {
            if s.is_variable() {
                variables.push(s.clone());
                continue;
            }
            let (helper, fresh) = self.stand_in(core::slice::from_ref(s));
            if fresh {
                out.push(Production::rule(helper.clone(), [s.clone()]));
            }
            variables.push(helper);
        }

        let mut lhs = head;
        let mut rest = &variables[..];
        let mut top = true;
        loop {
            let (emitted, next) = if rest.len() <= 2 {
                (Production::rule(lhs.clone(), rest), None)
            } else {
                let (helper, fresh) = self.stand_in(&rest[1..]);
                let p = Production::rule(lhs.clone(), [rest[0].clone(), helper.clone()]);
                (p, fresh.then_some(helper))
            };
            if top && !self.directory.contains(&emitted) {
                self.origins
                    .entry(emitted.clone())
                    .or_insert_with(|| production.clone());
            }
            top = false;
            out.push(emitted);
            match next {
                Some(helper) => {
                    lhs = helper;
                    rest = &rest[1..];
                }
                None => break,
            }
        }

        self.output.extend(out.iter().cloned());
        Ok(out)
    }

    /// Every production split so far, as a grammar.
    pub fn finish(self) -> Result<CnfConversion, GrammarError> {
        if self.names.overflow > 0 {
            warn!(
                "single-letter helper names exhausted, {} more needed",
                self.names.overflow
            );
            return Err(GrammarError::UnsatisfiableHelperNaming {
                needed: self.names.overflow,
            });
        }
        Ok(CnfConversion {
            grammar: self.template.with_productions(self.output),
            directory: self.directory,
            helpers: self.helpers,
            origins: self.origins,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CnfConversion {
    pub grammar: Grammar,
    pub directory: ProductionDirectory,
    helpers: IndexMap<Symbol, SymList>,
    /// first production emitted for a split production → that production
    origins: IndexMap<Production, Production>,
}

impl CnfConversion {
    pub fn is_helper(&self, symbol: &Symbol) -> bool {
        self.helpers.contains_key(symbol)
    }

    /// Helpers with the string each one stands for, in minting order.
    pub fn helpers(&self) -> impl Iterator<Item = (&Symbol, &[Symbol])> {
        self.helpers.iter().map(|(h, rhs)| (h, &**rhs))
    }

    pub fn expansion(&self, helper: &Symbol) -> Option<&[Symbol]> {
        self.helpers.get(helper).map(|rhs| &**rhs)
    }

    pub fn origin(&self, production: &Production) -> Option<&Production> {
        self.origins.get(production)
    }

    /// Collapses stand-in nodes so the tree uses the pre-conversion
    /// productions again.
    pub fn restore(&self, tree: DerivationTree) -> DerivationTree {
        let (symbol, expansion) = tree.into_parts();
        let Some((production, children)) = expansion else {
            return DerivationTree::leaf(symbol);
        };
        let Some(source) = self.origin(&production) else {
            let children = children.into_iter().map(|c| self.restore(c)).collect();
            return DerivationTree::node(symbol, production, children);
        };
        let children = source
            .rhs()
            .iter()
            .zip(unfold(children, source.rhs().len()))
            .map(|(x, piece)| {
                if x.is_terminal() {
                    DerivationTree::leaf(x.clone())
                } else {
                    self.restore(piece)
                }
            })
            .collect();
        DerivationTree::node(symbol, source.clone(), children)
    }
}

/// Opens up the chain of remainder stand-ins hanging off the last child
/// until `width` pieces are on hand.
fn unfold(mut children: Vec<DerivationTree>, width: usize) -> Vec<DerivationTree> {
    let mut out = Vec::with_capacity(width);
    while out.len() + children.len() < width {
        let Some(last) = children.pop() else {
            break;
        };
        out.append(&mut children);
        children = last.into_parts().1.map(|(_, c)| c).unwrap_or_default();
    }
    out.append(&mut children);
    out
}

/// Converts a grammar with no lambda or unit productions.
pub fn convert(grammar: &Grammar, naming: HelperNaming) -> Result<CnfConversion, GrammarError> {
    grammar.require_context_free()?;
    let mut converter = Converter::new(grammar, naming);
    for p in grammar.productions() {
        converter.split(p)?;
    }
    let conversion = converter.finish()?;
    debug!(
        "CNF: {} production(s), {} helper(s)",
        conversion.grammar.len(),
        conversion.helpers.len()
    );
    Ok(conversion)
}
