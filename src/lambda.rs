//! Lambda-production removal.
//!
//! The nullable set is grown to a fixed point, then each production is
//! replaced by every variant that drops some of its nullable symbols. The
//! empty string itself is lost; whether the start variable was nullable is
//! reported separately.

use crate::derivation::DerivationTree;
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::property;
use crate::symbol::Symbol;
use crate::IndexMap;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, warn};

/// Variables known to derive λ. Only ever grows.
///
/// Each member remembers the production that proved it nullable: every
/// symbol on that production's right side joined the set earlier, so
/// following witnesses always bottoms out in a literal lambda production.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LambdaSet {
    witnesses: IndexMap<Symbol, Production>,
}

impl LambdaSet {
    pub fn contains(&self, variable: &Symbol) -> bool {
        self.witnesses.contains_key(variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.witnesses.keys()
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    pub fn witness(&self, variable: &Symbol) -> Option<&Production> {
        self.witnesses.get(variable)
    }

    /// Every symbol of `symbols` is nullable (true for the empty string).
    pub fn derives_lambda(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|s| self.contains(s))
    }

    fn insert(&mut self, variable: &Symbol, witness: &Production) -> bool {
        if self.contains(variable) {
            return false;
        }
        debug!("{variable} derives λ by {witness}");
        self.witnesses.insert(variable.clone(), witness.clone());
        true
    }

    /// A derivation tree taking `variable` to λ, built from the witnesses.
    pub fn empty_derivation(&self, variable: &Symbol) -> Option<DerivationTree> {
        let witness = self.witness(variable)?;
        let children = witness
            .rhs()
            .iter()
            .map(|s| self.empty_derivation(s))
            .collect::<Option<Vec<_>>>()?;
        Some(DerivationTree::node(variable.clone(), witness.clone(), children))
    }
}

/// Seeds with the direct lambda productions, then adds any variable with a
/// production made only of nullable symbols until a pass adds nothing.
pub fn nullable_variables(grammar: &Grammar) -> LambdaSet {
    let mut set = LambdaSet::default();
    for p in grammar.productions().filter(|p| property::is_lambda(p)) {
        if let Some(head) = p.head() {
            set.insert(head, p);
        }
    }

    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut changed = false;
        for p in grammar.productions() {
            let Some(head) = p.head() else {
                continue;
            };
            if !set.contains(head) && set.derives_lambda(p.rhs()) {
                changed |= set.insert(head, p);
            }
        }
        if !changed {
            break;
        }
    }
    debug!("{} nullable variable(s) after {passes} pass(es)", set.len());
    set
}

/// Every way of keeping or dropping the nullable symbols of `production`,
/// paired with the mask of kept positions. The all-dropped variant is never
/// produced, so no lambda production comes back. The first variant is the
/// production itself (when non-empty).
pub fn variants(production: &Production, nullable: &LambdaSet) -> Vec<(Production, Vec<bool>)> {
    let Some(head) = production.head() else {
        return Vec::new();
    };
    let mut partial: Vec<(Vec<Symbol>, Vec<bool>)> = vec![(Vec::new(), Vec::new())];
    for s in production.rhs() {
        if nullable.contains(s) {
            let mut dropped = partial.clone();
            for (_, kept) in &mut dropped {
                kept.push(false);
            }
            for (symbols, kept) in &mut partial {
                symbols.push(s.clone());
                kept.push(true);
            }
            partial.extend(dropped);
        } else {
            for (symbols, kept) in &mut partial {
                symbols.push(s.clone());
                kept.push(true);
            }
        }
    }

    let mut unique: IndexMap<Vec<Symbol>, Vec<bool>> = IndexMap::default();
    for (symbols, kept) in partial {
        if !symbols.is_empty() {
            unique.entry(symbols).or_insert(kept);
        }
    }
    unique
        .into_iter()
        .map(|(symbols, kept)| (Production::rule(head.clone(), symbols), kept))
        .collect()
}

/// The original production a lambda-free production was cut from, and
/// which of its right-side positions survived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaOrigin {
    pub source: Production,
    pub kept: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct LambdaRemoval {
    pub nullable: LambdaSet,
    pub grammar: Grammar,
    /// the original language contains λ, which `grammar` no longer derives
    pub start_derives_lambda: bool,
    origins: IndexMap<Production, LambdaOrigin>,
}

impl LambdaRemoval {
    pub fn origin(&self, production: &Production) -> Option<&LambdaOrigin> {
        self.origins.get(production)
    }

    /// Maps a derivation tree over the lambda-free grammar back onto the
    /// grammar before removal, re-deriving every dropped symbol to λ.
    pub fn restore(&self, tree: DerivationTree) -> DerivationTree {
        let (symbol, expansion) = tree.into_parts();
        let Some((production, children)) = expansion else {
            return DerivationTree::leaf(symbol);
        };
        let children: Vec<_> = children.into_iter().map(|c| self.restore(c)).collect();
        let Some(origin) = self.origin(&production) else {
            return DerivationTree::node(symbol, production, children);
        };

        let mut kept_children = children.into_iter();
        let mut restored = Vec::with_capacity(origin.kept.len());
        for (s, &kept) in origin.source.rhs().iter().zip(&origin.kept) {
            let child = if kept {
                kept_children.next()
            } else {
                self.nullable.empty_derivation(s)
            };
            restored.push(child.unwrap_or_else(|| DerivationTree::leaf(s.clone())));
        }
        DerivationTree::node(symbol, origin.source.clone(), restored)
    }
}

/// Removes every lambda production from a context-free grammar.
pub fn remove_lambda(grammar: &Grammar) -> Result<LambdaRemoval, GrammarError> {
    let start = grammar.require_context_free()?;
    let nullable = nullable_variables(grammar);

    // originals first, so a production that also exists unchanged maps to itself
    let mut origins: IndexMap<Production, LambdaOrigin> = IndexMap::default();
    for p in grammar.productions().filter(|p| !property::is_lambda(p)) {
        origins.insert(
            p.clone(),
            LambdaOrigin {
                source: p.clone(),
                kept: vec![true; p.rhs().len()],
            },
        );
    }
    for p in grammar.productions() {
        for (variant, kept) in variants(p, &nullable) {
            origins.entry(variant).or_insert_with(|| LambdaOrigin {
                source: p.clone(),
                kept,
            });
        }
    }

    let start_derives_lambda = nullable.contains(start);
    if start_derives_lambda {
        warn!("start variable {start} derives λ; the lambda-free grammar drops the empty string");
    }
    Ok(LambdaRemoval {
        grammar: grammar.with_productions(origins.keys().cloned()),
        nullable,
        start_derives_lambda,
        origins,
    })
}
