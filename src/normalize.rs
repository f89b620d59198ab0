//! The staged normalization pipeline. Every stage result is kept so each
//! grammar can be shown on its own and a CNF derivation can be carried
//! back to the grammar the pipeline started from.

use crate::cnf::{self, CnfConversion, HelperNaming};
use crate::derivation::DerivationTree;
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::lambda::{self, LambdaRemoval, LambdaSet};
use crate::unit::{self, UnitRemoval};
use crate::useless::{self, UselessRemoval};
use log::debug;

#[derive(Debug, Clone)]
pub struct Normalization {
    pub original: Grammar,
    pub lambda: LambdaRemoval,
    pub unit: UnitRemoval,
    pub useless: UselessRemoval,
    pub cnf: CnfConversion,
}

/// Lambda, unit and useless removal followed by CNF conversion. The input
/// is never touched; any failure leaves nothing half-built behind.
pub fn normalize(grammar: &Grammar, naming: HelperNaming) -> Result<Normalization, GrammarError> {
    let lambda = lambda::remove_lambda(grammar)?;
    let unit = unit::remove_unit(&lambda.grammar)?;
    let useless = useless::remove_useless(&unit.grammar)?;
    let cnf = cnf::convert(&useless.grammar, naming)?;
    debug!(
        "normalized {} production(s) into {} CNF production(s)",
        grammar.len(),
        cnf.grammar.len()
    );
    Ok(Normalization {
        original: grammar.clone(),
        lambda,
        unit,
        useless,
        cnf,
    })
}

impl Normalization {
    pub fn cnf_grammar(&self) -> &Grammar {
        &self.cnf.grammar
    }

    pub fn nullable(&self) -> &LambdaSet {
        &self.lambda.nullable
    }

    pub fn start_derives_lambda(&self) -> bool {
        self.lambda.start_derives_lambda
    }

    pub fn empty_language(&self) -> bool {
        self.useless.empty_language
    }

    /// Maps a derivation over the CNF grammar back onto the original one.
    /// Useless removal keeps productions unchanged, so it needs no step.
    pub fn restore(&self, tree: DerivationTree) -> DerivationTree {
        self.lambda.restore(self.unit.restore(self.cnf.restore(tree)))
    }
}
