#![no_std]
//! Grammar normalization and parsing.
//!
//! A [`Grammar`] goes through lambda, unit and useless-production removal
//! into Chomsky normal form ([`normalize()`]). Strings are then recognized
//! by CYK over the normal form, by LL(1) or SLR(1) tables, or by a
//! breadth-first search over derivations. Accepted strings come back as
//! derivations over the grammar the caller handed in.
//!
//! ```
//! use grammar_engine::{cyk, normalize, Grammar, HelperNaming, Uppercase};
//!
//! let grammar = Grammar::parse("S -> aSb | ab", &Uppercase).unwrap();
//! let normal = normalize(&grammar, HelperNaming::default()).unwrap();
//! let input = grammar.lex_input("aabb");
//! let outcome = cyk::parse(&normal, &input).unwrap();
//! let derivation = outcome.derivation().unwrap();
//! assert_eq!(derivation.to_string(), "S ⇒ aSb ⇒ aabb");
//! ```

extern crate alloc;

pub mod batch;
pub mod brute;
pub mod cnf;
pub mod cyk;
pub mod derivation;
pub mod error;
pub mod grammar;
pub mod lambda;
pub mod limits;
pub mod ll1;
pub mod lr;
pub mod normalize;
pub mod property;
pub mod sets;
pub mod symbol;
pub mod unit;
pub mod useless;

pub use cnf::HelperNaming;
pub use derivation::{Derivation, DerivationTree};
pub use error::{GrammarError, ParseError};
pub use grammar::{Grammar, Production, Validity};
pub use limits::{CancelFlag, Checkpoint, SearchLimits};
pub use normalize::{normalize, Normalization};
pub use symbol::{Convention, Symbol, Uppercase, Words};

/// Insertion-ordered map over the `hashbrown` hasher.
pub type IndexMap<K, V> = indexmap::IndexMap<K, V, hashbrown::DefaultHashBuilder>;
/// Insertion-ordered set over the `hashbrown` hasher.
pub type IndexSet<T> = indexmap::IndexSet<T, hashbrown::DefaultHashBuilder>;

/// Result of one `step()` of a table-driven driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Accept,
    Reject(ParseError),
    /// cancelled, or a checkpoint said stop; the answer is unknown
    Abandoned,
}

impl Step {
    pub fn is_done(&self) -> bool {
        !matches!(self, Step::Continue)
    }
}
