//! Stateless predicates over productions and whole grammars.
//!
//! Every structural predicate answers `false` for a production whose LHS is
//! not a single variable: such a production is neither linear, unit, nor
//! lambda, which keeps call sites free of special cases.

use crate::grammar::{Grammar, Production};
use crate::symbol::{Convention, Uppercase};

pub fn is_restricted_on_lhs(p: &Production) -> bool {
    p.head().is_some()
}

pub fn is_lambda(p: &Production) -> bool {
    is_restricted_on_lhs(p) && p.rhs().is_empty()
}

pub fn is_unit(p: &Production) -> bool {
    is_restricted_on_lhs(p) && matches!(p.rhs(), [s] if s.is_variable())
}

/// At most one variable on the right, and only as the last symbol.
pub fn is_right_linear(p: &Production) -> bool {
    if !is_restricted_on_lhs(p) {
        return false;
    }
    match p.rhs().iter().position(|s| s.is_variable()) {
        None => true,
        Some(i) => i + 1 == p.rhs().len(),
    }
}

/// At most one variable on the right, and only as the first symbol.
pub fn is_left_linear(p: &Production) -> bool {
    if !is_restricted_on_lhs(p) {
        return false;
    }
    match p.rhs().iter().rposition(|s| s.is_variable()) {
        None => true,
        Some(i) => i == 0,
    }
}

pub fn is_linear(p: &Production) -> bool {
    is_left_linear(p) || is_right_linear(p)
}

pub fn has_terminals_on_rhs(p: &Production) -> bool {
    is_restricted_on_lhs(p) && p.rhs().iter().any(|s| s.is_terminal())
}

/// `A → BC` or `A → a`.
pub fn is_chomsky(p: &Production) -> bool {
    is_restricted_on_lhs(p)
        && match p.rhs() {
            [t] => t.is_terminal(),
            [b, c] => b.is_variable() && c.is_variable(),
            _ => false,
        }
}

/// The default single-token convention: uppercase is a variable.
pub fn is_variable_token(token: &str) -> bool {
    Uppercase.is_variable(token)
}

/// Every predicate at once, for display next to a production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Properties {
    pub restricted_lhs: bool,
    pub lambda: bool,
    pub unit: bool,
    pub left_linear: bool,
    pub right_linear: bool,
    pub linear: bool,
    pub terminals_on_rhs: bool,
    pub chomsky: bool,
}

pub fn classify(p: &Production) -> Properties {
    Properties {
        restricted_lhs: is_restricted_on_lhs(p),
        lambda: is_lambda(p),
        unit: is_unit(p),
        left_linear: is_left_linear(p),
        right_linear: is_right_linear(p),
        linear: is_linear(p),
        terminals_on_rhs: has_terminals_on_rhs(p),
        chomsky: is_chomsky(p),
    }
}

/// Most specific family a grammar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarClass {
    /// all right-linear or all left-linear
    Regular,
    /// already in Chomsky normal form
    Chomsky,
    ContextFree,
    Unrestricted,
}

pub fn is_right_linear_grammar(g: &Grammar) -> bool {
    g.productions().all(is_right_linear)
}

pub fn is_left_linear_grammar(g: &Grammar) -> bool {
    g.productions().all(is_left_linear)
}

pub fn is_chomsky_grammar(g: &Grammar) -> bool {
    g.productions().all(is_chomsky)
}

pub fn classify_grammar(g: &Grammar) -> GrammarClass {
    if !g.productions().all(is_restricted_on_lhs) {
        GrammarClass::Unrestricted
    } else if is_right_linear_grammar(g) || is_left_linear_grammar(g) {
        GrammarClass::Regular
    } else if is_chomsky_grammar(g) {
        GrammarClass::Chomsky
    } else {
        GrammarClass::ContextFree
    }
}
