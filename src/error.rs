use crate::grammar::Production;
use crate::symbol::Symbol;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Structural problems that stop a normalization or parse request.
///
/// Normal outcomes (a rejected string, an empty language, table conflicts)
/// are never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    MissingStart,
    StartNotVariable(Symbol),
    EmptyLhs(Production),
    /// the LHS is not a single variable where one is required
    UnrestrictedLhs(Production),
    ReservedSymbol(String),
    /// a grammar text line that is not `LHS -> alternatives`
    Syntax(String),
    /// a production the CNF converter cannot accept (lambda or unit)
    BadGrammarShape(Production),
    /// bounded helper naming ran out of letters
    UnsatisfiableHelperNaming { needed: usize },
    NotApplicable { production: Production, position: usize },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::MissingStart => f.write_str("the grammar has no start variable"),
            GrammarError::StartNotVariable(s) => {
                write!(f, "start symbol `{s}` is not a variable")
            }
            GrammarError::EmptyLhs(p) => write!(f, "production `{p}` has an empty left side"),
            GrammarError::UnrestrictedLhs(p) => {
                write!(f, "production `{p}` must have a single variable on its left side")
            }
            GrammarError::ReservedSymbol(name) => write!(f, "`{name}` is a reserved symbol"),
            GrammarError::Syntax(line) => write!(f, "cannot read production line `{line}`"),
            GrammarError::BadGrammarShape(p) => write!(
                f,
                "production `{p}` must be removed before converting to Chomsky normal form"
            ),
            GrammarError::UnsatisfiableHelperNaming { needed } => write!(
                f,
                "conversion needs {needed} more variable(s) than single letters allow"
            ),
            GrammarError::NotApplicable {
                production,
                position,
            } => write!(f, "`{production}` cannot be applied at position {position}"),
        }
    }
}

impl core::error::Error for GrammarError {}

/// Where a table driven parse stopped: the symbol it found (`None` at the
/// end of input) and what the table would have accepted instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub found: Option<Symbol>,
    pub expected: Vec<Option<Symbol>>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            Some(s) => write!(f, "unexpected `{s}`")?,
            None => f.write_str("unexpected end of input")?,
        }
        if !self.expected.is_empty() {
            f.write_str(", expected one of:")?;
            for e in &self.expected {
                match e {
                    Some(s) => write!(f, " `{s}`")?,
                    None => f.write_str(" $")?,
                }
            }
        }
        Ok(())
    }
}

impl core::error::Error for ParseError {}
