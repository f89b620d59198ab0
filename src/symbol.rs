//! Grammar symbols and the conventions used to read them from text.
//!
//! A [`Symbol`] carries its own variable/terminal tag, so nothing downstream
//! ever has to guess from character case. Guessing only happens once, at the
//! text boundary, through a [`Convention`].

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// Shared, immutable run of symbols (a production side or a sentential form).
pub type SymList = Arc<[Symbol]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Variable(Arc<str>),
    Terminal(Arc<str>),
}

impl Symbol {
    pub fn var(name: &str) -> Self {
        Symbol::Variable(name.into())
    }

    pub fn term(name: &str) -> Self {
        Symbol::Terminal(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(name) | Symbol::Terminal(name) => name,
        }
    }

    #[inline]
    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Variable(_))
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display adapter for a string of symbols.
///
/// Single-character symbols are written back to back (`aSb`), anything
/// longer is space separated (`E + T`), and the empty string prints as `λ`.
pub struct Sentential<'a>(pub &'a [Symbol]);

impl fmt::Display for Sentential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("λ");
        }
        let compact = self.0.iter().all(|s| s.name().chars().count() == 1);
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 && !compact {
                f.write_str(" ")?;
            }
            f.write_str(s.name())?;
        }
        Ok(())
    }
}

/// Decides how text is cut into symbols and which of them are variables.
pub trait Convention {
    fn is_variable(&self, token: &str) -> bool;

    /// Cuts `text` into raw tokens, dropping whitespace.
    fn split<'t>(&self, text: &'t str) -> Vec<&'t str>;

    fn classify(&self, token: &str) -> Symbol {
        if self.is_variable(token) {
            Symbol::var(token)
        } else {
            Symbol::term(token)
        }
    }

    fn symbols(&self, text: &str) -> Vec<Symbol> {
        self.split(text)
            .into_iter()
            .map(|t| self.classify(t))
            .collect()
    }
}

fn starts_uppercase(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// One character per symbol, uppercase means variable.
///
/// An uppercase letter directly followed by a bracketed group, such as
/// `V(q0aq1)`, is read as a single compound variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl Convention for Uppercase {
    fn is_variable(&self, token: &str) -> bool {
        starts_uppercase(token)
    }

    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut out = Vec::new();
        let mut chars = text.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            let mut end = start + c.len_utf8();
            if c.is_uppercase() && chars.peek().is_some_and(|&(_, n)| n == '(') {
                let mut depth = 0usize;
                for (i, n) in chars.by_ref() {
                    end = i + n.len_utf8();
                    match n {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            out.push(&text[start..end]);
        }
        out
    }
}

/// Whitespace separated tokens; a token starting uppercase is a variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Words;

impl Convention for Words {
    fn is_variable(&self, token: &str) -> bool {
        starts_uppercase(token)
    }

    fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        text.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use pretty_assertions::assert_eq;

    #[test]
    fn uppercase_splits_per_char() {
        assert_eq!(Uppercase.split("aSb"), vec!["a", "S", "b"]);
        assert_eq!(Uppercase.split(" a S\tb "), vec!["a", "S", "b"]);
        assert_eq!(
            Uppercase.symbols("aSb"),
            vec![Symbol::term("a"), Symbol::var("S"), Symbol::term("b")]
        );
    }

    #[test]
    fn compound_variables_stay_whole() {
        assert_eq!(Uppercase.split("V(q0a(q1))bA"), vec!["V(q0a(q1))", "b", "A"]);
        assert!(Uppercase.classify("V(q0aq1)").is_variable());
        // lowercase before a bracket is just two terminals
        assert_eq!(Uppercase.split("a(b"), vec!["a", "(", "b"]);
    }

    #[test]
    fn words_keep_multichar_terminals() {
        assert_eq!(
            Words.symbols("( E ) id"),
            vec![
                Symbol::term("("),
                Symbol::var("E"),
                Symbol::term(")"),
                Symbol::term("id")
            ]
        );
    }

    #[test]
    fn sentential_display() {
        let compact = [Symbol::term("a"), Symbol::var("S")];
        assert_eq!(Sentential(&compact).to_string(), "aS");
        let spaced = [Symbol::var("E"), Symbol::term("+"), Symbol::var("H1")];
        assert_eq!(Sentential(&spaced).to_string(), "E + H1");
        assert_eq!(Sentential(&[]).to_string(), "λ");
    }
}
