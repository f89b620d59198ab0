//! Runs one engine over a list of inputs with expected answers.
//!
//! Runs are headless: a checkpoint is answered "stop", so an input whose
//! search outgrows the limits comes back [`Verdict::Unknown`].

use crate::brute::{BruteParser, SearchStatus};
use crate::cyk::{self, CykOutcome};
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::limits::{NeverContinue, SearchLimits};
use crate::ll1::{Ll1Driver, Ll1Table};
use crate::lr::{LrDriver, SlrTable};
use crate::normalize::Normalization;
use crate::symbol::Symbol;
use crate::Step;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use log::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub enum Engine<'a> {
    Cyk(&'a Normalization),
    Ll1(&'a Ll1Table),
    Slr(&'a SlrTable),
    Brute(&'a Grammar),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
    /// the search was abandoned at a checkpoint
    Unknown,
    EmptyLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub input: String,
    pub symbols: Vec<Symbol>,
    pub expected: bool,
    pub verdict: Verdict,
    /// productions of the derivation, when accepted
    pub derivation: Option<Vec<Production>>,
}

impl BatchResult {
    /// An unknown verdict never matches.
    pub fn matches(&self) -> bool {
        match self.verdict {
            Verdict::Accept => self.expected,
            Verdict::Reject | Verdict::EmptyLanguage => !self.expected,
            Verdict::Unknown => false,
        }
    }
}

fn from_step(step: Step) -> Verdict {
    match step {
        Step::Accept => Verdict::Accept,
        Step::Reject(_) => Verdict::Reject,
        Step::Continue | Step::Abandoned => Verdict::Unknown,
    }
}

fn judge(
    engine: Engine<'_>,
    symbols: &[Symbol],
    limits: SearchLimits,
) -> Result<(Verdict, Option<Vec<Production>>), GrammarError> {
    Ok(match engine {
        Engine::Cyk(normal) => match cyk::parse(normal, symbols)? {
            CykOutcome::Accepted(d) => (Verdict::Accept, Some(d.productions().collect())),
            CykOutcome::Rejected => (Verdict::Reject, None),
            CykOutcome::EmptyLanguage => (Verdict::EmptyLanguage, None),
        },
        Engine::Ll1(table) => {
            let mut driver = Ll1Driver::new(table, symbols, limits, NeverContinue);
            let verdict = from_step(driver.run());
            let derivation = (verdict == Verdict::Accept).then(|| driver.applied().to_vec());
            (verdict, derivation)
        }
        Engine::Slr(table) => {
            let mut driver = LrDriver::new(table, symbols, limits, NeverContinue);
            let verdict = from_step(driver.run());
            let derivation = (verdict == Verdict::Accept).then(|| driver.derivation());
            (verdict, derivation)
        }
        Engine::Brute(grammar) => {
            let mut parser = BruteParser::new(grammar, symbols, limits, NeverContinue)?;
            let verdict = match parser.run() {
                SearchStatus::Accepted(_) => Verdict::Accept,
                SearchStatus::Rejected => Verdict::Reject,
                SearchStatus::Searching | SearchStatus::Abandoned => Verdict::Unknown,
            };
            let derivation = parser
                .derivation()
                .map(|steps| steps.into_iter().map(|s| s.production).collect());
            (verdict, derivation)
        }
    })
}

/// Lexes each input against `grammar`'s terminals and runs `engine` on it.
pub fn run(
    grammar: &Grammar,
    engine: Engine<'_>,
    cases: &[(&str, bool)],
    limits: SearchLimits,
) -> Result<Vec<BatchResult>, GrammarError> {
    let mut results = Vec::with_capacity(cases.len());
    for &(input, expected) in cases {
        let symbols = grammar.lex_input(input);
        let (verdict, derivation) = judge(engine, &symbols, limits)?;
        debug!("batch: `{input}` gives {verdict:?}");
        results.push(BatchResult {
            input: input.to_string(),
            symbols,
            expected,
            verdict,
            derivation,
        });
    }
    let failed = results.iter().filter(|r| !r.matches()).count();
    if failed > 0 {
        warn!("batch: {failed} of {} input(s) did not match", results.len());
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::HelperNaming;
    use crate::normalize::normalize;
    use crate::sets::tests::EXPR_LL1;
    use crate::symbol::{Convention, Uppercase, Words};
    use alloc::vec;
    use pretty_assertions::assert_eq;

    fn verdicts(results: &[BatchResult]) -> Vec<Verdict> {
        results.iter().map(|r| r.verdict).collect()
    }

    #[test]
    fn cyk_batch() {
        let grammar = Grammar::parse("S -> aSb | ab", &Uppercase).unwrap();
        let normal = normalize(&grammar, HelperNaming::default()).unwrap();
        let cases = [("aabb", true), ("aab", false), ("", true)];
        let results = run(&grammar, Engine::Cyk(&normal), &cases, SearchLimits::default()).unwrap();
        assert_eq!(verdicts(&results), [Verdict::Accept, Verdict::Reject, Verdict::Reject]);
        assert_eq!(results.iter().map(BatchResult::matches).collect::<Vec<_>>(), [true, true, false]);
        assert_eq!(
            results[0].derivation,
            Some(vec![
                Production::parse("S", "aSb", &Uppercase),
                Production::parse("S", "ab", &Uppercase)
            ])
        );
    }

    #[test]
    fn table_batches_lex_multi_char_terminals() {
        let grammar = Grammar::parse(EXPR_LL1, &Words).unwrap();
        let table = Ll1Table::build(&grammar).unwrap();
        let cases = [("id+id*id", true), ("(id)", true), ("id+*id", false)];
        let results = run(&grammar, Engine::Ll1(&table), &cases, SearchLimits::default()).unwrap();
        assert!(results.iter().all(BatchResult::matches));
        assert_eq!(results[1].symbols, Words.symbols("( id )"));

        let grammar = Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id", &Words).unwrap();
        let table = SlrTable::build(&grammar).unwrap();
        let results = run(&grammar, Engine::Slr(&table), &cases, SearchLimits::default()).unwrap();
        assert_eq!(verdicts(&results), [Verdict::Accept, Verdict::Accept, Verdict::Reject]);
        assert_eq!(results[1].derivation.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn brute_batch_reports_unknown() {
        let grammar = Grammar::parse("S -> aSb | ab", &Uppercase).unwrap();
        let cases = [("aaabbb", true)];
        let tight = SearchLimits {
            first_checkpoint: 1,
            growth: 2,
        };
        let results = run(&grammar, Engine::Brute(&grammar), &cases, tight).unwrap();
        assert_eq!(results[0].verdict, Verdict::Unknown);
        assert!(!results[0].matches());

        let results = run(&grammar, Engine::Brute(&grammar), &cases, SearchLimits::default()).unwrap();
        assert_eq!(results[0].verdict, Verdict::Accept);
        assert_eq!(results[0].derivation.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn empty_language_verdict() {
        let grammar = Grammar::parse("S -> aS", &Uppercase).unwrap();
        let normal = normalize(&grammar, HelperNaming::default()).unwrap();
        let results = run(&grammar, Engine::Cyk(&normal), &[("a", false)], SearchLimits::default()).unwrap();
        assert_eq!(results[0].verdict, Verdict::EmptyLanguage);
        assert!(results[0].matches());
    }
}
