use grammar_engine::brute::{BruteParser, SearchStatus};
use grammar_engine::derivation::replay;
use grammar_engine::lambda::remove_lambda;
use grammar_engine::ll1::Ll1Table;
use grammar_engine::lr::SlrTable;
use grammar_engine::sets::Lookahead;
use grammar_engine::unit::remove_unit;
use grammar_engine::useless::{self, remove_useless};
use grammar_engine::{cyk, normalize, property, Step};
use grammar_engine::{Convention, Grammar, HelperNaming, Symbol, Uppercase, Words};
use pretty_assertions::assert_eq;

fn g(text: &str) -> Grammar {
    Grammar::parse(text, &Uppercase).unwrap()
}

/// Every string over `alphabet` of length at most `max`, shortest first.
fn strings_up_to(alphabet: &[Symbol], max: usize) -> Vec<Vec<Symbol>> {
    let mut all = vec![Vec::new()];
    let mut layer = vec![Vec::new()];
    for _ in 0..max {
        let mut next = Vec::new();
        for s in &layer {
            for t in alphabet {
                let mut longer: Vec<Symbol> = s.clone();
                longer.push(t.clone());
                next.push(longer);
            }
        }
        all.extend(next.iter().cloned());
        layer = next;
    }
    all
}

fn brute_accepts(grammar: &Grammar, input: &[Symbol]) -> bool {
    let mut parser = BruteParser::with_defaults(grammar, input).unwrap();
    match parser.run() {
        SearchStatus::Accepted(_) => true,
        SearchStatus::Rejected => false,
        other => panic!("search did not finish: {other:?}"),
    }
}

fn language(grammar: &Grammar, alphabet: &[Symbol], max: usize) -> Vec<Vec<Symbol>> {
    strings_up_to(alphabet, max)
        .into_iter()
        .filter(|w| brute_accepts(grammar, w))
        .collect()
}

const SAMPLES: [&str; 5] = [
    "S -> aSb | ab",
    "S -> AB\nA -> a | λ\nB -> b | λ",
    "S -> SS | a",
    "S -> aA | B\nA -> aA | b | λ\nB -> Bb | c\nC -> c",
    "S -> aXb | Y\nX -> Y | λ\nY -> c | dY",
];

fn alphabet(grammar: &Grammar) -> Vec<Symbol> {
    grammar.terminals().cloned().collect()
}

#[test]
fn scenario_anbn() {
    let grammar = g("S -> aSb | ab");
    let normal = normalize(&grammar, HelperNaming::default()).unwrap();
    let input = grammar.lex_input("aabb");
    let outcome = cyk::parse(&normal, &input).unwrap();
    let derivation = outcome.derivation().unwrap();
    assert_eq!(derivation.to_string(), "S ⇒ aSb ⇒ aabb");
    assert_eq!(replay(&grammar, derivation.steps()).unwrap(), input);
    assert!(!cyk::parse(&normal, &grammar.lex_input("aab")).unwrap().is_accepted());
}

#[test]
fn scenario_nullable_start() {
    let grammar = g("S -> AB\nA -> a | λ\nB -> b | λ");
    let removal = remove_lambda(&grammar).unwrap();
    assert!(removal.start_derives_lambda);
    for input in ["a", "b", "ab"] {
        assert!(brute_accepts(&removal.grammar, &Uppercase.symbols(input)), "{input}");
    }
    assert!(!brute_accepts(&removal.grammar, &[]));
    let normal = normalize(&grammar, HelperNaming::default()).unwrap();
    assert!(cyk::parse(&normal, &[]).unwrap().is_accepted());
}

#[test]
fn scenario_ambiguous() {
    let grammar = g("S -> SS | a");
    let table = Ll1Table::build(&grammar).unwrap();
    assert!(!table.is_ll1());
    let conflict = &table.conflicts()[0];
    assert_eq!(conflict.variable, Symbol::var("S"));
    assert_eq!(conflict.lookahead, Lookahead::Term(Symbol::term("a")));

    let normal = normalize(&grammar, HelperNaming::default()).unwrap();
    let input = grammar.lex_input("aaa");
    let outcome = cyk::parse(&normal, &input).unwrap();
    assert_eq!(outcome.derivation().unwrap().derived(), input);
}

#[test]
fn single_terminal_boundary() {
    let grammar = g("S -> a");
    let normal = normalize(&grammar, HelperNaming::default()).unwrap();
    let accepts = |w: &str| cyk::parse(&normal, &grammar.lex_input(w)).unwrap().is_accepted();
    assert!(accepts("a"));
    assert!(!accepts(""));
    assert!(!accepts("aa"));
}

#[test]
fn textbook_tables() {
    let left_factored = Grammar::parse(
        "E -> T E'\nE' -> + T E' | λ\nT -> F T'\nT' -> * F T' | λ\nF -> ( E ) | id",
        &Words,
    )
    .unwrap();
    let ll1 = Ll1Table::build(&left_factored).unwrap();
    assert!(ll1.is_ll1());
    assert_eq!(ll1.driver(&left_factored.lex_input("id+id*id")).run(), Step::Accept);

    let expr = Grammar::parse("E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id", &Words).unwrap();
    let slr = SlrTable::build(&expr).unwrap();
    assert!(slr.is_slr1());
    assert_eq!(slr.driver(&expr.lex_input("id*id+id")).run(), Step::Accept);
    assert!(matches!(slr.driver(&expr.lex_input("id+*id")).run(), Step::Reject(_)));
}

#[test]
fn lambda_removal_is_sound() {
    for text in SAMPLES {
        let grammar = g(text);
        let removal = remove_lambda(&grammar).unwrap();
        let sigma = alphabet(&grammar);
        let before: Vec<_> = language(&grammar, &sigma, 4).into_iter().filter(|w| !w.is_empty()).collect();
        assert_eq!(language(&removal.grammar, &sigma, 4), before, "{text}");
        assert_eq!(removal.start_derives_lambda, brute_accepts(&grammar, &[]), "{text}");
    }
}

#[test]
fn unit_and_useless_removal_are_sound() {
    for text in SAMPLES {
        let lambda_free = remove_lambda(&g(text)).unwrap().grammar;
        let sigma = alphabet(&lambda_free);
        let expected = language(&lambda_free, &sigma, 4);

        let unit_free = remove_unit(&lambda_free).unwrap().grammar;
        assert!(!unit_free.productions().any(property::is_unit), "{text}");
        assert_eq!(language(&unit_free, &sigma, 4), expected, "{text}");

        let useful = remove_useless(&unit_free).unwrap().grammar;
        assert_eq!(language(&useful, &sigma, 4), expected, "{text}");
        let productive = useless::productive_variables(&useful);
        let reachable = useless::reachable_variables(&useful);
        for v in useful.variables() {
            assert!(productive.contains(v) && reachable.contains(v), "{text}: {v}");
        }
    }
}

#[test]
fn cyk_agrees_with_search_and_traces_replay() {
    for text in SAMPLES {
        let grammar = g(text);
        let normal = normalize(&grammar, HelperNaming::default()).unwrap();
        assert!(property::is_chomsky_grammar(normal.cnf_grammar()), "{text}");
        for w in strings_up_to(&alphabet(&grammar), 4) {
            let outcome = cyk::parse(&normal, &w).unwrap();
            assert_eq!(outcome.is_accepted(), brute_accepts(&grammar, &w), "{text}: {w:?}");
            if let Some(derivation) = outcome.derivation() {
                assert_eq!(replay(&grammar, derivation.steps()).unwrap(), w, "{text}");
            }
        }
    }
}

#[test]
fn normalizing_twice_changes_nothing() {
    for text in SAMPLES {
        let once = normalize(&g(text), HelperNaming::default()).unwrap();
        let twice = normalize(once.cnf_grammar(), HelperNaming::default()).unwrap();
        assert_eq!(twice.cnf_grammar(), once.cnf_grammar(), "{text}");
    }
}

#[test]
fn tables_agree_with_search() {
    let grammar = Grammar::parse("S -> a S b | c", &Words).unwrap();
    let ll1 = Ll1Table::build(&grammar).unwrap();
    let slr = SlrTable::build(&grammar).unwrap();
    for w in strings_up_to(&alphabet(&grammar), 5) {
        let expected = brute_accepts(&grammar, &w);
        assert_eq!(ll1.driver(&w).run() == Step::Accept, expected, "{w:?}");
        assert_eq!(slr.driver(&w).run() == Step::Accept, expected, "{w:?}");
    }
}
