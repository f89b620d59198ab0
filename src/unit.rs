//! Unit-production removal over a [`DependencyGraph`] of variables.

use crate::derivation::DerivationTree;
use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::property;
use crate::symbol::Symbol;
use crate::{IndexMap, IndexSet};
use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use log::debug;

/// Directed graph over variables. Edge order follows production order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: IndexMap<Symbol, IndexSet<Symbol>>,
}

impl DependencyGraph {
    /// One edge `A → B` per unit production `A → B`.
    pub fn new(grammar: &Grammar) -> Self {
        Self::build(grammar, |p| {
            if property::is_unit(p) {
                p.rhs().iter().collect()
            } else {
                Vec::new()
            }
        })
    }

    /// One edge `A → B` whenever `B` appears on the right of a production on `A`.
    pub fn occurrences(grammar: &Grammar) -> Self {
        Self::build(grammar, |p| p.rhs().iter().filter(|s| s.is_variable()).collect())
    }

    fn build<'g>(grammar: &'g Grammar, targets: impl Fn(&'g Production) -> Vec<&'g Symbol>) -> Self {
        let mut edges: IndexMap<Symbol, IndexSet<Symbol>> = grammar
            .variables()
            .map(|v| (v.clone(), IndexSet::default()))
            .collect();
        for p in grammar.productions() {
            let Some(head) = p.head() else {
                continue;
            };
            let out = edges.entry(head.clone()).or_default();
            for target in targets(p) {
                out.insert(target.clone());
            }
        }
        DependencyGraph { edges }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Symbol> {
        self.edges.keys()
    }

    pub fn has_edge(&self, from: &Symbol, to: &Symbol) -> bool {
        self.edges.get(from).is_some_and(|out| out.contains(to))
    }

    /// BFS parents of everything reachable from `from` by at least one edge.
    /// `from` itself only shows up when it lies on a cycle.
    fn search(&self, from: &Symbol) -> IndexMap<Symbol, Symbol> {
        let mut parents: IndexMap<Symbol, Symbol> = IndexMap::default();
        let mut queue = VecDeque::from([from]);
        while let Some(at) = queue.pop_front() {
            let Some(out) = self.edges.get(at) else {
                continue;
            };
            for next in out {
                if !parents.contains_key(next) {
                    parents.insert(next.clone(), at.clone());
                    queue.push_back(next);
                }
            }
        }
        parents
    }

    /// Variables reachable from `from` by a path of length one or more.
    pub fn dependencies(&self, from: &Symbol) -> IndexSet<Symbol> {
        self.search(from).into_keys().collect()
    }

    /// A shortest path `from, …, to` of at least one edge.
    pub fn path(&self, from: &Symbol, to: &Symbol) -> Option<Vec<Symbol>> {
        let parents = self.search(from);
        let mut path = vec![to.clone()];
        let mut at = parents.get(to)?;
        while at != from {
            path.push(at.clone());
            at = parents.get(at)?;
        }
        path.push(from.clone());
        path.reverse();
        Some(path)
    }
}

/// How a unit-free production was assembled: the unit chain walked from its
/// LHS to some dependency, then a non-unit production on that dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOrigin {
    pub chain: Vec<Production>,
    pub base: Production,
}

/// The productions `variable` gains from its dependencies, with the chain
/// each one was borrowed through.
pub fn replacements(
    grammar: &Grammar,
    graph: &DependencyGraph,
    variable: &Symbol,
) -> Vec<(Production, UnitOrigin)> {
    let mut out = Vec::new();
    for dependency in graph.dependencies(variable) {
        if &dependency == variable {
            continue;
        }
        let Some(path) = graph.path(variable, &dependency) else {
            continue;
        };
        let chain: Vec<Production> = path
            .windows(2)
            .map(|w| Production::rule(w[0].clone(), [w[1].clone()]))
            .collect();
        for base in grammar.productions_on(&dependency).filter(|p| !property::is_unit(p)) {
            out.push((
                base.with_head(variable.clone()),
                UnitOrigin {
                    chain: chain.clone(),
                    base: base.clone(),
                },
            ));
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct UnitRemoval {
    pub graph: DependencyGraph,
    pub grammar: Grammar,
    /// only productions that were borrowed; kept ones map to themselves
    origins: IndexMap<Production, UnitOrigin>,
}

impl UnitRemoval {
    pub fn origin(&self, production: &Production) -> Option<&UnitOrigin> {
        self.origins.get(production)
    }

    /// Re-inserts the unit chains a borrowed production stands for.
    pub fn restore(&self, tree: DerivationTree) -> DerivationTree {
        let (symbol, expansion) = tree.into_parts();
        let Some((production, children)) = expansion else {
            return DerivationTree::leaf(symbol);
        };
        let children: Vec<_> = children.into_iter().map(|c| self.restore(c)).collect();
        let Some(origin) = self.origin(&production) else {
            return DerivationTree::node(symbol, production, children);
        };

        let mut built = DerivationTree::node(
            origin.base.head().cloned().unwrap_or_else(|| symbol.clone()),
            origin.base.clone(),
            children,
        );
        for link in origin.chain.iter().rev() {
            let head = link.head().cloned().unwrap_or_else(|| symbol.clone());
            built = DerivationTree::node(head, link.clone(), vec![built]);
        }
        built
    }
}

/// Replaces every unit production with the non-unit productions it leads to.
/// Expects a lambda-free grammar; lambda productions are carried over as is.
pub fn remove_unit(grammar: &Grammar) -> Result<UnitRemoval, GrammarError> {
    grammar.require_context_free()?;
    let graph = DependencyGraph::new(grammar);

    let mut kept: IndexSet<Production> = grammar
        .productions()
        .filter(|p| !property::is_unit(p))
        .cloned()
        .collect();
    let mut origins: IndexMap<Production, UnitOrigin> = IndexMap::default();
    for variable in graph.nodes() {
        for (production, origin) in replacements(grammar, &graph, variable) {
            if kept.insert(production.clone()) {
                debug!("{production} borrowed through {} unit step(s)", origin.chain.len());
                origins.insert(production, origin);
            }
        }
    }

    Ok(UnitRemoval {
        grammar: grammar.with_productions(kept),
        graph,
        origins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::{replay, Derivation};
    use crate::symbol::Uppercase;
    use pretty_assertions::assert_eq;

    fn g(text: &str) -> Grammar {
        Grammar::parse(text, &Uppercase).unwrap()
    }

    fn p(lhs: &str, rhs: &str) -> Production {
        Production::parse(lhs, rhs, &Uppercase)
    }

    fn v(name: &str) -> Symbol {
        Symbol::var(name)
    }

    #[test]
    fn reachability_is_at_least_one_edge() {
        let graph = DependencyGraph::new(&g("S -> A | s\nA -> B | a\nB -> b\nC -> C | c"));
        let deps: Vec<Symbol> = graph.dependencies(&v("S")).into_iter().collect();
        assert_eq!(deps, vec![v("A"), v("B")]);
        assert!(graph.dependencies(&v("B")).is_empty());
        // a self loop makes the variable its own dependency, and terminates
        assert_eq!(graph.dependencies(&v("C")).len(), 1);
        assert_eq!(graph.path(&v("S"), &v("B")), Some(vec![v("S"), v("A"), v("B")]));
        assert_eq!(graph.path(&v("B"), &v("S")), None);
    }

    #[test]
    fn chain_collapses() {
        let removal = remove_unit(&g("S -> A | s\nA -> B | a\nB -> b")).unwrap();
        assert_eq!(removal.grammar, g("S -> s | a | b\nA -> a | b\nB -> b"));
        assert_eq!(
            removal.origin(&p("S", "b")),
            Some(&UnitOrigin {
                chain: vec![p("S", "A"), p("A", "B")],
                base: p("B", "b")
            })
        );
    }

    #[test]
    fn cycles_share_productions() {
        let removal = remove_unit(&g("S -> A\nA -> B | a\nB -> A | b")).unwrap();
        assert_eq!(removal.grammar, g("S -> a | b\nA -> a | b\nB -> b | a"));
        assert!(removal.grammar.productions().all(|p| !property::is_unit(p)));
    }

    #[test]
    fn self_loop_is_dropped() {
        let removal = remove_unit(&g("S -> S | aS | a")).unwrap();
        assert_eq!(removal.grammar, g("S -> aS | a"));
    }

    #[test]
    fn replacements_for_one_variable() {
        let grammar = g("S -> A | s\nA -> a | AA");
        let graph = DependencyGraph::new(&grammar);
        let borrowed: Vec<Production> = replacements(&grammar, &graph, &v("S"))
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(borrowed, vec![p("S", "a"), p("S", "AA")]);
    }

    #[test]
    fn restore_reinserts_the_chain() {
        let original = g("S -> A | s\nA -> B | a\nB -> b");
        let removal = remove_unit(&original).unwrap();
        let tree = DerivationTree::node(
            v("S"),
            p("S", "b"),
            vec![DerivationTree::leaf(Symbol::term("b"))],
        );
        let restored = Derivation::new(removal.restore(tree));
        let productions: Vec<Production> = restored.productions().collect();
        assert_eq!(productions, vec![p("S", "A"), p("A", "B"), p("B", "b")]);
        assert_eq!(replay(&original, restored.steps()), Ok(vec![Symbol::term("b")]));
    }

    #[test]
    fn occurrence_graph_sees_every_variable() {
        let graph = DependencyGraph::occurrences(&g("S -> aAb | B\nA -> a\nB -> b"));
        assert!(graph.has_edge(&v("S"), &v("A")));
        assert!(graph.has_edge(&v("S"), &v("B")));
        assert!(!graph.has_edge(&v("A"), &v("S")));
    }
}
