//! Derivations: trees of applied productions, the leftmost step sequence
//! read off a tree, and the append-only [`ParseTree`] of sentential forms
//! that the searches grow.

use crate::error::GrammarError;
use crate::grammar::{Grammar, Production};
use crate::symbol::{Sentential, SymList, Symbol};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Rewrites the occurrence of `production`'s LHS found at `position`.
/// `None` when the LHS does not occur there.
pub fn substitute(form: &[Symbol], production: &Production, position: usize) -> Option<Vec<Symbol>> {
    let lhs = production.lhs();
    if !form.get(position..)?.starts_with(lhs) {
        return None;
    }
    let mut out = Vec::with_capacity(form.len() + production.rhs().len());
    out.extend_from_slice(&form[..position]);
    out.extend_from_slice(production.rhs());
    out.extend_from_slice(&form[position + lhs.len()..]);
    Some(out)
}

/// Applies `steps` to the start variable of `grammar`, checking that each
/// production belongs to the grammar and fits where it is applied.
/// Returns the final sentential form.
pub fn replay(
    grammar: &Grammar,
    steps: impl IntoIterator<Item = DerivationStep>,
) -> Result<Vec<Symbol>, GrammarError> {
    let mut form = vec![grammar.require_start()?.clone()];
    for step in steps {
        let applied = if grammar.contains(&step.production) {
            substitute(&form, &step.production, step.position)
        } else {
            None
        };
        form = applied.ok_or(GrammarError::NotApplicable {
            production: step.production,
            position: step.position,
        })?;
    }
    Ok(form)
}

/// One rewrite: `production` applied at index `position` of the current form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationStep {
    pub production: Production,
    pub position: usize,
}

/// A context-free derivation tree. Leaves are terminals or variables that
/// were never expanded; an expanded node with no children derived λ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationTree {
    symbol: Symbol,
    expansion: Option<(Production, Vec<DerivationTree>)>,
}

impl DerivationTree {
    pub fn leaf(symbol: Symbol) -> Self {
        DerivationTree {
            symbol,
            expansion: None,
        }
    }

    pub fn node(symbol: Symbol, production: Production, children: Vec<DerivationTree>) -> Self {
        DerivationTree {
            symbol,
            expansion: Some((production, children)),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn production(&self) -> Option<&Production> {
        self.expansion.as_ref().map(|(p, _)| p)
    }

    pub fn children(&self) -> &[DerivationTree] {
        match &self.expansion {
            Some((_, children)) => children,
            None => &[],
        }
    }

    pub fn into_parts(self) -> (Symbol, Option<(Production, Vec<DerivationTree>)>) {
        (self.symbol, self.expansion)
    }

    /// The string this tree derives: its leaves, left to right.
    pub fn frontier(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match &node.expansion {
                Some((_, children)) => pending.extend(children.iter().rev()),
                None => out.push(node.symbol.clone()),
            }
        }
        out
    }

    /// Leftmost derivation steps, computed lazily. Calling again restarts.
    pub fn steps(&self) -> LeftmostSteps<'_> {
        LeftmostSteps {
            pending: vec![self],
            offset: 0,
        }
    }
}

/// Pre-order walk of a [`DerivationTree`]. `offset` counts the leaves
/// already passed, which is where the next expanded variable sits in the
/// current leftmost sentential form.
#[derive(Debug, Clone)]
pub struct LeftmostSteps<'a> {
    pending: Vec<&'a DerivationTree>,
    offset: usize,
}

impl Iterator for LeftmostSteps<'_> {
    type Item = DerivationStep;

    fn next(&mut self) -> Option<DerivationStep> {
        while let Some(node) = self.pending.pop() {
            match &node.expansion {
                Some((production, children)) => {
                    self.pending.extend(children.iter().rev());
                    return Some(DerivationStep {
                        production: production.clone(),
                        position: self.offset,
                    });
                }
                None => self.offset += 1,
            }
        }
        None
    }
}

/// A finished derivation, rooted at a start variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    tree: DerivationTree,
}

impl Derivation {
    pub fn new(tree: DerivationTree) -> Self {
        Derivation { tree }
    }

    pub fn tree(&self) -> &DerivationTree {
        &self.tree
    }

    pub fn start(&self) -> &Symbol {
        self.tree.symbol()
    }

    pub fn steps(&self) -> LeftmostSteps<'_> {
        self.tree.steps()
    }

    pub fn productions(&self) -> impl Iterator<Item = Production> + '_ {
        self.steps().map(|s| s.production)
    }

    /// Every sentential form from the start variable to the derived string.
    pub fn forms(&self) -> SententialForms<'_> {
        SententialForms {
            steps: self.steps(),
            current: vec![self.start().clone()],
            started: false,
        }
    }

    pub fn derived(&self) -> Vec<Symbol> {
        self.tree.frontier()
    }

    /// The same derivation as a single-branch history of sentential forms.
    pub fn parse_tree(&self) -> ParseTree {
        let mut tree = ParseTree::new(vec![self.start().clone()]);
        let mut at = ParseTree::ROOT;
        let mut form = vec![self.start().clone()];
        for step in self.steps() {
            let Some(next) = substitute(&form, &step.production, step.position) else {
                break;
            };
            at = tree.add_child(at, next.clone(), step.production, step.position);
            form = next;
        }
        tree
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, form) in self.forms().enumerate() {
            if i > 0 {
                f.write_str(" ⇒ ")?;
            }
            write!(f, "{}", Sentential(&form))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SententialForms<'a> {
    steps: LeftmostSteps<'a>,
    current: Vec<Symbol>,
    started: bool,
}

impl Iterator for SententialForms<'_> {
    type Item = Vec<Symbol>;

    fn next(&mut self) -> Option<Vec<Symbol>> {
        if !self.started {
            self.started = true;
            return Some(self.current.clone());
        }
        let step = self.steps.next()?;
        self.current = substitute(&self.current, &step.production, step.position)?;
        Some(self.current.clone())
    }
}

pub type NodeId = usize;

/// One sentential form in a derivation history, with the production that
/// produced it from its parent's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub form: SymList,
    pub production: Option<Production>,
    pub position: usize,
    pub parent: Option<NodeId>,
    pub depth: usize,
}

/// Append-only arena of [`ParseNode`]s. Nodes are never changed once added.
#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
    children: Vec<Vec<NodeId>>,
}

impl ParseTree {
    pub const ROOT: NodeId = 0;

    pub fn new(root: impl Into<SymList>) -> Self {
        ParseTree {
            nodes: vec![ParseNode {
                form: root.into(),
                production: None,
                position: 0,
                parent: None,
                depth: 0,
            }],
            children: vec![Vec::new()],
        }
    }

    pub fn add_child(
        &mut self,
        parent: NodeId,
        form: impl Into<SymList>,
        production: Production,
        position: usize,
    ) -> NodeId {
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(ParseNode {
            form: form.into(),
            production: Some(production),
            position,
            parent: Some(parent),
            depth,
        });
        self.children.push(Vec::new());
        self.children[parent].push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &ParseNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ParseNode)> {
        self.nodes.iter().enumerate()
    }

    /// Root to `id`, inclusive.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut at = id;
        while let Some(parent) = self.nodes[at].parent {
            path.push(parent);
            at = parent;
        }
        path.reverse();
        path
    }

    pub fn steps_to(&self, id: NodeId) -> Vec<DerivationStep> {
        self.path(id)
            .into_iter()
            .filter_map(|n| {
                let node = &self.nodes[n];
                node.production.clone().map(|production| DerivationStep {
                    production,
                    position: node.position,
                })
            })
            .collect()
    }
}
