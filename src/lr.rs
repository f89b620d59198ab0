//! SLR(1) tables over the LR(0) item-set automaton, and the shift-reduce
//! driver.

use crate::error::{GrammarError, ParseError};
use crate::grammar::{Grammar, Production};
use crate::limits::{CancelFlag, Checkpoint, Guard, NeverContinue, SearchLimits};
use crate::sets::{GrammarSets, Lookahead};
use crate::symbol::{Sentential, Symbol};
use crate::{IndexMap, IndexSet, Step};
use alloc::collections::{BTreeSet, VecDeque};
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use log::{debug, trace, warn};

/// Index into [`SlrTable::productions`]; 0 is the augmented `S' → S`.
pub type ProdId = usize;
pub type StateId = usize;

/// A production with a dot in its right side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProdId,
    pub dot: usize,
}

pub type ItemSet = BTreeSet<Item>;

#[derive(Debug, Clone)]
pub struct LrState {
    pub kernel: ItemSet,
    pub items: ItemSet,
    transitions: IndexMap<Symbol, StateId>,
}

/// Cells keep their actions in this order, so a driver facing a conflict
/// accepts before it shifts, and shifts before it reduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Accept,
    Shift(StateId),
    Reduce(ProdId),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Accept => f.write_str("acc"),
            Action::Shift(s) => write!(f, "s{s}"),
            Action::Reduce(p) => write!(f, "r{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    /// `S' → S•` competing with a reduction on `$`
    AcceptReduce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrConflict {
    pub state: StateId,
    pub lookahead: Lookahead,
    pub actions: Vec<Action>,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone)]
pub struct SlrTable {
    productions: Vec<Production>,
    states: Vec<LrState>,
    actions: Vec<IndexMap<Lookahead, Vec<Action>>>,
    sets: GrammarSets,
    conflicts: Vec<LrConflict>,
}

/// `S'`, or `S''` and so on when that name is taken.
fn augmented_start(grammar: &Grammar, start: &Symbol) -> Symbol {
    let mut name = format!("{start}'");
    while grammar.has_variable(&Symbol::var(&name)) || grammar.has_terminal(&Symbol::term(&name)) {
        name.push('\'');
    }
    Symbol::var(&name)
}

struct Builder<'p> {
    productions: &'p [Production],
    on: IndexMap<Symbol, Vec<ProdId>>,
}

impl Builder<'_> {
    fn after_dot(&self, item: &Item) -> Option<&Symbol> {
        self.productions[item.production].rhs().get(item.dot)
    }

    fn closure(&self, kernel: &ItemSet) -> ItemSet {
        let mut result = kernel.clone();
        let mut worklist: Vec<Item> = kernel.iter().copied().collect();
        while let Some(item) = worklist.pop() {
            let Some(next) = self.after_dot(&item) else {
                continue;
            };
            for &production in self.on.get(next).into_iter().flatten() {
                let fresh = Item { production, dot: 0 };
                if result.insert(fresh) {
                    worklist.push(fresh);
                }
            }
        }
        result
    }

    fn goto_kernel(&self, items: &ItemSet, symbol: &Symbol) -> ItemSet {
        items
            .iter()
            .filter(|item| self.after_dot(item) == Some(symbol))
            .map(|item| Item {
                production: item.production,
                dot: item.dot + 1,
            })
            .collect()
    }

    fn automaton(&self) -> Vec<LrState> {
        let kernel: ItemSet = BTreeSet::from([Item {
            production: 0,
            dot: 0,
        }]);
        let mut states = vec![LrState {
            items: self.closure(&kernel),
            kernel: kernel.clone(),
            transitions: IndexMap::default(),
        }];
        let mut kernel_to_state: HashMap<ItemSet, StateId> = HashMap::new();
        kernel_to_state.insert(kernel, 0);

        let mut worklist = VecDeque::from([0]);
        while let Some(id) = worklist.pop_front() {
            let symbols: IndexSet<Symbol> = states[id]
                .items
                .iter()
                .filter_map(|item| self.after_dot(item).cloned())
                .collect();
            for symbol in symbols {
                let kernel = self.goto_kernel(&states[id].items, &symbol);
                let target = match kernel_to_state.get(&kernel) {
                    Some(&existing) => existing,
                    None => {
                        let fresh = states.len();
                        states.push(LrState {
                            items: self.closure(&kernel),
                            kernel: kernel.clone(),
                            transitions: IndexMap::default(),
                        });
                        kernel_to_state.insert(kernel, fresh);
                        worklist.push_back(fresh);
                        fresh
                    }
                };
                states[id].transitions.insert(symbol, target);
            }
        }
        states
    }
}

impl SlrTable {
    pub fn build(grammar: &Grammar) -> Result<Self, GrammarError> {
        let start = grammar.require_context_free()?.clone();
        let sets = GrammarSets::new(grammar)?;

        let augmented = augmented_start(grammar, &start);
        let mut productions = vec![Production::rule(augmented, vec![start])];
        productions.extend(grammar.productions().cloned());
        let mut on: IndexMap<Symbol, Vec<ProdId>> = IndexMap::default();
        for (id, p) in productions.iter().enumerate() {
            if let Some(head) = p.head() {
                on.entry(head.clone()).or_default().push(id);
            }
        }
        let states = Builder {
            productions: &productions,
            on,
        }
        .automaton();

        let mut actions = Vec::with_capacity(states.len());
        for state in &states {
            let mut row: IndexMap<Lookahead, Vec<Action>> = IndexMap::default();
            let mut put = |lookahead: Lookahead, action: Action| {
                let cell = row.entry(lookahead).or_default();
                if !cell.contains(&action) {
                    cell.push(action);
                }
            };
            for item in &state.items {
                let p = &productions[item.production];
                match p.rhs().get(item.dot) {
                    Some(next) if next.is_terminal() => {
                        if let Some(&target) = state.transitions.get(next) {
                            put(Lookahead::Term(next.clone()), Action::Shift(target));
                        }
                    }
                    Some(_) => {}
                    None if item.production == 0 => put(Lookahead::End, Action::Accept),
                    None => {
                        let follow = p.head().and_then(|h| sets.follow(h));
                        for lookahead in follow.into_iter().flatten() {
                            put(lookahead.clone(), Action::Reduce(item.production));
                        }
                    }
                }
            }
            for cell in row.values_mut() {
                cell.sort();
            }
            actions.push(row);
        }

        let mut conflicts = Vec::new();
        for (state, row) in actions.iter().enumerate() {
            for (lookahead, cell) in row.iter().filter(|(_, cell)| cell.len() > 1) {
                let kind = if cell.iter().any(|a| matches!(a, Action::Shift(_))) {
                    ConflictKind::ShiftReduce
                } else if cell.contains(&Action::Accept) {
                    ConflictKind::AcceptReduce
                } else {
                    ConflictKind::ReduceReduce
                };
                conflicts.push(LrConflict {
                    state,
                    lookahead: lookahead.clone(),
                    actions: cell.clone(),
                    kind,
                });
            }
        }
        if conflicts.is_empty() {
            debug!("SLR(1) table built: {} state(s)", states.len());
        } else {
            warn!(
                "grammar has {} SLR(1) conflict(s) over {} state(s)",
                conflicts.len(),
                states.len()
            );
        }

        Ok(SlrTable {
            productions,
            states,
            actions,
            sets,
            conflicts,
        })
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProdId) -> &Production {
        &self.productions[id]
    }

    pub fn states(&self) -> &[LrState] {
        &self.states
    }

    pub fn sets(&self) -> &GrammarSets {
        &self.sets
    }

    pub fn conflicts(&self) -> &[LrConflict] {
        &self.conflicts
    }

    pub fn is_slr1(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn actions(&self, state: StateId, lookahead: &Lookahead) -> &[Action] {
        self.actions
            .get(state)
            .and_then(|row| row.get(lookahead))
            .map_or(&[], Vec::as_slice)
    }

    /// The action the driver takes: the first in the cell.
    pub fn action(&self, state: StateId, lookahead: &Lookahead) -> Option<Action> {
        self.actions(state, lookahead).first().copied()
    }

    pub fn goto(&self, state: StateId, variable: &Symbol) -> Option<StateId> {
        self.states.get(state)?.transitions.get(variable).copied()
    }

    pub fn expected(&self, state: StateId) -> Vec<Option<Symbol>> {
        self.actions
            .get(state)
            .into_iter()
            .flat_map(|row| row.keys())
            .map(Lookahead::as_input)
            .collect()
    }

    /// A driver on the default schedule that stops at the first checkpoint.
    pub fn driver(&self, input: &[Symbol]) -> LrDriver<'_> {
        LrDriver::new(self, input, SearchLimits::default(), NeverContinue)
    }
}

/// Shift-reduce run over one input. The checkpoint is consulted on the
/// `limits` schedule of moves, which guards against tables that cycle
/// through reductions forever.
#[derive(Debug, Clone)]
pub struct LrDriver<'t, C = NeverContinue> {
    table: &'t SlrTable,
    input: Vec<Symbol>,
    position: usize,
    states: Vec<StateId>,
    symbols: Vec<Symbol>,
    reductions: Vec<ProdId>,
    guard: Guard<C>,
    done: Option<Step>,
}

impl<'t, C: Checkpoint> LrDriver<'t, C> {
    pub fn new(table: &'t SlrTable, input: &[Symbol], limits: SearchLimits, checkpoint: C) -> Self {
        LrDriver {
            table,
            input: input.to_vec(),
            position: 0,
            states: vec![0],
            symbols: Vec::new(),
            reductions: Vec::new(),
            guard: Guard::new(limits, checkpoint),
            done: None,
        }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.guard.cancel.clone()
    }

    fn finish(&mut self, step: Step) -> Step {
        trace!("SLR(1) finished: {step:?}");
        self.done = Some(step.clone());
        step
    }

    fn reject(&mut self, state: StateId) -> Step {
        let found = self.input.get(self.position).cloned();
        let expected = self.table.expected(state);
        self.finish(Step::Reject(ParseError { found, expected }))
    }

    pub fn step(&mut self) -> Step {
        if let Some(done) = &self.done {
            return done.clone();
        }
        if !self.guard.advance() {
            return self.finish(Step::Abandoned);
        }
        let state = self.states.last().copied().unwrap_or(0);
        let lookahead = Lookahead::of(self.input.get(self.position));
        match self.table.action(state, &lookahead) {
            None => self.reject(state),
            Some(Action::Accept) => self.finish(Step::Accept),
            Some(Action::Shift(target)) => {
                trace!("SLR(1) shift {lookahead} to {target}");
                if let Some(s) = self.input.get(self.position) {
                    self.symbols.push(s.clone());
                }
                self.position += 1;
                self.states.push(target);
                Step::Continue
            }
            Some(Action::Reduce(id)) => {
                let production = self.table.production(id);
                let width = production.rhs().len();
                if width >= self.states.len() {
                    return self.reject(state);
                }
                self.states.truncate(self.states.len() - width);
                self.symbols.truncate(self.symbols.len().saturating_sub(width));
                let exposed = self.states.last().copied().unwrap_or(0);
                let Some(head) = production.head() else {
                    return self.reject(state);
                };
                let Some(target) = self.table.goto(exposed, head) else {
                    return self.reject(exposed);
                };
                trace!("SLR(1) reduce {production}, goto {target}");
                self.symbols.push(head.clone());
                self.states.push(target);
                self.reductions.push(id);
                Step::Continue
            }
        }
    }

    pub fn run(&mut self) -> Step {
        loop {
            let step = self.step();
            if step.is_done() {
                return step;
            }
        }
    }

    /// Productions reduced so far, in reduction order.
    pub fn reductions(&self) -> impl Iterator<Item = &Production> {
        self.reductions.iter().map(|&id| self.table.production(id))
    }

    /// Reductions reversed: the rightmost derivation of what was reduced.
    pub fn derivation(&self) -> Vec<Production> {
        self.reductions
            .iter()
            .rev()
            .map(|&id| self.table.production(id).clone())
            .collect()
    }

    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn remaining(&self) -> &[Symbol] {
        &self.input[self.position.min(self.input.len())..]
    }

    /// The right sentential form: stacked symbols, then unread input.
    pub fn sentential(&self) -> Vec<Symbol> {
        let mut form = self.symbols.clone();
        form.extend_from_slice(self.remaining());
        form
    }
}

impl<C: Checkpoint> fmt::Display for LrDriver<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Sentential(&self.sentential()))
    }
}
