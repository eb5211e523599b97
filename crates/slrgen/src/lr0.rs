//! LR(0) automaton construction.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StateID {
    /// The initial state, `closure({S' -> . S})`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The LR(0) item, a production with a marker on its right-hand side.
///
/// Items are ordered by production declaration order, then by marker position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub production: ProductionID,
    pub index: u16,
}

impl LR0Item {
    pub const fn new(production: ProductionID) -> Self {
        Self {
            production,
            index: 0,
        }
    }

    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .right()
            .get(usize::from(self.index))
            .copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.next_symbol(g).is_none()
    }

    fn advance(self) -> Self {
        Self {
            index: self.index + 1,
            ..self
        }
    }

    // `"LHS -> R1 . R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = g.production(self.production);
            write!(f, "{} ->", g.nonterminal_name(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == usize::from(self.index) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if production.right().len() == usize::from(self.index) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// Compute the closure of the given items.
///
/// The result is deduplicated and sorted, so two closures are equal iff they
/// contain the same items.
pub fn closure<I>(g: &Grammar, items: I) -> Vec<LR0Item>
where
    I: IntoIterator<Item = LR0Item>,
{
    let mut items: Set<LR0Item> = items.into_iter().collect();
    let mut i = 0;
    while i < items.len() {
        if let Some(SymbolID::N(n)) = items[i].next_symbol(g) {
            for (id, _) in g.productions_of(n) {
                items.insert(LR0Item::new(id));
            }
        }
        i += 1;
    }
    let mut items: Vec<_> = items.into_iter().collect();
    items.sort_unstable();
    items
}

/// Compute `goto(items, symbol)`, or `None` if no item expects `symbol`.
pub fn goto(g: &Grammar, items: &[LR0Item], symbol: SymbolID) -> Option<Vec<LR0Item>> {
    let kernels: Vec<_> = items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(|item| item.advance())
        .collect();
    if kernels.is_empty() {
        return None;
    }
    Some(closure(g, kernels))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LR0State {
    items: Vec<LR0Item>,
    transitions: Map<SymbolID, StateID>,
}

impl LR0State {
    /// The closed item set of this state, sorted.
    pub fn items(&self) -> &[LR0Item] {
        &self.items[..]
    }

    /// The outgoing edges in the order the symbols were first seen after a marker.
    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, next)| (*symbol, *next))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }

    pub fn shifts(&self) -> impl Iterator<Item = (TerminalID, StateID)> + '_ {
        self.transitions().filter_map(|(symbol, next)| match symbol {
            SymbolID::T(t) => Some((t, next)),
            SymbolID::N(..) => None,
        })
    }

    pub fn gotos(&self) -> impl Iterator<Item = (NonterminalID, StateID)> + '_ {
        self.transitions().filter_map(|(symbol, next)| match symbol {
            SymbolID::N(n) => Some((n, next)),
            SymbolID::T(..) => None,
        })
    }

    /// Items whose marker reached the end of the production.
    pub fn completed<'a>(&'a self, g: &'a Grammar) -> impl Iterator<Item = LR0Item> + 'a {
        self.items.iter().copied().filter(move |item| item.is_complete(g))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## items:")?;
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.transitions.is_empty() {
                writeln!(f, "## transitions:")?;
                for (symbol, next) in &self.transitions {
                    writeln!(f, "- {} => {}", g.symbol_name(*symbol), next)?;
                }
            }
            Ok(())
        })
    }
}

/// The canonical collection of LR(0) item sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LR0Automaton {
    states: Vec<LR0State>,
}

impl LR0Automaton {
    pub fn states(&self) -> impl Iterator<Item = (StateID, &LR0State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID(i as u32), state))
    }

    pub fn state(&self, id: StateID) -> Option<&LR0State> {
        self.states.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The labelled transition relation `(from, symbol, to)`.
    pub fn transitions(&self) -> impl Iterator<Item = (StateID, SymbolID, StateID)> + '_ {
        self.states().flat_map(|(id, state)| {
            state
                .transitions()
                .map(move |(symbol, next)| (id, symbol, next))
        })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (id, state) in self.states() {
                if id != StateID::START {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the LR(0) automaton based on the specified grammar.
pub fn lr0(g: &Grammar) -> LR0Automaton {
    let _entered = tracing::debug_span!("lr0").entered();

    let initial = closure(g, Some(LR0Item::new(ProductionID::ACCEPT)));

    let mut item_sets = Map::<Vec<LR0Item>, StateID>::default();
    item_sets.insert(initial.clone(), StateID::START);
    let mut states = vec![LR0State {
        items: initial,
        transitions: Map::default(),
    }];

    // states are processed in discovery order, `current` being the head of the queue.
    let mut current = 0;
    let mut new_kernels = Map::<SymbolID, Vec<LR0Item>>::default();
    while current < states.len() {
        new_kernels.clear();
        for item in &states[current].items {
            if let Some(symbol) = item.next_symbol(g) {
                new_kernels.entry(symbol).or_default().push(item.advance());
            }
        }

        let mut transitions = Map::default();
        for (symbol, kernels) in new_kernels.drain(..) {
            let items = closure(g, kernels);
            let next = match item_sets.get(&items) {
                Some(id) => *id,
                None => {
                    let id = StateID(
                        u32::try_from(states.len()).expect("too many LR(0) states"),
                    );
                    tracing::trace!("new state {:?} ({} items)", id, items.len());
                    item_sets.insert(items.clone(), id);
                    states.push(LR0State {
                        items,
                        transitions: Map::default(),
                    });
                    id
                }
            };
            transitions.insert(symbol, next);
        }
        states[current].transitions = transitions;

        current += 1;
    }

    tracing::debug!("{} LR(0) state(s)", states.len());

    LR0Automaton { states }
}
