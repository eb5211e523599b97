//! Calculation of SLR(1) parse table with conflict detection.

use crate::{
    follow_sets::FollowSets,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID, TerminalSet},
    lr0::{LR0Automaton, StateID},
    types::Map,
    util::display_fn,
};
use indexmap::map::Entry;
use std::fmt;

/// The action that the LR automaton in a state performs on a particular symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Transition after a reduction to the specified nonterminal.
    Goto(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,
}

impl Action {
    /// `Shift 3`, `Goto 3`, `Reduce S -> a S b` or `Accept`.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift(next) => write!(f, "Shift {}", next),
            Action::Goto(next) => write!(f, "Goto {}", next),
            Action::Reduce(p) => write!(f, "Reduce {}", g.production(*p).display(g)),
            Action::Accept => f.write_str("Accept"),
        })
    }

    /// The state this action transitions to, if any.
    pub fn target(&self) -> Option<StateID> {
        match self {
            Action::Shift(next) | Action::Goto(next) => Some(*next),
            Action::Reduce(..) | Action::Accept => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseTableRow {
    cells: Map<SymbolID, Action>,
}

impl ParseTableRow {
    pub fn get(&self, symbol: SymbolID) -> Option<&Action> {
        self.cells.get(&symbol)
    }

    /// The action on the lookahead `t`. `None` means a syntax error.
    pub fn action(&self, t: TerminalID) -> Option<&Action> {
        self.get(SymbolID::T(t))
    }

    pub fn goto(&self, n: NonterminalID) -> Option<StateID> {
        match self.get(SymbolID::N(n))? {
            Action::Goto(next) => Some(*next),
            _ => None,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (SymbolID, &Action)> + '_ {
        self.cells.iter().map(|(symbol, action)| (*symbol, action))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    rows: Vec<ParseTableRow>,
}

impl ParseTable {
    pub fn rows(&self) -> impl Iterator<Item = (StateID, &ParseTableRow)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (StateID::from_raw(i as u32), row))
    }

    pub fn row(&self, state: StateID) -> Option<&ParseTableRow> {
        self.rows.get(state.into_raw() as usize)
    }

    pub fn get(&self, state: StateID, symbol: SymbolID) -> Option<&Action> {
        self.row(state)?.get(symbol)
    }

    /// Render the table as a grid, one row per state.
    ///
    /// Columns are the terminals, the end-of-input marker, then the nonterminals.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let columns: Vec<SymbolID> = g
                .terminals()
                .map(|(t, _)| SymbolID::T(t))
                .chain(Some(SymbolID::T(TerminalID::EOI)))
                .chain(g.nonterminals().map(|(n, _)| SymbolID::N(n)))
                .collect();

            let mut grid: Vec<Vec<String>> = Vec::with_capacity(self.rows.len() + 1);
            grid.push(
                Some("State".to_owned())
                    .into_iter()
                    .chain(columns.iter().map(|s| g.symbol_name(*s).to_owned()))
                    .collect(),
            );
            for (id, row) in self.rows() {
                grid.push(
                    Some(id.to_string())
                        .into_iter()
                        .chain(columns.iter().map(|s| {
                            row.get(*s)
                                .map(|action| action.display(g).to_string())
                                .unwrap_or_default()
                        }))
                        .collect(),
                );
            }

            let mut widths = vec![0; columns.len() + 1];
            for line in &grid {
                for (width, cell) in widths.iter_mut().zip(line) {
                    *width = (*width).max(cell.chars().count());
                }
            }

            for line in &grid {
                let mut rendered = String::new();
                for (i, (cell, width)) in line.iter().zip(&widths).enumerate() {
                    if i > 0 {
                        rendered.push_str(" | ");
                    }
                    rendered.push_str(cell);
                    rendered.extend(std::iter::repeat(' ').take(width - cell.chars().count()));
                }
                writeln!(f, "{}", rendered.trim_end())?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    AcceptReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftReduce => f.write_str("shift/reduce"),
            Self::ReduceReduce => f.write_str("reduce/reduce"),
            Self::AcceptReduce => f.write_str("accept/reduce"),
        }
    }
}

/// Two different actions competing for the same table cell.
///
/// The grammar is not SLR(1).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} conflict in state {state} on `{symbol_name}': {existing_desc} vs {incoming_desc}")]
pub struct Conflict {
    pub state: StateID,
    pub symbol: SymbolID,
    pub kind: ConflictKind,
    /// The action already recorded in the cell.
    pub existing: Action,
    /// The action that could not be recorded.
    pub incoming: Action,
    symbol_name: String,
    existing_desc: String,
    incoming_desc: String,
}

impl Conflict {
    fn new(g: &Grammar, state: StateID, symbol: SymbolID, existing: Action, incoming: Action) -> Self {
        // shifts and gotos are recorded before any reduction.
        let kind = match (existing, incoming) {
            (Action::Accept, _) | (_, Action::Accept) => ConflictKind::AcceptReduce,
            (Action::Reduce(..), Action::Reduce(..)) => ConflictKind::ReduceReduce,
            _ => ConflictKind::ShiftReduce,
        };
        Self {
            state,
            symbol,
            kind,
            existing,
            incoming,
            symbol_name: g.symbol_name(symbol).to_owned(),
            existing_desc: existing.display(g).to_string(),
            incoming_desc: incoming.display(g).to_string(),
        }
    }
}

/// Synthesize the SLR(1) parse table, failing on the first conflicting cell.
pub fn generate(
    g: &Grammar,
    lr0: &LR0Automaton,
    follow_sets: &FollowSets,
) -> Result<ParseTable, Conflict> {
    let _entered = tracing::debug_span!("table").entered();

    let mut rows = Vec::with_capacity(lr0.len());
    for (id, state) in lr0.states() {
        let mut row = ParseTableRow::default();

        // shift, goto
        for (symbol, next) in state.transitions() {
            let action = match symbol {
                SymbolID::T(..) => Action::Shift(next),
                SymbolID::N(..) => Action::Goto(next),
            };
            record(g, id, &mut row, symbol, action)?;
        }

        // reduce, accept
        for item in state.completed(g) {
            if item.production == ProductionID::ACCEPT {
                record(g, id, &mut row, SymbolID::T(TerminalID::EOI), Action::Accept)?;
                continue;
            }
            let left = g.production(item.production).left();
            for t in follow_sets.follow(left).into_iter().flat_map(TerminalSet::iter) {
                record(g, id, &mut row, SymbolID::T(t), Action::Reduce(item.production))?;
            }
        }

        rows.push(row);
    }

    tracing::debug!(
        "{} cell(s) in {} row(s)",
        rows.iter().map(ParseTableRow::len).sum::<usize>(),
        rows.len()
    );

    Ok(ParseTable { rows })
}

fn record(
    g: &Grammar,
    state: StateID,
    row: &mut ParseTableRow,
    symbol: SymbolID,
    action: Action,
) -> Result<(), Conflict> {
    match row.cells.entry(symbol) {
        Entry::Vacant(entry) => {
            tracing::trace!("{:?}: {:?} => {:?}", state, symbol, action);
            entry.insert(action);
            Ok(())
        }
        Entry::Occupied(entry) if *entry.get() == action => Ok(()),
        Entry::Occupied(entry) => {
            let conflict = Conflict::new(g, state, symbol, *entry.get(), action);
            tracing::debug!("{}", conflict);
            Err(conflict)
        }
    }
}
