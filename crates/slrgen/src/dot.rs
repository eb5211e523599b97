//! Graphviz rendering of the LR(0) automaton.

use crate::{grammar::Grammar, lr0::LR0Automaton, util::display_fn};
use std::fmt::{self, Write as _};

/// Render the automaton in the [dot language](https://graphviz.org/doc/info/lang.html).
///
/// Each state becomes a node labelled with its item set, and each transition
/// an edge labelled with the symbol it reads.
pub fn display<'g>(g: &'g Grammar, automaton: &'g LR0Automaton) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        writeln!(f, "digraph lr0 {{")?;
        writeln!(f, "\trankdir=LR;")?;
        writeln!(f, "\tnode [shape=box, fontname=\"helvetica\"];")?;
        writeln!(f)?;

        for (id, state) in automaton.states() {
            let mut label = format!("Item Set {}\n", id);
            for item in state.items() {
                writeln!(label, "{}", item.display(g))?;
            }
            writeln!(f, "\t{} [label=\"{}\"];", id, escape(&label))?;
        }
        writeln!(f)?;

        for (from, symbol, to) in automaton.transitions() {
            writeln!(
                f,
                "\t{} -> {} [label=\"{}\"];",
                from,
                to,
                escape(g.symbol_name(symbol))
            )?;
        }

        writeln!(f, "}}")
    })
}

pub fn to_dot(g: &Grammar, automaton: &LR0Automaton) -> String {
    display(g, automaton).to_string()
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\l"),
            c => escaped.push(c),
        }
    }
    escaped
}
