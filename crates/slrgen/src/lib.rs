//! SLR(1) analysis of context-free grammars.
//!
//! The pipeline runs strictly forward:
//! [`Grammar`](grammar::Grammar) → FIRST sets / LR(0) automaton → FOLLOW sets → parse table.

pub mod analysis;
pub mod dot;
pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod lr0;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

pub use crate::analysis::{analyze, Analysis};
