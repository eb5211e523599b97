//! The whole SLR(1) analysis pipeline over a grammar.

use crate::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::Grammar,
    lr0::{lr0, LR0Automaton},
    table::{self, Conflict, ParseTable},
};

/// Every artifact derived from a grammar.
///
/// A conflicting grammar still yields its FIRST/FOLLOW sets and LR(0)
/// automaton, so that the conflict can be reported alongside them.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub first_sets: FirstSets,
    pub follow_sets: FollowSets,
    pub automaton: LR0Automaton,
    pub table: Result<ParseTable, Conflict>,
}

impl Analysis {
    pub fn table(&self) -> Result<&ParseTable, &Conflict> {
        self.table.as_ref()
    }

    pub fn is_slr1(&self) -> bool {
        self.table.is_ok()
    }
}

pub fn analyze(g: &Grammar) -> Analysis {
    let _entered = tracing::debug_span!("analyze").entered();

    let first_sets = FirstSets::new(g);
    let follow_sets = FollowSets::new(g, &first_sets);
    let automaton = lr0(g);
    tracing::debug!("{} LR(0) state(s)", automaton.len());

    let table = table::generate(g, &automaton, &follow_sets);
    if let Err(conflict) = &table {
        tracing::debug!("not SLR(1): {}", conflict);
    }

    Analysis {
        first_sets,
        follow_sets,
        automaton,
        table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_is_deterministic() {
        let grammar = Grammar::from_str(
            "TERMINALS + * ( ) id\n\
             NONTERMINALS E T F\n\
             ##\n\
             E -> E + T | T\n\
             T -> T * F | F\n\
             F -> ( E ) | id\n",
        )
        .unwrap();

        let first = analyze(&grammar);
        let second = analyze(&grammar);
        assert!(first.is_slr1());
        assert_eq!(first.first_sets, second.first_sets);
        assert_eq!(first.follow_sets, second.follow_sets);
        assert_eq!(first.automaton, second.automaton);
        assert_eq!(first.table().ok(), second.table().ok());
        assert_eq!(
            first.automaton.display(&grammar).to_string(),
            second.automaton.display(&grammar).to_string()
        );
    }

    #[test]
    fn conflict_keeps_other_artifacts() {
        let grammar = Grammar::from_str(
            "TERMINALS x\n\
             NONTERMINALS S A B\n\
             ##\n\
             S -> A | B\n\
             A -> x\n\
             B -> x\n",
        )
        .unwrap();

        let analysis = analyze(&grammar);
        assert!(!analysis.is_slr1());
        assert!(analysis.table().is_err());
        assert_eq!(analysis.first_sets.iter().count(), 3);
        assert_eq!(analysis.follow_sets.iter().count(), 3);
        assert!(!analysis.automaton.is_empty());
    }
}
