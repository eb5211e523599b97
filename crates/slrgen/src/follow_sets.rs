//! Calculation of follow set function.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// FOLLOW sets of every nonterminal symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSets {
    follow_sets: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn new(g: &Grammar, first_sets: &FirstSets) -> Self {
        let _entered = tracing::debug_span!("follow_sets").entered();
        let follow_sets = follow_set(g, first_sets);
        Self { follow_sets }
    }

    /// `Follow(n)`, or `None` for the augmented start symbol.
    pub fn follow(&self, n: NonterminalID) -> Option<&TerminalSet> {
        self.follow_sets.get(&n)
    }

    /// Iterate over the FOLLOW sets in nonterminal declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.follow_sets.iter().map(|(n, set)| (*n, set))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (n, set) in self.iter() {
                writeln!(f, "FOLLOW({}) = {}", g.nonterminal_name(n), set.display(g))?;
            }
            Ok(())
        })
    }
}

fn follow_set(g: &Grammar, first_sets: &FirstSets) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = Map::default();
    for (id, _) in g.nonterminals() {
        map.insert(id, TerminalSet::default());
    }
    map[&g.start_symbol()].insert(TerminalID::EOI);

    // H -> α A β という構文規則中の A の出現それぞれに対し、
    //  1. First(β) \ {ε} を Follow(A) に直接追加する
    //  2. β が nullable なら Follow(A) \supseteq Follow(H) という制約を追加する
    #[derive(Debug)]
    struct Constraint {
        sup: NonterminalID,
        sub: NonterminalID,
    }
    let mut constraints = vec![];
    for (_, p) in g
        .productions()
        .filter(|(id, _)| *id != ProductionID::ACCEPT)
    {
        for (i, symbol) in p.right().iter().enumerate() {
            let SymbolID::N(n) = *symbol else {
                continue;
            };

            let mut first = first_sets.first_of(&p.right()[i + 1..]);
            let nullable_tail = first.remove(TerminalID::EPSILON);
            map[&n].union_with(&first);

            if nullable_tail && p.left() != n {
                constraints.push(Constraint {
                    sup: n,
                    sub: p.left(),
                });
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;

        for Constraint { sup, sub } in &constraints {
            if map[sub].is_subset(&map[sup]) {
                continue;
            }
            let subset = map[sub].clone();
            map[sup].union_with(&subset);
            tracing::trace!("Follow({:?}) grows from Follow({:?})", sup, sub);
            changed = true;
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn follow_of(g: &Grammar, follow: &FollowSets, name: &str) -> String {
        let n = g.nonterminal(name).unwrap();
        follow.follow(n).unwrap().display(g).to_string()
    }

    #[test]
    fn balanced_strings() {
        let grammar = Grammar::from_str(
            "TERMINALS a b\n\
             NONTERMINALS S\n\
             ##\n\
             S -> a S b | EPS\n",
        )
        .unwrap();

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        assert_eq!(follow_of(&grammar, &follow, "S"), "{b, $}");
    }

    #[test]
    fn expression_grammar() {
        let grammar = Grammar::from_str(
            "TERMINALS + * ( ) id\n\
             NONTERMINALS E T F\n\
             ##\n\
             E -> E + T | T\n\
             T -> T * F | F\n\
             F -> ( E ) | id\n",
        )
        .unwrap();

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        assert_eq!(follow_of(&grammar, &follow, "E"), "{+, ), $}");
        assert_eq!(follow_of(&grammar, &follow, "T"), "{+, *, ), $}");
        assert_eq!(follow_of(&grammar, &follow, "F"), "{+, *, ), $}");
    }

    #[test]
    fn nullable_tail_propagates_follow_of_head() {
        // S -> A B
        // A -> a
        // B -> b | EPS
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;
            g.production(s, [N(a_), N(b_)])?;
            g.production(a_, [T(a)])?;
            g.production(b_, [T(b)])?;
            g.production(b_, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        assert_eq!(follow_of(&grammar, &follow, "A"), "{b, $}");
        assert_eq!(follow_of(&grammar, &follow, "B"), "{$}");
        assert!(!follow
            .follow(grammar.nonterminal("A").unwrap())
            .unwrap()
            .contains(TerminalID::EPSILON));
    }

    #[test]
    fn mutual_recursion_reaches_fixpoint() {
        // S -> A x
        // A -> y B
        // B -> z A | EPS
        let grammar = Grammar::from_str(
            "TERMINALS x y z\n\
             NONTERMINALS S A B\n\
             ##\n\
             S -> A x\n\
             A -> y B\n\
             B -> z A | EPS\n",
        )
        .unwrap();

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        assert_eq!(follow_of(&grammar, &follow, "S"), "{$}");
        assert_eq!(follow_of(&grammar, &follow, "A"), "{x}");
        assert_eq!(follow_of(&grammar, &follow, "B"), "{x}");
    }

    #[test]
    fn start_symbol_is_followed_by_end_of_input() {
        let grammar = Grammar::from_str(
            "TERMINALS a\n\
             NONTERMINALS S T\n\
             ##\n\
             S -> T\n\
             T -> a\n",
        )
        .unwrap();

        let first = FirstSets::new(&grammar);
        let follow = FollowSets::new(&grammar, &first);
        assert!(follow
            .follow(grammar.start_symbol())
            .unwrap()
            .contains(TerminalID::EOI));
        assert_eq!(follow.follow(NonterminalID::START), None);
        assert_eq!(follow_of(&grammar, &follow, "T"), "{$}");
    }
}
