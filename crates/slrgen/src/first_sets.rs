//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// FIRST sets of every nonterminal symbol.
///
/// A nullable nonterminal has [`TerminalID::EPSILON`] in its FIRST set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    first_sets: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(g: &Grammar) -> Self {
        let _entered = tracing::debug_span!("first_sets").entered();

        let nulls = nulls_set(g);
        tracing::debug!("{} nullable nonterminal(s)", nulls.len());

        let first_sets = first_set(g, &nulls);
        Self { nulls, first_sets }
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(t) => t == TerminalID::EPSILON,
            SymbolID::N(n) => self.nulls.contains(&n),
        }
    }

    /// `First(symbol)`
    pub fn first(&self, symbol: SymbolID) -> TerminalSet {
        match symbol {
            SymbolID::T(t) => Some(t).into_iter().collect(),
            SymbolID::N(n) => self.first_sets.get(&n).cloned().unwrap_or_default(),
        }
    }

    /// `First(Y1 Y2 ... Yn)`, containing `EPS` when every `Yi` is nullable.
    pub fn first_of(&self, symbols: &[SymbolID]) -> TerminalSet {
        let mut res = TerminalSet::default();
        for symbol in symbols {
            let mut added = self.first(*symbol);
            added.remove(TerminalID::EPSILON);
            res.union_with(&added);
            if !self.is_nullable(*symbol) {
                return res;
            }
        }
        res.insert(TerminalID::EPSILON);
        res
    }

    /// Iterate over the FIRST sets in nonterminal declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &TerminalSet)> + '_ {
        self.first_sets.iter().map(|(n, set)| (*n, set))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (n, set) in self.iter() {
                writeln!(f, "FIRST({}) = {}", g.nonterminal_name(n), set.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(g: &Grammar) -> Set<NonterminalID> {
    // ruleからnullableであることが分かっている場合は追加する
    let mut nulls: Set<NonterminalID> = g
        .productions()
        .filter_map(|(_id, p)| p.right().is_empty().then_some(p.left()))
        .collect();
    let productions: Vec<_> = g
        .productions()
        .filter_map(|(id, p)| (id != ProductionID::ACCEPT).then_some(p))
        .collect();

    // 値が更新されなくなるまで繰り返す
    let mut changed = true;
    while changed {
        changed = false;
        for p in &productions {
            if nulls.contains(&p.left()) {
                continue;
            }
            // 右辺のsymbolsがすべてnullableかどうか
            let is_rhs_nullable = p
                .right()
                .iter()
                .all(|s| matches!(s, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(p.left());
            }
        }
    }

    nulls
}

/// Constructs the first sets of the nonterminal symbols in this grammar.
fn first_set(g: &Grammar, nulls: &Set<NonterminalID>) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = Map::default();

    // nonterminal symbols は First(T) = {} と初期化する
    for (id, _) in g.nonterminals() {
        map.insert(id, TerminalSet::default());
    }

    // 制約条件の抽出
    // X -> Y1 Y2 ... Yn という構文規則に対し、
    //  1. Y1,Y2,...と検索していき、最初に来る非nullableな記号を Yk とする
    //  2. Yi (i=1,2,..,k) が終端記号なら First(X) に直接追加し、
    //     非終端記号なら First(X) \supseteq First(Yi) という制約を追加する
    #[derive(Debug)]
    struct Constraint {
        sup: NonterminalID,
        sub: NonterminalID,
    }
    let mut constraints = vec![];
    for p in g
        .productions()
        .filter_map(|(id, p)| (id != ProductionID::ACCEPT).then_some(p))
    {
        for symbol in p.right() {
            match symbol {
                SymbolID::T(t) => {
                    map[&p.left()].insert(*t);
                    break;
                }
                SymbolID::N(n) => {
                    if p.left() != *n {
                        constraints.push(Constraint {
                            sup: p.left(),
                            sub: *n,
                        });
                    }
                    if !nulls.contains(n) {
                        break;
                    }
                }
            }
        }
    }

    // 制約条件の解消
    // First(A) \subseteq First(B) が満たされるよう First(A) の要素を First(B) に追加するだけ。
    // これをすべての制約条件に対して繰り返す
    let mut changed = true;
    while changed {
        changed = false;

        for Constraint { sup, sub } in &constraints {
            if map[sub].is_subset(&map[sup]) {
                continue;
            }
            let subset = map[sub].clone();
            map[sup].union_with(&subset);
            tracing::trace!("First({:?}) grows from First({:?})", sup, sub);
            changed = true;
        }
    }

    for n in nulls {
        map[n].insert(TerminalID::EPSILON);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn names(g: &Grammar, set: &TerminalSet) -> String {
        set.display(g).to_string()
    }

    #[test]
    fn balanced_strings() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            g.production(s, [T(a), N(s), T(b)])?;
            g.production(s, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        let s = grammar.start_symbol();
        assert_eq!(names(&grammar, &first.first(N(s))), "{a, EPS}");
        assert!(first.is_nullable(N(s)));
    }

    #[test]
    fn terminal_first_set_is_itself() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.production(s, [T(a)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        for (t, _) in grammar.terminals() {
            let set = first.first(T(t));
            assert_eq!(set.iter().collect::<Vec<_>>(), [t]);
        }
    }

    #[test]
    fn left_recursion() {
        // E -> E + T | T
        // T -> T * F | F
        // F -> ( E ) | id
        let grammar = Grammar::define(|g| {
            let plus = g.terminal("+")?;
            let star = g.terminal("*")?;
            let lparen = g.terminal("(")?;
            let rparen = g.terminal(")")?;
            let id = g.terminal("id")?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            let f = g.nonterminal("F")?;
            g.production(e, [N(e), T(plus), N(t)])?;
            g.production(e, [N(t)])?;
            g.production(t, [N(t), T(star), N(f)])?;
            g.production(t, [N(f)])?;
            g.production(f, [T(lparen), N(e), T(rparen)])?;
            g.production(f, [T(id)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        for name in ["E", "T", "F"] {
            let n = grammar.nonterminal(name).unwrap();
            assert_eq!(names(&grammar, &first.first(N(n))), "{(, id}", "FIRST({})", name);
        }
    }

    #[test]
    fn nullable_prefix() {
        // S -> A B c
        // A -> a | EPS
        // B -> b | EPS
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;
            g.production(s, [N(a_), N(b_), T(c)])?;
            g.production(a_, [T(a)])?;
            g.production(a_, [T(TerminalID::EPSILON)])?;
            g.production(b_, [T(b)])?;
            g.production(b_, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        let s = grammar.nonterminal("S").unwrap();
        let a = grammar.nonterminal("A").unwrap();
        let b = grammar.nonterminal("B").unwrap();
        assert_eq!(names(&grammar, &first.first(N(s))), "{a, b, c}");
        assert!(!first.is_nullable(N(s)));
        assert_eq!(names(&grammar, &first.first_of(&[N(a), N(b)])), "{a, b, EPS}");
        assert_eq!(names(&grammar, &first.first_of(&[])), "{EPS}");
    }

    #[test]
    fn mutual_recursion() {
        // S -> A x
        // A -> B | y
        // B -> A z | w
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let y = g.terminal("y")?;
            let z = g.terminal("z")?;
            let w = g.terminal("w")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.production(s, [N(a), T(x)])?;
            g.production(a, [N(b)])?;
            g.production(a, [T(y)])?;
            g.production(b, [N(a), T(z)])?;
            g.production(b, [T(w)])?;
            Ok(())
        })
        .unwrap();

        let first = FirstSets::new(&grammar);
        for name in ["S", "A", "B"] {
            let n = grammar.nonterminal(name).unwrap();
            assert_eq!(names(&grammar, &first.first(N(n))), "{y, w}", "FIRST({})", name);
        }
    }
}
