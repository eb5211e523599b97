use slrgen::{
    analyze,
    grammar::{Grammar, GrammarError},
    table::{Action, ConflictKind},
};
use std::{env, path::PathBuf};

fn load(name: &str) -> Result<Grammar, GrammarError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Grammar::from_file(
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
            .join(format!("tests/{}.grammar", name)),
    )
}

macro_rules! define_tests {
    (slr1: $($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name)).unwrap();
            let analysis = analyze(&grammar);
            eprintln!("{}", analysis.automaton.display(&grammar));
            let table = analysis.table().unwrap();
            eprintln!("{}", table.display(&grammar));

            let accepts = table
                .rows()
                .flat_map(|(_, row)| row.cells())
                .filter(|(_, action)| **action == Action::Accept)
                .count();
            assert_eq!(accepts, 1);
        }
    )*};

    (conflict: $($name:ident => $kind:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name)).unwrap();
            let analysis = analyze(&grammar);
            let conflict = analysis.table().unwrap_err();
            eprintln!("{}", conflict);
            assert_eq!(conflict.kind, ConflictKind::$kind);
            assert!(analysis.automaton.state(conflict.state).is_some());
        }
    )*};

    (malformed: $($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let err = load(stringify!($name)).unwrap_err();
            eprintln!("{}", err);
            assert!(matches!(err, GrammarError::Malformed { .. }), "{}", err);
        }
    )*};
}

define_tests! {
    slr1:
    arithmetic,
    balanced,
    lists,
    statements,
}

define_tests! {
    conflict:
    ambiguous_sum => ShiftReduce,
    dangling_else => ShiftReduce,
    reduce_reduce => ReduceReduce,
}

define_tests! {
    malformed:
    arrow_in_name,
    missing_production,
    undeclared_symbol,
}

#[test]
fn missing_file() {
    let err = load("no_such_grammar").unwrap_err();
    assert!(matches!(err, GrammarError::IO(..)), "{}", err);
}
