use anyhow::Context as _;
use clap::Parser;
use slrgen::{
    analysis::analyze,
    dot,
    grammar::{Grammar, SymbolID},
};
use std::{fs, path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    input: PathBuf,

    /// Print the FIRST and FOLLOW sets.
    #[arg(long)]
    sets: bool,

    /// Print the LR(0) item sets and their transitions.
    #[arg(long)]
    items: bool,

    /// Print the SLR(1) parsing table.
    #[arg(long)]
    table: bool,

    /// Print everything. Implied when no other output is requested.
    #[arg(long)]
    all: bool,

    /// Write the LR(0) automaton to the specified file in Graphviz DOT format.
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    if !(args.sets || args.items || args.table) {
        args.all = true;
    }
    if args.all {
        args.sets = true;
        args.items = true;
        args.table = true;
    }

    let grammar = Grammar::from_file(&args.input)
        .with_context(|| format!("failed to load the grammar from {}", args.input.display()))?;

    let mut unused_terminals = vec![];
    for (t, name) in grammar.terminals() {
        if grammar
            .productions()
            .all(|(_, p)| !p.right().contains(&SymbolID::T(t)))
        {
            unused_terminals.push(name);
        }
    }
    if !unused_terminals.is_empty() {
        println!(
            "[warning] The following terminals are not used in any production rule: {:?}",
            unused_terminals
        );
    }

    let started = Instant::now();
    let analysis = analyze(&grammar);
    tracing::info!("analysis finished in {:?}", started.elapsed());

    println!("{}", grammar);

    if args.sets {
        println!("#### FIRST sets");
        print!("{}", analysis.first_sets.display(&grammar));
        println!();
        println!("#### FOLLOW sets");
        print!("{}", analysis.follow_sets.display(&grammar));
        println!();
    }

    if args.items {
        println!("#### LR(0) item sets");
        print!("{}", analysis.automaton.display(&grammar));
        println!();
    }

    if let Some(dot_file) = &args.dot {
        fs::write(dot_file, dot::to_dot(&grammar, &analysis.automaton)).with_context(|| {
            anyhow::anyhow!("failed to write the automaton to {}", dot_file.display())
        })?;
        tracing::info!("wrote the automaton to {}", dot_file.display());
    }

    if args.table {
        match analysis.table() {
            Ok(table) => {
                println!("#### SLR(1) table");
                print!("{}", table.display(&grammar));
            }
            Err(conflict) => {
                println!("#### conflict");
                println!("{}", conflict);
                if let Some(state) = analysis.automaton.state(conflict.state) {
                    println!("#### State {}", conflict.state);
                    print!("{}", state.display(&grammar));
                }
                anyhow::bail!("the grammar is not SLR(1)");
            }
        }
    }

    Ok(())
}
