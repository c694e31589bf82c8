use std::io;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use matex_algebra::SymbolicEngine;
use matex_core::Session;
use matex_syntax::MacroTable;
use matexd::{load_table, serve};

#[derive(Parser)]
#[command(name = "matexd")]
#[command(about = "matex matrix daemon over stdio", long_about = None)]
struct Cli {
    /// File with custom LaTeX commands (\newcommand definitions)
    #[arg(value_name = "FILE")]
    commands: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let table = match &cli.commands {
        Some(path) => load_table(path),
        None => MacroTable::new(),
    };
    info!("loaded {} macro definitions", table.len());

    let session = Session::new(table, SymbolicEngine::new());
    serve(io::stdin().lock(), io::stdout().lock(), &session)?;
    Ok(())
}
