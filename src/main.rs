use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wthor::database::{text, Database, Game};
use wthor::othello::board::{Board, Oracle};
use wthor::zobrist::{Key, ZobristTable};

/// Reads WTHOR Othello archives, validates the recorded games and converts
/// them to a line-oriented text format.
#[derive(Parser, Debug)]
#[command(about, disable_version_flag = true)]
struct Cli {
    /// Print build information and exit.
    #[arg(long)]
    version: bool,
    /// Log every rejected record (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Converts WTHOR (.wtb) and text inputs into a text database. Games keep
    /// the order of the inputs.
    Convert {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file, compressed if the name ends with .gz. Games are
        /// written to stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Converts inputs into a single WTHOR archive.
    Export {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Prints the number of accepted games and rejected records.
    Stats {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Generates a Zobrist table and saves it.
    Zobrist {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 64)]
        positions: usize,
        #[arg(long, default_value_t = 2)]
        pieces: usize,
        /// Seed for reproducible tables.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Replays every game and prints the hash of its final position.
    Hash {
        /// Table produced by the zobrist command.
        #[arg(long)]
        table: PathBuf,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.version {
        wthor::print_binary_info();
        return Ok(());
    }
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    match command {
        Command::Convert { inputs, output } => {
            let database = load(&inputs)?;
            match output {
                Some(output) => database.save_as_text(&output)?,
                None => text::write(io::stdout().lock(), database.games())?,
            }
        },
        Command::Export { inputs, output } => {
            let database = load(&inputs)?;
            database.save_as_wthor(&output)?;
            info!(games = database.len(), "wrote {}", output.display());
        },
        Command::Stats { inputs } => {
            let database = load(&inputs)?;
            println!("games: {}", database.len());
            println!("inconsistencies: {}", database.inconsistencies());
        },
        Command::Zobrist {
            output,
            positions,
            pieces,
            seed,
        } => {
            let table = seed.map_or_else(
                || ZobristTable::random(positions, pieces),
                |seed| ZobristTable::seeded(positions, pieces, seed),
            );
            table.save(&output)?;
            info!("saved {positions}x{pieces} table to {}", output.display());
        },
        Command::Hash { table, inputs } => {
            let table = ZobristTable::load(&table, 64, 2)?;
            let database = load(&inputs)?;
            for (index, game) in database.games().iter().enumerate() {
                let key = final_position_hash(&table, game)
                    .with_context(|| format!("game {}", index + 1))?;
                println!("{key:016x}");
            }
        },
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Inputs are read in parallel, one database per file, and merged in command
/// line order.
fn load(inputs: &[PathBuf]) -> anyhow::Result<Database> {
    let parts = inputs
        .par_iter()
        .map(|path| read_input(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(parts
        .into_iter()
        .fold(Database::new(), |mut database, part| {
            database.merge(part);
            database
        }))
}

fn read_input(path: &Path) -> anyhow::Result<Database> {
    let mut database = Database::new();
    if is_wthor(path) {
        let _ = database.add_wthor_file(path)?;
    } else {
        let added = database.add_text_file(path)?;
        info!(games = added, "read {}", path.display());
    }
    Ok(database)
}

fn is_wthor(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("wtb"))
}

fn final_position_hash(table: &ZobristTable, game: &Game) -> anyhow::Result<Key> {
    let mut board = Board::starting();
    for played in game.moves() {
        board
            .flip(played.square(), played.player())
            .with_context(|| format!("replaying {played}"))?;
    }
    Ok(table.hash_board(&board))
}
