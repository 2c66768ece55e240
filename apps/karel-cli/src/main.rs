use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use karel_author::{Action, Session, SessionLimits};
use karel_common::PlaygroundId;
use karel_kernel::World;
use karel_persist::{DEFAULT_COLLECTION, FileStore, PlaygroundStore};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "karel-cli", about = "Manage and drive Karel playgrounds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding the playground store
    #[arg(long, default_value = "playgrounds")]
    store: PathBuf,

    /// Name of the playground collection inside the store
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Largest row count `new` and `resize` accept
    #[arg(long, default_value = "10", global = true)]
    max_rows: u32,

    /// Largest column count `new` and `resize` accept
    #[arg(long, default_value = "10", global = true)]
    max_cols: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List playgrounds sorted by name
    List,
    /// Create an empty playground
    New {
        name: String,
        #[arg(short, long, default_value = "5")]
        rows: u32,
        #[arg(short, long, default_value = "5")]
        cols: u32,
    },
    /// Rename a playground
    Rename { playground: String, name: String },
    /// Delete a playground and its world
    Delete { playground: String },
    /// Print a playground's dimensions, beepers, and obstacles
    Show { playground: String },
    /// Run actions against a playground, starting with Karel at home
    Run {
        playground: String,
        /// Actions such as `move`, `turn_left`, `tool:add_beeper`, `tap:2,3`, `resize:4x6`
        #[arg(required = true)]
        actions: Vec<String>,
        /// Do not save the world afterwards
        #[arg(long)]
        dry_run: bool,
    },
}

type Store = PlaygroundStore<FileStore>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let backend = FileStore::open(&cli.store)
        .with_context(|| format!("opening store at {}", cli.store.display()))?;
    let mut store = PlaygroundStore::open(backend, cli.collection.as_str())?;
    let limits = SessionLimits {
        max_rows: cli.max_rows,
        max_cols: cli.max_cols,
    };

    match cli.command {
        Commands::List => {
            if store.is_empty() {
                println!("no playgrounds in {:?}", store.collection());
            }
            for (id, name) in store.playgrounds() {
                println!("{id}  {name}");
            }
        }
        Commands::New { name, rows, cols } => {
            if !limits.allows(rows, cols) {
                bail!(
                    "{rows}x{cols} is outside the allowed 1..={} x 1..={}",
                    limits.max_rows,
                    limits.max_cols
                );
            }
            let world = World::new(rows, cols)?;
            let id = store.add_playground_with(&name, &world)?;
            println!("created {id} ({rows}x{cols})");
        }
        Commands::Rename { playground, name } => {
            let id = resolve(&store, &playground)?;
            store.set_name(id, &name)?;
            println!("renamed {id} to {:?}", store.name_for(id).unwrap_or_default());
        }
        Commands::Delete { playground } => {
            let id = resolve(&store, &playground)?;
            store.remove_playground(id)?;
            println!("deleted {id}");
        }
        Commands::Show { playground } => {
            let id = resolve(&store, &playground)?;
            let world = store.load_world(id)?;
            println!(
                "{} [{id}]: {}x{}, {} beepers, {} obstacles",
                store.name_for(id).unwrap_or_default(),
                world.num_rows(),
                world.num_cols(),
                world.beepers().len(),
                world.obstacles().len()
            );
            for (cell, count) in world.beeper_cells() {
                println!("  beepers  {cell} x{count}");
            }
            for cell in world.obstacle_cells() {
                println!("  obstacle {cell}");
            }
        }
        Commands::Run {
            playground,
            actions,
            dry_run,
        } => {
            let id = resolve(&store, &playground)?;
            let actions = actions
                .iter()
                .map(|a| a.parse::<Action>())
                .collect::<Result<Vec<_>, _>>()?;

            let mut session = Session::new(store.load_world(id)?, limits);
            if let Some(cell) = session.cleared_on_open() {
                println!("no free cell for Karel: removed the obstacle at {cell}");
            }
            println!(
                "Karel at {} facing {}",
                session.karel().cell,
                session.karel().heading
            );

            let mut failures = 0usize;
            for (step, action) in actions.into_iter().enumerate() {
                match session.apply(action) {
                    Ok(outcome) => println!("{:>3}: {outcome}", step + 1),
                    Err(e) => {
                        failures += 1;
                        println!("{:>3}: error: {e}", step + 1);
                    }
                }
            }
            println!(
                "Karel ends at {} facing {} ({failures} failed)",
                session.karel().cell,
                session.karel().heading
            );

            let changes = session.take_changes();
            if changes.is_empty() {
                println!("world unchanged");
            } else if dry_run {
                println!("{} world changes discarded (dry run)", changes.len());
            } else {
                store.save_world(id, session.world())?;
                info!(%id, changes = changes.len(), "playground saved");
                println!("saved {} world changes", changes.len());
            }
        }
    }

    Ok(())
}

/// Accept either a playground id or an exact display name.
fn resolve(store: &Store, key: &str) -> anyhow::Result<PlaygroundId> {
    if let Ok(uuid) = uuid::Uuid::parse_str(key) {
        let id = PlaygroundId(uuid);
        if store.contains(id) {
            debug!(%id, "playground resolved by id");
            return Ok(id);
        }
    }
    match store.find_by_name(key) {
        Some(id) => {
            debug!(%id, name = key, "playground resolved by name");
            Ok(id)
        }
        None => bail!("no playground named {key:?}"),
    }
}
