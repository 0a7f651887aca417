//! `turmite` — run, replay and inspect turmite simulations.
//!
//! **Usage:**
//! ```text
//! turmite run [--config <file>] [--program <share string>]
//!             [--iterations <n> [--session <dir> --id <name>] | --frames <n>]
//! turmite replay <session-dir>
//! turmite inspect --program <share string>
//! ```
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use turmite_engine::hashing::canonical_hash;
use turmite_engine::{Engine, GenerationOptions, MovementPolicy, TransitionTable};
use turmite_runtime::driver::Driver;
use turmite_runtime::drift::verify_determinism;
use turmite_runtime::{RunConfig, RuntimeError, RuntimeResult, Session};

#[derive(Parser)]
#[command(name = "turmite", about = "Specialized turmite simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run a table for a number of iterations and print the result.
    Run(RunArgs),
    /// Rebuild a session from its command log and check determinism.
    Replay {
        /// Session directory (contains commands.log).
        dir: PathBuf,
    },
    /// Print the specialized dispatch table for a program.
    Inspect(TableArgs),
}

#[derive(Args)]
struct TableArgs {
    /// Share string; a random table is generated when absent.
    #[arg(long)]
    program: Option<String>,
    /// JSON run configuration; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    states: Option<usize>,
    #[arg(long)]
    symbols: Option<usize>,
    /// wrap, bounce, clamp or recenter.
    #[arg(long)]
    policy: Option<MovementPolicy>,
    /// Random tables never write symbol 0.
    #[arg(long)]
    ink_bias: bool,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    table: TableArgs,
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,
    /// Pace the run in driver frames instead of a fixed iteration count.
    /// Frame length comes from the config's speed and frame budget.
    #[arg(long, conflicts_with_all = ["iterations", "session"])]
    frames: Option<u32>,
    /// Persist the run as a session under this directory.
    #[arg(long, requires = "id")]
    session: Option<PathBuf>,
    /// Session name inside `--session`.
    #[arg(long)]
    id: Option<String>,
}

impl TableArgs {
    fn resolve_config(&self) -> RuntimeResult<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.states {
            cfg.states = v;
        }
        if let Some(v) = self.symbols {
            cfg.symbols = v;
        }
        if let Some(v) = self.policy {
            cfg.policy = v;
        }
        if self.ink_bias {
            cfg.ink_bias = true;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        Ok(cfg)
    }

    fn build_table(&self, cfg: &RunConfig) -> RuntimeResult<TransitionTable> {
        if let Some(program) = &self.program {
            return Ok(TransitionTable::deserialize(program, cfg.width, cfg.height)?);
        }
        let options = GenerationOptions {
            ink_bias: cfg.ink_bias,
        };
        let table = match cfg.seed {
            Some(seed) => TransitionTable::random_seeded(cfg.states, cfg.symbols, options, seed)?,
            None => TransitionTable::random(cfg.states, cfg.symbols, options, &mut rand::rng())?,
        };
        Ok(table)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Cmd::Run(args) => run(args),
        Cmd::Replay { dir } => replay(&dir),
        Cmd::Inspect(args) => inspect(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &RuntimeError) -> u8 {
    match err {
        RuntimeError::Engine(_) => 2,
        RuntimeError::Io(_) => 3,
        RuntimeError::Determinism { .. } => 4,
        _ => 1,
    }
}

fn run(args: RunArgs) -> RuntimeResult<()> {
    let cfg = args.table.resolve_config()?;
    let table = args.table.build_table(&cfg)?;
    info!(program = %table, "table ready");

    let engine = match (&args.session, &args.id) {
        (Some(base), Some(id)) => {
            let mut session = Session::create(
                base,
                id,
                table,
                cfg.width,
                cfg.height,
                cfg.policy,
                cfg.snapshot_interval,
            )?;
            session.set_max_batch(cfg.max_batch);
            session.run(args.iterations)?;
            session.engine().clone()
        }
        _ => {
            let mut engine = Engine::new(table, cfg.width, cfg.height, cfg.policy)?;
            match args.frames {
                Some(frames) => {
                    let driver = Driver::from_config(&cfg);
                    for _ in 0..frames {
                        driver.run_frame(&mut engine)?;
                    }
                }
                None => advance_in_batches(&mut engine, args.iterations, cfg.max_batch)?,
            }
            engine
        }
    };

    print_summary(&engine);
    Ok(())
}

fn advance_in_batches(engine: &mut Engine, total: u64, max_batch: u64) -> RuntimeResult<()> {
    let max_batch = max_batch.max(1);
    let mut remaining = total;
    while remaining > 0 {
        let chunk = remaining.min(max_batch);
        engine.advance(chunk)?;
        remaining -= chunk;
    }
    Ok(())
}

fn replay(dir: &Path) -> RuntimeResult<()> {
    let base = dir.parent().unwrap_or_else(|| Path::new("."));
    let id = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| RuntimeError::EmptySession(dir.display().to_string()))?;

    let mut session = Session::open(base, &id, 0)?;
    let resumed = session.current_hash();
    let replayed = session.replay_full()?;
    if resumed != replayed {
        return Err(RuntimeError::Determinism {
            first: resumed,
            second: replayed,
        });
    }
    verify_determinism(&session.load_commands()?)?;

    println!("commands   {}", session.current_sequence());
    print_summary(session.engine());
    Ok(())
}

fn inspect(args: TableArgs) -> RuntimeResult<()> {
    let cfg = args.resolve_config()?;
    let table = args.build_table(&cfg)?;
    let mut engine = Engine::new(table, cfg.width, cfg.height, cfg.policy)?;
    println!("program    {}", engine.share_string());
    print!("{}", engine.specialize()?);
    Ok(())
}

fn print_summary(engine: &Engine) {
    let head = engine.head();
    let dims = engine.dims();
    println!("program    {}", engine.share_string());
    println!("grid       {}x{} ({})", dims.width(), dims.height(), engine.policy());
    println!("head       ({}, {}) state {}", head.x, head.y, head.state);
    println!("iterations {}", engine.iteration_count());
    println!("inked      {}", engine.grid().inked());
    println!("hash       {}", canonical_hash(engine));
}
