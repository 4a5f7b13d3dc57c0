use anyhow::Result;
use clap::{Parser, Subcommand};
use ledger_core::{
    constants::{MAX_MINING_ATTEMPTS, POW_TARGET_DIFFICULTY},
    pow::{MinerConfig, TargetRule},
    Chain,
};
use std::io;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

mod demo;
mod render;
mod session;

use render::Format;
use session::Session;

#[derive(Parser, Debug)]
#[command(name = "ledger-cli", version)]
#[command(about = "Interactive proof-of-work ledger simulation")]
struct Cli {
    /// Number of leading hex characters a mined hash must match
    #[arg(long, global = true, default_value_t = POW_TARGET_DIFFICULTY)]
    difficulty: usize,

    /// Give up on a block after this many nonces
    #[arg(long, global = true, default_value_t = MAX_MINING_ATTEMPTS)]
    max_attempts: u64,

    /// Threads searching nonces in parallel (1 = sequential)
    #[arg(long, global = true, default_value_t = 1)]
    workers: usize,

    /// Compare the hash prefix against the literal "00" whatever the difficulty
    #[arg(long, global = true)]
    legacy_prefix: bool,

    /// How the chain is displayed
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Menu-driven session on stdin/stdout (default)
    Interactive,
    /// Build a two-block chain, tamper with the genesis block and verify
    Demo,
}

impl Cli {
    fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            difficulty: self.difficulty,
            rule: if self.legacy_prefix {
                TargetRule::LegacyFixedPrefix
            } else {
                TargetRule::LeadingZeros
            },
            max_attempts: self.max_attempts,
            workers: self.workers,
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.miner_config();
    debug!(?config, "starting ledger");
    let chain = Chain::new(config)?;

    let stdout = io::stdout();
    match cli.cmd.unwrap_or(Command::Interactive) {
        Command::Interactive => {
            let stdin = io::stdin();
            Session::new(chain, stdin.lock(), stdout.lock(), cli.format).run()
        }
        Command::Demo => demo::run(chain, &mut stdout.lock(), cli.format),
    }
}
