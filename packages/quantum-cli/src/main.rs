//! Quantum Bridge CLI
//!
//! Terminal front end over `quantum-core`: moves tokens between the
//! supported testnets, claims faucet tokens and drives the lending pool.
//!
//! # Two-Phase Transactions
//!
//! `bridge` and `lend supply|repay` run the same flow as the web client:
//! 1. Approve the spender (bridge or pool) for the amount
//! 2. Wait for the approval receipt
//! 3. Submit the deposit or pool call
//! 4. Refresh balances once the receipt confirms
//!
//! `lend borrow|withdraw` and native-asset transfers skip step 1.

mod commands;
mod config;

use alloy::primitives::Address;
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use quantum_core::{LendingAction, SupportedChain};
use tracing::{debug, info};

use commands::App;
use config::Config;

#[derive(Parser)]
#[command(name = "quantum")]
#[command(about = "Quantum Bridge client: cross-chain transfers, faucet and lending", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported chains and their endpoints
    Chains,

    /// List bridgeable tokens
    Tokens {
        /// Only tokens on this chain (e.g. base-sepolia or BASE)
        #[arg(long)]
        chain: Option<SupportedChain>,
    },

    /// Show a token balance
    Balance {
        /// Token id, e.g. USDT-ETH
        token: String,

        /// Owner address (defaults to the connected wallet)
        #[arg(long)]
        owner: Option<Address>,
    },

    /// Show the current gas price of a chain
    Gas {
        chain: SupportedChain,
    },

    /// Quote the relay fee for a transfer without sending anything
    Quote(TransferArgs),

    /// Approve and bridge tokens to another chain
    Bridge(TransferArgs),

    /// Mint test tokens
    Faucet {
        /// Token id, e.g. USDT-BASE
        token: String,

        /// Recipient address (defaults to the connected wallet)
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Supply, borrow, repay or withdraw on the lending pool
    Lend {
        action: LendCommand,

        /// Token id, e.g. USDT-BASE
        token: String,

        /// Amount (ignored for repay, which always covers the whole debt)
        amount: Option<String>,
    },

    /// Show lending pool totals and the whitelisted markets
    Market {
        #[arg(default_value = "USDT-BASE")]
        token: String,
    },

    /// Show the connected wallet's lending position
    Position {
        #[arg(default_value = "USDT-BASE")]
        token: String,
    },
}

#[derive(clap::Args)]
struct TransferArgs {
    /// Source token id, e.g. USDT-ETH
    #[arg(long)]
    from: String,

    /// Destination token id, e.g. USDT-ARB
    #[arg(long)]
    to: String,

    /// Human-readable amount
    #[arg(long)]
    amount: String,

    /// Recipient on the destination chain (defaults to the connected wallet)
    #[arg(long)]
    recipient: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LendCommand {
    Supply,
    Borrow,
    Repay,
    Withdraw,
}

impl From<LendCommand> for LendingAction {
    fn from(cmd: LendCommand) -> Self {
        match cmd {
            LendCommand::Supply => LendingAction::Supply,
            LendCommand::Borrow => LendingAction::Borrow,
            LendCommand::Repay => LendingAction::Repay,
            LendCommand::Withdraw => LendingAction::Withdraw,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    let config = Config::load()?;
    debug!(
        wallet = config.wallet_private_key.is_some(),
        pool = ?config.lending_pool_address,
        "Configuration loaded"
    );
    let app = App::new(config, cli.json)?;

    tokio::select! {
        result = run(&app, cli.command) => report(result),
        _ = wait_for_shutdown_signal() => {
            info!("Interrupted, pending transactions may still confirm on chain");
            Ok(())
        }
    }
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Chains => app.chains(),
        Commands::Tokens { chain } => app.tokens(chain),
        Commands::Balance { token, owner } => app.balance(&token, owner).await,
        Commands::Gas { chain } => app.gas(chain).await,
        Commands::Quote(args) => {
            app.quote(&args.from, &args.to, &args.amount, args.recipient)
                .await
        }
        Commands::Bridge(args) => {
            app.bridge(&args.from, &args.to, &args.amount, args.recipient)
                .await
        }
        Commands::Faucet { token, recipient } => app.faucet(&token, recipient).await,
        Commands::Lend {
            action,
            token,
            amount,
        } => app.lend(action.into(), &token, amount).await,
        Commands::Market { token } => app.market(&token).await,
        Commands::Position { token } => app.position(&token).await,
    }
}

/// Show rejected input as a plain message; anything else gets the full report
fn report(result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        if let Some(core) = e.downcast_ref::<quantum_core::Error>() {
            if core.is_validation() {
                eprintln!("error: {}", core);
                std::process::exit(2);
            }
        }
    }
    result
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "debug"
    } else {
        "warn,quantum_core=info,quantum=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
