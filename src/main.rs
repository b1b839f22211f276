mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokenlock::config::{self, Config};
use tokenlock::wallet;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tokenlock")]
#[command(author = "Tokenlock Team")]
#[command(version = "0.1.0")]
#[command(about = "Lock, unlock and withdraw time-locked tokens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balances, waiting period and available actions
    Status {
        /// Also show balances of another account
        #[arg(long)]
        other: Option<String>,
    },

    /// Lock the entire transferable wallet balance
    Lock {
        /// Sign without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Unlock all locked tokens (starts the waiting period)
    Unlock {
        /// Sign without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Withdraw unlocked tokens after the waiting period
    Withdraw {
        /// Sign without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Live view that follows the clock until Ctrl-C
    Watch {
        /// Also follow another account
        #[arg(long)]
        other: Option<String>,
    },

    /// Wallet management commands
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new wallet
    Create,

    /// Import wallet from keypair file
    Import {
        /// Path to keypair JSON file
        #[arg(long)]
        keypair: String,
    },

    /// Show wallet address
    Address,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set Solana cluster (devnet/mainnet-beta/localnet)
    SetCluster {
        /// Cluster name
        cluster: String,
    },

    /// Point at a vault program and token mint
    SetProgram {
        /// Vault program id
        #[arg(long)]
        program_id: String,

        /// Lockable token mint
        #[arg(long)]
        mint: String,
    },

    /// Show current configuration
    Show,
}

fn init_logging() {
    let fallback = Config::load()
        .map(|config| config.log_level)
        .unwrap_or_else(|_| "warn".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    println!("{}", "╔════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║        TOKENLOCK - Time-Locked Tokens       ║".bright_cyan());
    println!("{}", "╚════════════════════════════════════════════╝".bright_cyan());
    println!();

    match cli.command {
        Commands::Status { other } => {
            commands::status::execute(other).await?;
        }
        Commands::Lock { yes } => {
            commands::lock::execute(yes).await?;
        }
        Commands::Unlock { yes } => {
            commands::unlock::execute(yes).await?;
        }
        Commands::Withdraw { yes } => {
            commands::withdraw::execute(yes).await?;
        }
        Commands::Watch { other } => {
            commands::watch::execute(other).await?;
        }
        Commands::Wallet { action } => match action {
            WalletCommands::Create => wallet::create().await?,
            WalletCommands::Import { keypair } => wallet::import(&keypair).await?,
            WalletCommands::Address => wallet::show_address().await?,
        },
        Commands::Config { action } => match action {
            ConfigCommands::SetCluster { cluster } => config::set_cluster(&cluster)?,
            ConfigCommands::SetProgram { program_id, mint } => {
                config::set_program(&program_id, &mint)?
            }
            ConfigCommands::Show => config::show()?,
        },
    }

    Ok(())
}
