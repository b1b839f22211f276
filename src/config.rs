use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use crate::errors::CliError;

/// Configuration for the tokenlock CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cluster: String,
    pub wallet_path: Option<PathBuf>,
    pub rpc_url: String,
    /// Time-lock vault program; unset until `config set-program`
    #[serde(default)]
    pub program_id: Option<String>,
    /// Mint of the lockable token
    #[serde(default)]
    pub mint: Option<String>,
    /// Clock tick for `watch`, in seconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Ask before signing each transaction
    #[serde(default = "default_confirm")]
    pub confirm_transactions: bool,
    /// Fallback log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_tick_interval() -> u64 {
    1
}

fn default_confirm() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: "devnet".to_string(),
            wallet_path: None,
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: None,
            mint: None,
            tick_interval_secs: default_tick_interval(),
            confirm_transactions: default_confirm(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
        Ok(config_dir.join("tokenlock").join("config.toml"))
    }

    /// Load config from the default location, creating it on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            return Err(CliError::ConfigError("tick_interval_secs cannot be 0".to_string()).into());
        }
        // Unset ids are allowed here; using them is not
        if self.program_id.is_some() {
            self.program_id()?;
        }
        if self.mint.is_some() {
            self.mint()?;
        }
        Ok(())
    }

    /// Vault program id; errors while it is unset
    pub fn program_id(&self) -> Result<Pubkey> {
        parse_id("program_id", self.program_id.as_deref())
    }

    /// Lockable token mint; errors while it is unset
    pub fn mint(&self) -> Result<Pubkey> {
        parse_id("mint", self.mint.as_deref())
    }

    /// Point at a vault deployment (does not persist)
    pub fn set_program(&mut self, program_id: &str, mint: &str) -> Result<()> {
        parse_id("program_id", Some(program_id))?;
        parse_id("mint", Some(mint))?;

        self.program_id = Some(program_id.to_string());
        self.mint = Some(mint.to_string());
        Ok(())
    }

    /// Update cluster configuration (does not persist)
    pub fn set_cluster(&mut self, cluster: &str) -> Result<()> {
        let rpc_url = match cluster {
            "devnet" => "https://api.devnet.solana.com",
            "mainnet-beta" => "https://api.mainnet-beta.solana.com",
            "localnet" => "http://127.0.0.1:8899",
            _ => return Err(CliError::InvalidCluster(cluster.to_string()).into()),
        };

        self.cluster = cluster.to_string();
        self.rpc_url = rpc_url.to_string();

        Ok(())
    }

    /// Explorer link for a transaction signature
    pub fn explorer_url(&self, signature: &str) -> String {
        match self.cluster.as_str() {
            "mainnet-beta" => format!("https://explorer.solana.com/tx/{}", signature),
            "localnet" => format!(
                "https://explorer.solana.com/tx/{}?cluster=custom&customUrl={}",
                signature, self.rpc_url
            ),
            cluster => format!("https://explorer.solana.com/tx/{}?cluster={}", signature, cluster),
        }
    }
}

fn parse_id(field: &str, value: Option<&str>) -> Result<Pubkey> {
    let value = value.ok_or_else(|| {
        CliError::ConfigError(format!(
            "{} is not set. Run 'tokenlock config set-program' first",
            field
        ))
    })?;
    Pubkey::from_str(value)
        .map_err(|_| CliError::ConfigError(format!("invalid {}: {}", field, value)).into())
}

/// Set cluster configuration
pub fn set_cluster(cluster: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_cluster(cluster)?;
    config.save()?;

    println!("{}", format!("✓ Cluster set to: {}", cluster).green());
    println!("  RPC URL: {}", config.rpc_url);

    Ok(())
}

/// Set the vault program and token mint
pub fn set_program(program_id: &str, mint: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_program(program_id, mint)?;
    config.save()?;

    println!("{}", "✓ Vault program configured".green());
    println!("  Program: {}", program_id);
    println!("  Mint:    {}", mint);

    Ok(())
}

/// Show current configuration
pub fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Tokenlock Configuration".bright_cyan().bold());
    println!("  Cluster:      {}", config.cluster.bright_yellow());
    println!("  RPC URL:      {}", config.rpc_url);
    println!("  Program:      {}", config.program_id.as_deref().unwrap_or("Not set"));
    println!("  Mint:         {}", config.mint.as_deref().unwrap_or("Not set"));
    println!("  Tick:         {}s", config.tick_interval_secs);
    println!("  Confirm:      {}", if config.confirm_transactions { "yes" } else { "no" });
    println!("  Log level:    {}", config.log_level);
    println!("  Wallet Path:  {}",
        config.wallet_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not set".to_string())
    );

    Ok(())
}
