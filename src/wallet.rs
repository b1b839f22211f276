use anyhow::{Context, Result};
use colored::Colorize;
use solana_sdk::signature::{Keypair, Signer};
use std::path::{Path, PathBuf};
use crate::config::Config;
use crate::errors::CliError;

/// Create a new wallet
pub async fn create() -> Result<()> {
    let keypair = Keypair::new();
    let wallet_path = get_default_wallet_path()?;

    write_keypair(&keypair, &wallet_path)?;

    println!("{}", "✓ New wallet created successfully!".green());
    println!("  Address: {}", keypair.pubkey().to_string().bright_yellow());
    println!("  Saved to: {}", wallet_path.display());
    println!();
    println!("{}", "⚠ IMPORTANT: Back up your wallet file!".yellow().bold());

    let mut config = Config::load()?;
    config.wallet_path = Some(wallet_path);
    config.save()?;

    Ok(())
}

/// Import wallet from keypair file
pub async fn import(keypair_path: &str) -> Result<()> {
    let path = Path::new(keypair_path);

    if !path.exists() {
        return Err(anyhow::anyhow!("Keypair file not found: {}", keypair_path));
    }

    let keypair = read_keypair(path)?;

    println!("{}", "✓ Wallet imported successfully!".green());
    println!("  Address: {}", keypair.pubkey().to_string().bright_yellow());

    let mut config = Config::load()?;
    config.wallet_path = Some(path.to_path_buf());
    config.save()?;

    Ok(())
}

/// Show wallet address
pub async fn show_address() -> Result<()> {
    let config = Config::load()?;
    let keypair = load_wallet(&config)?;

    println!("{}", "Wallet Address:".bright_cyan());
    println!("  {}", keypair.pubkey().to_string().bright_yellow());

    Ok(())
}

/// Load wallet from the configured path
pub fn load_wallet(config: &Config) -> Result<Keypair> {
    let wallet_path = config.wallet_path
        .as_ref()
        .ok_or(CliError::WalletNotFound)?;

    if !wallet_path.exists() {
        return Err(CliError::WalletNotFound.into());
    }

    read_keypair(wallet_path)
}

/// Read a keypair stored as a JSON byte array (solana-keygen format)
pub fn read_keypair(path: &Path) -> Result<Keypair> {
    let contents = std::fs::read_to_string(path)?;
    let bytes: Vec<u8> = serde_json::from_str(&contents)
        .context("Invalid keypair file format")?;

    Keypair::try_from(bytes.as_slice())
        .context("Failed to parse keypair")
}

pub fn write_keypair(keypair: &Keypair, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(&keypair.to_bytes().to_vec())?;
    std::fs::write(path, json)?;

    Ok(())
}

/// Get default wallet path
fn get_default_wallet_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
    Ok(config_dir.join("tokenlock").join("wallet.json"))
}
