//! Solana binding of the `LockApi` capability.
//!
//! Talks to a time-lock vault program over JSON-RPC. Position accounts are
//! PDAs seeded with `["position", owner]`; the token vault is seeded with
//! `["vault", mint]`. Instructions use Anchor discriminators.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;
use tracing::debug;

use crate::api::{LockApi, Receipt, TxContext};
use crate::balances::{Amount, BalanceSnapshot};
use crate::config::Config;
use crate::errors::{CallError, CallErrorKind};

pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWQtvvPNmw9ZVQ5DA";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

const POSITION_SEED: &[u8] = b"position";
const VAULT_SEED: &[u8] = b"vault";
const POSITION_ACCOUNT_NAME: &str = "LockPosition";

// discriminator + owner + locked + unlocking + unlocked + unlock_matures_at
const POSITION_LEN: usize = 8 + 32 + 8 + 8 + 8 + 8;
// mint + owner + amount, the rest of the SPL token layout is ignored
const TOKEN_ACCOUNT_MIN_LEN: usize = 32 + 32 + 8;

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{}:{}", namespace, name);
    let hash = Sha256::digest(preimage.as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

/// Addresses and instruction builders for the vault program.
#[derive(Debug, Clone)]
pub struct LockProgram {
    pub program_id: Pubkey,
    pub mint: Pubkey,
    token_program: Pubkey,
    associated_token_program: Pubkey,
}

impl LockProgram {
    pub fn new(program_id: Pubkey, mint: Pubkey) -> anyhow::Result<Self> {
        Ok(Self {
            program_id,
            mint,
            token_program: Pubkey::from_str(TOKEN_PROGRAM_ID)?,
            associated_token_program: Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID)?,
        })
    }

    pub fn position_address(&self, owner: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(&[POSITION_SEED, owner.as_ref()], &self.program_id).0
    }

    pub fn vault_address(&self) -> Pubkey {
        Pubkey::find_program_address(&[VAULT_SEED, self.mint.as_ref()], &self.program_id).0
    }

    /// The owner's associated token account for the mint.
    pub fn token_account_address(&self, owner: &Pubkey) -> Pubkey {
        Pubkey::find_program_address(
            &[owner.as_ref(), self.token_program.as_ref(), self.mint.as_ref()],
            &self.associated_token_program,
        )
        .0
    }

    pub fn lock_instruction(&self, owner: &Pubkey, amount: Amount) -> Instruction {
        let mut data = instruction_discriminator("lock_tokens").to_vec();
        data.extend_from_slice(&amount.to_le_bytes());

        Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(self.position_address(owner), false),
                AccountMeta::new(*owner, true),
                AccountMeta::new(self.token_account_address(owner), false),
                AccountMeta::new(self.vault_address(), false),
                AccountMeta::new_readonly(self.mint, false),
                AccountMeta::new_readonly(self.token_program, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
        )
    }

    pub fn unlock_instruction(&self, owner: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            self.program_id,
            &instruction_discriminator("unlock_tokens"),
            vec![
                AccountMeta::new(self.position_address(owner), false),
                AccountMeta::new_readonly(*owner, true),
            ],
        )
    }

    pub fn withdraw_instruction(&self, owner: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            self.program_id,
            &instruction_discriminator("withdraw_unlocked_tokens"),
            vec![
                AccountMeta::new(self.position_address(owner), false),
                AccountMeta::new(*owner, true),
                AccountMeta::new(self.token_account_address(owner), false),
                AccountMeta::new(self.vault_address(), false),
                AccountMeta::new_readonly(self.token_program, false),
            ],
        )
    }
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// Decode a position account into a snapshot.
pub fn decode_position(data: &[u8], owner: &Pubkey) -> Result<BalanceSnapshot, CallError> {
    if data.len() < POSITION_LEN {
        return Err(CallError::invalid_data(format!(
            "position account too short: {} bytes",
            data.len()
        )));
    }
    if data[..8] != account_discriminator(POSITION_ACCOUNT_NAME) {
        return Err(CallError::invalid_data("not a position account"));
    }
    if &data[8..40] != owner.as_ref() {
        return Err(CallError::invalid_data("position belongs to a different owner"));
    }

    let locked = read_u64(data, 40);
    let unlocking = read_u64(data, 48);
    let unlocked = read_u64(data, 56);
    let matures_at = read_u64(data, 64) as i64;

    let unlock_maturity = match matures_at {
        0 => None,
        secs if secs < 0 => {
            return Err(CallError::invalid_data(format!("negative maturity: {}", secs)));
        }
        secs => Some(
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CallError::invalid_data(format!("maturity out of range: {}", secs)))?,
        ),
    };

    Ok(BalanceSnapshot::known(locked, unlocking, unlocked, unlock_maturity))
}

/// Read the amount from an SPL token account.
pub fn decode_token_amount(data: &[u8], mint: &Pubkey) -> Result<Amount, CallError> {
    if data.len() < TOKEN_ACCOUNT_MIN_LEN {
        return Err(CallError::invalid_data(format!(
            "token account too short: {} bytes",
            data.len()
        )));
    }
    if &data[..32] != mint.as_ref() {
        return Err(CallError::invalid_data("token account holds a different mint"));
    }
    Ok(read_u64(data, 64))
}

/// Map an RPC client error onto a `CallError`.
pub fn classify_client_error(err: &ClientError) -> CallError {
    let message = err.to_string();
    match err.kind() {
        ClientErrorKind::TransactionError(_) => CallError::reverted(message),
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => CallError::network(message),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            CallError::from_rpc_code(*code, message)
        }
        ClientErrorKind::SerdeJson(_) => CallError::invalid_data(message),
        _ => CallError::new(CallErrorKind::Other, message),
    }
}

/// `LockApi` over a Solana RPC node, signing with a local keypair.
pub struct SolanaLockApi {
    rpc: RpcClient,
    program: LockProgram,
    payer: Keypair,
    /// Ask on stdin before signing
    confirm: bool,
}

impl SolanaLockApi {
    pub fn new(rpc_url: String, program: LockProgram, payer: Keypair, confirm: bool) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            program,
            payer,
            confirm,
        }
    }

    pub fn from_config(config: &Config, payer: Keypair) -> anyhow::Result<Self> {
        let program = LockProgram::new(config.program_id()?, config.mint()?)?;
        Ok(Self::new(
            config.rpc_url.clone(),
            program,
            payer,
            config.confirm_transactions,
        ))
    }

    /// Skip the signing prompt
    pub fn auto_approve(mut self) -> Self {
        self.confirm = false;
        self
    }

    pub fn owner(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn approve(&self, action: &str) -> Result<(), CallError> {
        if !self.confirm {
            return Ok(());
        }

        let prompt = format!("Sign {} transaction from {}? [y/N] ", action, self.owner());
        let approved = tokio::task::spawn_blocking(move || {
            use std::io::Write;
            print!("{}", prompt.bright_yellow());
            std::io::stdout().flush().ok();
            let mut answer = String::new();
            std::io::stdin().read_line(&mut answer).map(|_| answer)
        })
        .await
        .map_err(|e| CallError::new(CallErrorKind::Other, e.to_string()))?
        .map_err(|e| CallError::new(CallErrorKind::Other, e.to_string()))?;

        if matches!(approved.trim(), "y" | "Y" | "yes") {
            Ok(())
        } else {
            Err(CallError::user_rejected(format!("{} signature declined", action)))
        }
    }

    async fn send(&self, action: &str, ctx: TxContext, instruction: Instruction) -> Result<Receipt, CallError> {
        if ctx.from != self.owner() {
            return Err(CallError::new(
                CallErrorKind::Other,
                format!("cannot sign for {}: wallet is {}", ctx.from, self.owner()),
            ));
        }

        self.approve(action).await?;

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Sending {} transaction...", action));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = self.sign_and_send(instruction).await;
        spinner.finish_and_clear();

        let signature = result.map_err(|e| classify_client_error(&e))?;
        debug!(action, %signature, "Transaction confirmed");
        Ok(Receipt::new(signature.to_string()))
    }

    async fn sign_and_send(
        &self,
        instruction: Instruction,
    ) -> Result<solana_sdk::signature::Signature, ClientError> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&self.payer.pubkey()),
            &[&self.payer],
            blockhash,
        );
        self.rpc.send_and_confirm_transaction(&transaction).await
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, CallError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .map_err(|e| classify_client_error(&e))?;
        Ok(response.value.map(|account| account.data))
    }
}

#[async_trait]
impl LockApi for SolanaLockApi {
    async fn lock(&self, amount: Amount, ctx: TxContext) -> Result<Receipt, CallError> {
        let instruction = self.program.lock_instruction(&ctx.from, amount);
        self.send("lock", ctx, instruction).await
    }

    async fn unlock(&self, ctx: TxContext) -> Result<Receipt, CallError> {
        let instruction = self.program.unlock_instruction(&ctx.from);
        self.send("unlock", ctx, instruction).await
    }

    async fn withdraw_unlocked(&self, ctx: TxContext) -> Result<Receipt, CallError> {
        let instruction = self.program.withdraw_instruction(&ctx.from);
        self.send("withdraw", ctx, instruction).await
    }

    async fn fetch_balances(&self, account: Pubkey) -> Result<BalanceSnapshot, CallError> {
        let address = self.program.position_address(&account);
        match self.account_data(&address).await? {
            Some(data) => decode_position(&data, &account),
            // No position yet: nothing locked, nothing pending
            None => Ok(BalanceSnapshot::known(0, 0, 0, None)),
        }
    }

    async fn fetch_wallet_balance(&self, account: Pubkey) -> Result<Option<Amount>, CallError> {
        let address = self.program.token_account_address(&account);
        match self.account_data(&address).await? {
            Some(data) => decode_token_amount(&data, &self.program.mint).map(Some),
            None => Ok(Some(0)),
        }
    }
}
