pub mod lock;
pub mod status;
pub mod unlock;
pub mod watch;
pub mod withdraw;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;

use tokenlock::balances::{format_countdown, format_tokens};
use tokenlock::config::Config;
use tokenlock::contracts::SolanaLockApi;
use tokenlock::errors::CliError;
use tokenlock::{wallet, ActionName, LockSession, SessionView};

pub type CliSession = Arc<LockSession<SolanaLockApi>>;

/// Parse an optional account argument
pub fn parse_account(account: Option<String>) -> Result<Option<Pubkey>> {
    account
        .map(|value| {
            Pubkey::from_str(&value).map_err(|_| anyhow::Error::from(CliError::InvalidAccount(value)))
        })
        .transpose()
}

/// Load the wallet, bind it to the configured program and run the first refresh
pub async fn open_session(config: &Config, other: Option<Pubkey>, auto_approve: bool) -> Result<CliSession> {
    let payer = wallet::load_wallet(config)?;
    let mut api = SolanaLockApi::from_config(config, payer)?;
    if auto_approve {
        api = api.auto_approve();
    }

    let own = api.owner();
    let session = LockSession::new(Arc::new(api), own, Utc::now());

    println!("{}", format!("Fetching balances from {}...", config.cluster).dimmed());
    match other {
        Some(_) => session.set_other_account(other).await,
        None => session.init().await,
    }

    Ok(session)
}

/// Why an action is currently disabled
pub fn unavailable_reason(action: ActionName, view: &SessionView) -> String {
    let own = &view.balances.own;

    if view.tx.is_pending() {
        return "another transaction is pending".to_string();
    }
    if own.is_unknown() {
        return "balances could not be fetched".to_string();
    }

    match action {
        ActionName::Lock => match view.wallet_balance {
            None => "wallet balance is unknown".to_string(),
            Some(_) => "wallet holds no transferable tokens".to_string(),
        },
        ActionName::Unlock => "no tokens are locked".to_string(),
        ActionName::Withdraw => {
            if own.unlocked.unwrap_or(0) == 0 {
                return "no unlocked tokens to withdraw".to_string();
            }
            match own.time_until_maturity(view.clock) {
                Some(remaining) => format!("waiting period ends in {}", format_countdown(remaining)),
                None => "unlock maturity is unknown".to_string(),
            }
        }
    }
}

/// Run one guarded action and report the outcome
pub async fn run_action(action: ActionName, auto_approve: bool) -> Result<()> {
    let config = Config::load()?;
    let session = open_session(&config, None, auto_approve).await?;
    let view = session.view();
    let controls = view.controls();

    let allowed = match action {
        ActionName::Lock => controls.can_lock,
        ActionName::Unlock => controls.can_unlock,
        ActionName::Withdraw => controls.can_withdraw,
    };
    if !allowed {
        let reason = unavailable_reason(action, &view);
        session.on_teardown();
        return Err(CliError::ActionUnavailable { action, reason }.into());
    }

    if action == ActionName::Lock {
        let amount = view.wallet_balance.unwrap_or(0);
        println!("  Amount:   {} tokens (entire wallet balance)", format_tokens(amount).bright_white());
    }
    if action == ActionName::Unlock && controls.can_re_unlock {
        status::print_re_unlock_warning();
    }

    let receipt = session.triggers().get(action).fire().await;
    let view = session.view();
    session.on_teardown();

    match receipt {
        Some(receipt) => {
            println!();
            println!("{}", format!("✅ {} confirmed!", capitalize(action)).bright_green());
            println!("  Transaction: {}", receipt.signature.bright_yellow());
            println!("  Explorer: {}", config.explorer_url(&receipt.signature).bright_blue());
            println!();
            status::render(&view);
            Ok(())
        }
        None => match view.tx.error {
            Some(failure) if failure.is_user_facing() => {
                println!();
                println!("{}", format!("❌ {} failed", capitalize(action)).bright_red());
                println!("  Error: {}", failure.call_error());
                Err(failure.into())
            }
            Some(_) => {
                println!("{}", "Transaction cancelled, nothing was sent".yellow());
                Ok(())
            }
            None => Err(CliError::TransactionPending.into()),
        },
    }
}

fn capitalize(action: ActionName) -> String {
    let name = action.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
