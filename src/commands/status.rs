use anyhow::Result;
use colored::{ColoredString, Colorize};
use tokenlock::balances::{format_countdown, format_optional_tokens, BalanceSnapshot};
use tokenlock::config::Config;
use tokenlock::{FetchFailure, SessionView, Timestamp};

use super::{open_session, parse_account};

/// Execute status check
pub async fn execute(other: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let other = parse_account(other)?;
    let session = open_session(&config, other, false).await?;

    let view = session.view();
    session.on_teardown();

    println!();
    render(&view);

    Ok(())
}

/// Print balances, countdown and available actions for a view
pub fn render(view: &SessionView) {
    println!("{}", "═══════════════════════════════════════════════════".bright_cyan());
    println!("{}", "        Token Lock Status".bright_cyan().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_cyan());
    println!();

    for line in position_lines(view) {
        println!("{}", line);
    }

    println!();
    println!("{}", "═══ Actions ═══".bright_cyan());
    for line in action_lines(view) {
        println!("{}", line);
    }
    if view.controls().can_re_unlock {
        print_re_unlock_warning();
    }

    println!();
    println!("{}", "═══════════════════════════════════════════════════".bright_cyan());
    println!();
}

fn position_lines(view: &SessionView) -> Vec<String> {
    let mut lines = vec![
        "═══ Your Position ═══".bright_cyan().to_string(),
        format!("  Account:     {}", view.accounts.own.to_string().bright_yellow()),
    ];
    lines.extend(snapshot_lines(&view.balances.own, view.clock));
    lines.push(format!(
        "  Wallet:      {}",
        format_optional_tokens(view.wallet_balance).bright_white()
    ));
    lines.extend(fetch_error_line("balances", view.fetch_errors.own.as_ref()));
    lines.extend(fetch_error_line("wallet balance", view.fetch_errors.wallet.as_ref()));

    if let Some(other) = view.accounts.other {
        lines.push(String::new());
        lines.push("═══ Other Account ═══".bright_cyan().to_string());
        lines.push(format!("  Account:     {}", other.to_string().bright_yellow()));
        lines.extend(snapshot_lines(&view.balances.other, view.clock));
        lines.extend(fetch_error_line("balances", view.fetch_errors.other.as_ref()));
    }
    lines
}

fn action_lines(view: &SessionView) -> Vec<String> {
    let controls = view.controls();
    let mut lines = vec![
        format!("  Lock:        {}", availability(controls.can_lock)),
        format!("  Unlock:      {}", availability(controls.can_unlock)),
        format!("  Withdraw:    {}", availability(controls.can_withdraw)),
    ];

    if let Some(pending) = view.tx.name {
        lines.push(String::new());
        lines.push(format!("  {} {}", "⏳".yellow(), format!("{} transaction pending...", pending).yellow()));
    }
    if let Some(failure) = view.tx.user_facing_error() {
        lines.push(String::new());
        lines.push(format!("  {} {}", "❌".bright_red(), failure.to_string().bright_red()));
    }
    lines
}

fn snapshot_lines(snapshot: &BalanceSnapshot, now: Timestamp) -> Vec<String> {
    let matures = match (snapshot.unlock_maturity, snapshot.time_until_maturity(now)) {
        (Some(maturity), Some(remaining)) if remaining.num_seconds() > 0 => format!(
            "  Matures:     {} ({} remaining)",
            maturity.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed(),
            format_countdown(remaining).yellow()
        ),
        (Some(maturity), _) => format!(
            "  Matures:     {} ({})",
            maturity.format("%Y-%m-%d %H:%M:%S UTC").to_string().dimmed(),
            "Ready to withdraw".bright_green()
        ),
        _ => format!("  Matures:     {}", "None".dimmed()),
    };

    vec![
        format!("  Locked:      {}", format_optional_tokens(snapshot.locked).bright_green()),
        format!("  Unlocking:   {}", format_optional_tokens(snapshot.unlocking).yellow()),
        format!("  Unlocked:    {}", format_optional_tokens(snapshot.unlocked).bright_white()),
        matures,
    ]
}

fn fetch_error_line(what: &str, failure: Option<&FetchFailure>) -> Option<String> {
    failure.map(|failure| {
        format!(
            "  {} {}",
            "⚠".yellow(),
            format!("Could not read {}, showing last known: {}", what, failure.source).yellow()
        )
    })
}

fn availability(allowed: bool) -> ColoredString {
    if allowed {
        "Available".bright_green()
    } else {
        "Unavailable".dimmed()
    }
}

/// Warn that unlocking again restarts the waiting period
pub fn print_re_unlock_warning() {
    println!();
    println!("{}", "⚠ An unlock is already in progress.".yellow().bold());
    println!(
        "{}",
        "  Unlocking again resets the waiting period for every token that is still unlocking and not withdrawn."
            .yellow()
    );
}
