use anyhow::Result;
use colored::Colorize;
use tokenlock::ActionName;

/// Lock the entire transferable wallet balance
pub async fn execute(auto_approve: bool) -> Result<()> {
    println!("{}", "Locking tokens...".bright_cyan());
    println!("{}", "  (locks entire balance; move tokens you want to keep liquid to another wallet first)".dimmed());

    super::run_action(ActionName::Lock, auto_approve).await
}
