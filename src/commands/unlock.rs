use anyhow::Result;
use colored::Colorize;
use tokenlock::ActionName;

/// Start the waiting period for the entire locked amount
pub async fn execute(auto_approve: bool) -> Result<()> {
    println!("{}", "Unlocking tokens...".bright_cyan());
    println!("{}", "  (entire amount only; tokens become withdrawable after the waiting period)".dimmed());

    super::run_action(ActionName::Unlock, auto_approve).await
}
