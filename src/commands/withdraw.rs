use anyhow::Result;
use colored::Colorize;
use tokenlock::ActionName;

/// Withdraw unlocked tokens once the waiting period is over
pub async fn execute(auto_approve: bool) -> Result<()> {
    println!("{}", "Withdrawing unlocked tokens...".bright_cyan());

    super::run_action(ActionName::Withdraw, auto_approve).await
}
