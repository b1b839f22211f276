use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokenlock::config::Config;
use tracing::debug;

use super::{open_session, parse_account, status};

/// Live view: ticks the session clock and re-renders every committed change
pub async fn execute(other: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let other = parse_account(other)?;
    let session = open_session(&config, other, false).await?;
    let mut updates = session.subscribe();

    let ticker = tokio::spawn({
        let session = Arc::clone(&session);
        let period = Duration::from_secs(config.tick_interval_secs);
        async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                session.tick(Utc::now()).await;
            }
        }
    });

    redraw(&session.view());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                redraw(&view);
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, tearing down session");
                break;
            }
        }
    }

    session.on_teardown();
    ticker.abort();

    println!("{}", "Stopped watching.".dimmed());
    Ok(())
}

fn redraw(view: &tokenlock::SessionView) {
    // Clear screen and move the cursor home
    print!("\x1B[2J\x1B[H");
    status::render(view);
    println!("{}", "Press Ctrl-C to exit".dimmed());
}
