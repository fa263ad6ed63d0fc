use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use yoyaku_watcher::checker::SlotChecker;
use yoyaku_watcher::config::AppConfig;
use yoyaku_watcher::line::LineClient;
use yoyaku_watcher::logging;
use yoyaku_watcher::runner::Runner;

#[derive(Parser, Debug)]
#[command(name = "yoyaku-watcher", version)]
#[command(about = "Watches the licensing booking site for open reservation slots")]
struct Cli {
    /// Watch the test target instead of the real one
    #[arg(long)]
    test: bool,

    /// Send a sample notification and exit
    #[arg(long)]
    notify_test: bool,

    /// Log found slots without sending notifications
    #[arg(long)]
    no_notify: bool,

    /// Run a single check cycle and exit
    #[arg(long)]
    once: bool,

    /// Directory for daily log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init(&cli.log_dir)?;

    info!("=== Starting new session ===");

    let config = AppConfig::from_env()?;

    let mut no_notify = cli.no_notify;
    if no_notify {
        info!("Notifications disabled (--no-notify flag is set)");
    }

    match (&config.line.channel_token, &config.line.user_id) {
        (Some(token), Some(user_id)) => {
            info!(
                "LINE credentials found (token length: {}, user ID length: {})",
                token.len(),
                user_id.len()
            );
        }
        (token, user_id) => {
            warn!("LINE credentials not set properly:");
            if token.is_none() {
                warn!("  - LINE_CHANNEL_TOKEN is missing");
            }
            if user_id.is_none() {
                warn!("  - LINE_USER_ID is missing");
            }
            warn!("Notifications will be disabled");
            no_notify = true;
        }
    }

    let target = config.target(cli.test).clone();
    if cli.test {
        info!(
            "Running in TEST mode - Looking for slots at {} for {}",
            target.location, target.category
        );
    } else {
        info!(
            "Running in REAL mode - Looking for slots at {} for {}",
            target.location, target.category
        );
    }

    let mut notifier = LineClient::new(
        config.line.clone(),
        config.site.booking_url.clone(),
        no_notify,
    );

    // Only testing the notification path
    if cli.notify_test {
        if let Err(e) = notifier.send_test_message(&target).await {
            error!("Notification test failed: {}", e);
        }
        return Ok(());
    }

    info!("Watcher started - press Ctrl+C to stop");

    let checker = SlotChecker::new(
        config.site.clone(),
        config.browser.clone(),
        config.poll.clone(),
        target.clone(),
    );

    // Startup probe: a failing notification channel disables notifications
    // for the rest of the session
    if !notifier.is_disabled() {
        if let Err(e) = notifier.send_test_message(&target).await {
            warn!("Initial test notification failed: {}", e);
            warn!("Notifications will be disabled");
            notifier = LineClient::new(config.line.clone(), config.site.booking_url.clone(), true);
        } else {
            info!("Initial test notification sent successfully");
        }
    }

    let runner = Runner::new(
        checker,
        notifier,
        Duration::from_secs(config.poll.interval_secs),
        Duration::from_secs(config.poll.backoff_cap_secs),
    );

    if cli.once {
        runner.run_once().await?;
        return Ok(());
    }

    tokio::select! {
        _ = runner.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
