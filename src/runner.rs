use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::checker::SlotChecker;
use crate::error::{AppError, Result};
use crate::line::LineClient;
use crate::slots::Slot;

/// Repeats poll cycles forever: check, notify on findings, sleep. Failed
/// cycles back off quadratically while failures stay consecutive; a
/// successful cycle resets the counter and waits the regular interval.
pub struct Runner {
    checker: Arc<SlotChecker>,
    notifier: LineClient,
    interval: Duration,
    backoff_cap: Duration,
}

impl Runner {
    pub fn new(
        checker: SlotChecker,
        notifier: LineClient,
        interval: Duration,
        backoff_cap: Duration,
    ) -> Self {
        Runner {
            checker: Arc::new(checker),
            notifier,
            interval,
            backoff_cap,
        }
    }

    pub async fn run(&self) {
        let mut consecutive_errors: u32 = 0;

        loop {
            match self.contained_cycle().await {
                Err(e) => {
                    consecutive_errors += 1;
                    error!("Error during check: {}", e);
                    let backoff = quadratic_backoff(consecutive_errors, self.backoff_cap);
                    warn!(
                        "Waiting {} seconds before retry (consecutive errors: {})",
                        backoff.as_secs(),
                        consecutive_errors
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(slots) => {
                    consecutive_errors = 0;
                    self.notify(&slots).await;

                    let next_check =
                        Local::now() + chrono::Duration::seconds(self.interval.as_secs() as i64);
                    info!(
                        "Check complete. Next check in {} minutes at {}",
                        self.interval.as_secs() / 60,
                        next_check.format("%H:%M:%S")
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }

    /// Single check cycle with notification, for one-shot runs.
    pub async fn run_once(&self) -> Result<Vec<Slot>> {
        let slots = self.contained_cycle().await?;
        self.notify(&slots).await;
        Ok(slots)
    }

    async fn notify(&self, slots: &[Slot]) {
        if slots.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.notify_available_slots(slots).await {
            error!("Error sending notification: {}", e);
        }
    }

    /// Runs the cycle on its own task so a panic unwinds into a JoinError
    /// instead of taking the process down. The panic counts as a failed
    /// cycle and goes through the same backoff as any other error.
    async fn contained_cycle(&self) -> Result<Vec<Slot>> {
        let checker = Arc::clone(&self.checker);
        let handle = tokio::spawn(async move { checker.check_availability().await });
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(join_error(e)),
        }
    }
}

fn join_error(e: JoinError) -> AppError {
    if e.is_panic() {
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        AppError::CyclePanic(message)
    } else {
        AppError::Browser(format!("Check task failed: {}", e))
    }
}

/// Backoff after `consecutive_errors` straight failures: errors squared, in
/// seconds, capped.
fn quadratic_backoff(consecutive_errors: u32, cap: Duration) -> Duration {
    let errors = u64::from(consecutive_errors);
    Duration::from_secs(errors.saturating_mul(errors)).min(cap)
}
