use rand::Rng;
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::config::OutboxConfig;
use crate::coupons::CouponValidator;
use crate::notifications::NotificationDispatcher;
use crate::outbox::{OutboxError, OutboxRepository, OutboxTask, SideEffect};

const RETRY_BASE_DELAY_SECS: u64 = 2;
const RETRY_MAX_DELAY_SECS: u64 = 300;

/// Exponential backoff before the next attempt, without jitter
///
/// `attempts` is the number of attempts already made (1 after the first failure).
pub fn backoff_delay(attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let secs = (RETRY_BASE_DELAY_SECS * 2u64.pow(exponent)).min(RETRY_MAX_DELAY_SECS);
    Duration::from_secs(secs)
}

/// Add up to 25% random jitter so retries from one burst spread out
fn with_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = (delay.as_millis() / 4) as u64;
    let jitter = rand::thread_rng().gen_range(0..=max_jitter_ms);
    delay + Duration::from_millis(jitter)
}

/// Wakes the worker after a transaction that enqueued tasks has committed
#[derive(Clone, Default)]
pub struct OutboxHandle {
    wake: Arc<Notify>,
}

impl OutboxHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake(&self) {
        self.wake.notify_one();
    }
}

/// Background executor for queued side effects
pub struct OutboxWorker {
    pool: PgPool,
    config: OutboxConfig,
    wake: Arc<Notify>,
}

impl OutboxWorker {
    pub fn new(pool: PgPool, config: OutboxConfig, handle: &OutboxHandle) -> Self {
        Self {
            pool,
            config,
            wake: handle.wake.clone(),
        }
    }

    /// Run forever: drain due tasks whenever woken or when the scan interval elapses
    pub async fn run(self) {
        tracing::info!(
            "OutboxWorker started (poll every {:?}, max attempts {}, batch {})",
            self.config.poll_interval,
            self.config.max_attempts,
            self.config.batch_size
        );

        let mut scan_interval = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = scan_interval.tick() => {}
            }
            self.drain().await;
        }
    }

    /// Process batches until fewer than a full batch is due
    pub async fn drain(&self) {
        loop {
            match self.process_batch().await {
                Ok(processed) if processed as i64 >= self.config.batch_size => continue,
                Ok(_) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to process outbox batch");
                    break;
                }
            }
        }
    }

    /// Claim and execute one batch in a single transaction
    ///
    /// Each task runs inside its own savepoint so a failing task does not undo
    /// the others.
    pub async fn process_batch(&self) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let tasks = OutboxRepository::claim_due(&mut tx, self.config.batch_size).await?;

        for task in &tasks {
            let attempts = task.attempts + 1;
            let mut savepoint = (*tx).begin().await?;
            let outcome = execute(&mut savepoint, task).await;

            match outcome {
                Ok(()) => {
                    savepoint.commit().await?;
                    OutboxRepository::mark_done(&mut tx, task.id, attempts).await?;
                    tracing::debug!(task_id = task.id, kind = %task.kind, "Side effect completed");
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    let message = e.to_string();
                    if e.is_permanent() || attempts >= self.config.max_attempts {
                        OutboxRepository::mark_dead(&mut tx, task.id, attempts, &message).await?;
                        tracing::error!(
                            task_id = task.id,
                            kind = %task.kind,
                            attempts,
                            error = %message,
                            "Side effect dead-lettered, manual reconciliation required"
                        );
                    } else {
                        let delay = with_jitter(backoff_delay(attempts));
                        OutboxRepository::reschedule(&mut tx, task.id, attempts, &message, delay)
                            .await?;
                        tracing::warn!(
                            task_id = task.id,
                            kind = %task.kind,
                            attempts,
                            retry_in = ?delay,
                            error = %message,
                            "Side effect failed, will retry"
                        );
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(tasks.len())
    }
}

async fn execute(conn: &mut PgConnection, task: &OutboxTask) -> Result<(), OutboxError> {
    let effect: SideEffect = serde_json::from_value(task.payload.clone())?;
    match effect {
        SideEffect::RecordCouponUsage {
            coupon_id,
            user_id,
            order_id,
            discount,
        } => {
            CouponValidator::record_coupon_usage(conn, coupon_id, user_id, order_id, discount)
                .await?;
        }
        SideEffect::Notify(message) => {
            NotificationDispatcher::dispatch(conn, &message).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(8), Duration::from_secs(256));
        assert_eq!(backoff_delay(9), Duration::from_secs(300));
        assert_eq!(backoff_delay(100), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_before_first_failure_is_base() {
        assert_eq!(backoff_delay(0), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let delay = Duration::from_secs(8);
        for _ in 0..100 {
            let jittered = with_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= Duration::from_secs(10));
        }
    }

    #[tokio::test]
    async fn test_handle_wakes_waiter() {
        let handle = OutboxHandle::new();
        let wake = handle.wake.clone();
        handle.wake();
        tokio::time::timeout(Duration::from_secs(1), wake.notified())
            .await
            .expect("stored permit should wake the waiter");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Backoff never shrinks as attempts grow and never exceeds the cap
    #[test]
    fn prop_backoff_monotone_and_capped() {
        proptest!(|(attempts in 0i32..=1_000)| {
            let current = backoff_delay(attempts);
            let next = backoff_delay(attempts + 1);
            prop_assert!(next >= current);
            prop_assert!(next <= Duration::from_secs(RETRY_MAX_DELAY_SECS));
        });
    }
}
