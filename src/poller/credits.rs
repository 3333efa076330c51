use super::progress::{CreditEvent, CreditListener, WORKSPACE_ROUTE};
use super::schedule::CreditSchedule;
use super::{CancelFlag, PollHandle};
use crate::api::StudioBackend;
use crate::cache::ClientCache;
use std::sync::Arc;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditSnapshot {
    pub baseline_credits: f64,
    pub current_credits: f64,
    pub attempt_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreditOutcome {
    Confirmed(CreditSnapshot),
    /// Ceiling reached; the caller decides what happens next
    TimedOut(CreditSnapshot),
    Cancelled,
}

/// Waits, after a payment redirect, for the non-expiring credit balance to
/// rise above the baseline captured from the client cache.
///
/// Only the displayed balance depends on this; settlement itself is owned by
/// the backend and the payment processor.
pub struct CreditConfirmationPoller<B: StudioBackend + ?Sized> {
    backend: Arc<B>,
    cache: Arc<ClientCache>,
    schedule: CreditSchedule,
}

impl<B: StudioBackend + ?Sized + 'static> CreditConfirmationPoller<B> {
    pub fn new(backend: Arc<B>, cache: Arc<ClientCache>) -> Self {
        Self {
            backend,
            cache,
            schedule: CreditSchedule::default(),
        }
    }

    pub fn with_schedule(mut self, schedule: CreditSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Capture the baseline from the cache and spawn the poll loop
    pub fn start<L: CreditListener>(self, listener: L) -> PollHandle<CreditOutcome> {
        let initial_credits = self.cache.cached_credits();
        self.start_with_baseline(initial_credits, listener)
    }

    pub fn start_with_baseline<L: CreditListener>(
        self,
        initial_credits: f64,
        listener: L,
    ) -> PollHandle<CreditOutcome> {
        let flag = CancelFlag::new();
        let task_flag = flag.clone();

        tracing::info!(
            "Waiting for credits above {} (max {} attempts)",
            initial_credits,
            self.schedule.max_attempts
        );

        let task =
            tokio::spawn(async move { self.run(initial_credits, listener, &task_flag).await });
        PollHandle::new(flag, task)
    }

    pub async fn run<L: CreditListener>(
        &self,
        initial_credits: f64,
        mut listener: L,
        cancel: &CancelFlag,
    ) -> CreditOutcome {
        let mut snapshot = CreditSnapshot {
            baseline_credits: initial_credits,
            current_credits: initial_credits,
            attempt_count: 0,
        };

        loop {
            if cancel.is_cancelled() {
                return CreditOutcome::Cancelled;
            }

            let result = self.backend.profile().await;

            if cancel.is_cancelled() {
                return CreditOutcome::Cancelled;
            }

            snapshot.attempt_count += 1;

            match result {
                Ok(user) => {
                    snapshot.current_credits = user.non_expiring_credits;
                    listener.on_event(CreditEvent::Attempt {
                        attempt: snapshot.attempt_count,
                        max_attempts: self.schedule.max_attempts,
                        credits: Some(user.non_expiring_credits),
                    });

                    if user.non_expiring_credits > snapshot.baseline_credits {
                        tracing::info!(
                            "Credits confirmed: {} -> {} after {} attempts",
                            snapshot.baseline_credits,
                            snapshot.current_credits,
                            snapshot.attempt_count
                        );

                        if let Err(e) = self.cache.store_user(&user) {
                            tracing::error!("Failed to cache refreshed profile: {}", e);
                        }
                        listener.on_event(CreditEvent::Confirmed {
                            credits: snapshot.current_credits,
                        });

                        sleep(self.schedule.redirect_delay).await;
                        if !cancel.is_cancelled() {
                            listener.on_event(CreditEvent::Redirect {
                                route: WORKSPACE_ROUTE.to_string(),
                            });
                        }
                        return CreditOutcome::Confirmed(snapshot);
                    }
                }
                Err(e) => {
                    // Still processing and transient errors look the same here.
                    tracing::warn!(
                        "Credit poll {}/{} failed: {}",
                        snapshot.attempt_count,
                        self.schedule.max_attempts,
                        e
                    );
                    listener.on_event(CreditEvent::Attempt {
                        attempt: snapshot.attempt_count,
                        max_attempts: self.schedule.max_attempts,
                        credits: None,
                    });
                }
            }

            if self.schedule.is_exhausted(snapshot.attempt_count) {
                tracing::warn!(
                    "Credits not confirmed after {} attempts",
                    snapshot.attempt_count
                );
                listener.on_event(CreditEvent::TimedOut {
                    attempts: snapshot.attempt_count,
                });
                return CreditOutcome::TimedOut(snapshot);
            }

            sleep(self.schedule.interval).await;
        }
    }
}
