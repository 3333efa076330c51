use super::progress::{ProjectEvent, ProjectListener};
use super::schedule::PollSchedule;
use super::steps::{status_to_step_index, JobType};
use super::{CancelFlag, PollError, PollHandle};
use crate::api::{ProjectDetails, StudioBackend};
use crate::cache::ClientCache;
use std::sync::Arc;

/// Message shown when the backend reports a failed job
pub const FAILURE_MESSAGE: &str = "Processing failed. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    Completed(ProjectDetails),
    Failed(String),
    /// Job completed but its details could not be fetched
    DetailsUnavailable,
    Cancelled,
}

/// Transient state of one watch run
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub status: Option<String>,
    pub attempt_count: u32,
    pub consecutive_errors: u32,
}

/// Watches a project until the backend reports `COMPLETED` or `FAILED`.
///
/// There is no attempt ceiling: a job stuck in the backend is polled until the
/// handle is cancelled.
pub struct ProjectStatusPoller<B: StudioBackend + ?Sized> {
    backend: Arc<B>,
    cache: Arc<ClientCache>,
    job_type: JobType,
    schedule: PollSchedule,
}

impl<B: StudioBackend + ?Sized + 'static> ProjectStatusPoller<B> {
    pub fn new(backend: Arc<B>, cache: Arc<ClientCache>) -> Self {
        Self {
            backend,
            cache,
            job_type: JobType::default(),
            schedule: PollSchedule::default(),
        }
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    /// Spawn the poll loop for `project_id`
    pub fn start<L: ProjectListener>(
        self,
        project_id: &str,
        listener: L,
    ) -> Result<PollHandle<ProjectOutcome>, PollError> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(PollError::EmptyProjectId);
        }

        let project_id = project_id.to_string();
        let flag = CancelFlag::new();
        let task_flag = flag.clone();

        tracing::info!(
            "Watching project {} (job type: {})",
            project_id,
            self.job_type
        );

        let task = tokio::spawn(async move { self.run(&project_id, listener, &task_flag).await });
        Ok(PollHandle::new(flag, task))
    }

    pub async fn run<L: ProjectListener>(
        &self,
        project_id: &str,
        mut listener: L,
        cancel: &CancelFlag,
    ) -> ProjectOutcome {
        let mut state = PollState::default();
        let steps = self.job_type.steps();

        loop {
            if cancel.is_cancelled() {
                return ProjectOutcome::Cancelled;
            }

            state.attempt_count += 1;
            let result = self.backend.project_status(project_id).await;

            if cancel.is_cancelled() {
                tracing::debug!("Project {} poll resolved after cancel, dropping", project_id);
                return ProjectOutcome::Cancelled;
            }

            let update = match result {
                Ok(update) => update,
                Err(e) => {
                    state.consecutive_errors += 1;
                    tracing::warn!(
                        "Status poll {} for project {} failed: {}",
                        state.attempt_count,
                        project_id,
                        e
                    );
                    self.schedule.wait_after_error(state.consecutive_errors).await;
                    continue;
                }
            };

            state.consecutive_errors = 0;
            state.status = Some(update.status.clone());

            if update.is_completed() {
                tracing::info!(
                    "Project {} completed after {} polls",
                    project_id,
                    state.attempt_count
                );
                return self.finish(project_id, &mut listener, cancel).await;
            }

            if update.is_failed() {
                tracing::warn!(
                    "Project {} failed: {}",
                    project_id,
                    update.message.as_deref().unwrap_or("no message")
                );
                listener.on_event(ProjectEvent::Failed {
                    message: FAILURE_MESSAGE.to_string(),
                });
                return ProjectOutcome::Failed(FAILURE_MESSAGE.to_string());
            }

            let step_index = status_to_step_index(self.job_type, &update.status);
            if step_index == 0 && !update.status.to_lowercase().contains("queue") {
                // Unknown vocabulary shows as the first step rather than an error.
                tracing::debug!(
                    "Status '{}' matches no {} step, showing '{}'",
                    update.status,
                    self.job_type,
                    steps[0]
                );
            }

            listener.on_event(ProjectEvent::Step {
                raw_status: update.status,
                step_index,
                step_label: steps[step_index],
                step_count: steps.len(),
            });

            self.schedule.wait_after_success().await;
        }
    }

    async fn finish<L: ProjectListener>(
        &self,
        project_id: &str,
        listener: &mut L,
        cancel: &CancelFlag,
    ) -> ProjectOutcome {
        let details = match self.backend.project_details(project_id).await {
            Ok(details) => details,
            Err(e) => {
                tracing::error!("Failed to fetch details for project {}: {}", project_id, e);
                return ProjectOutcome::DetailsUnavailable;
            }
        };

        if cancel.is_cancelled() {
            return ProjectOutcome::Cancelled;
        }

        if let Err(e) = self.cache.store_project(&details) {
            tracing::error!("Failed to cache details for project {}: {}", project_id, e);
        }

        listener.on_event(ProjectEvent::Completed {
            details: details.clone(),
        });
        ProjectOutcome::Completed(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::poller::testing::{recorder, sample_details, ScriptedBackend};
    use crate::poller::{ChannelListener, NoOpListener};
    use std::time::Duration;
    use tokio::time::Instant;

    fn poller(
        backend: &Arc<ScriptedBackend>,
        cache: &Arc<ClientCache>,
    ) -> ProjectStatusPoller<ScriptedBackend> {
        ProjectStatusPoller::new(backend.clone(), cache.clone())
    }

    #[tokio::test]
    async fn test_empty_project_id_is_rejected() {
        let backend = ScriptedBackend::new();
        let cache = Arc::new(ClientCache::in_memory());
        let result = poller(&backend, &cache).start("  ", NoOpListener);
        assert!(matches!(result, Err(PollError::EmptyProjectId)));
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progresses_through_steps_then_completes() {
        let backend = ScriptedBackend::new();
        backend.push_status("QUEUED");
        backend.push_status("TRANSCRIBING_AUDIO");
        backend.push_status("COMPLETED");
        let cache = Arc::new(ClientCache::in_memory());
        let (events, listener) = recorder::<ProjectEvent>();

        let handle = poller(&backend, &cache)
            .with_job_type(JobType::Subtitles)
            .start("p-1", listener)
            .unwrap();
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome, ProjectOutcome::Completed(sample_details()));
        assert_eq!(cache.current_project(), Some(sample_details()));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            ProjectEvent::Step { step_index: 0, step_label: "Queueing", .. }
        ));
        assert!(matches!(
            events[1],
            ProjectEvent::Step { step_index: 1, step_label: "Transcribing", step_count: 3, .. }
        ));
        assert!(matches!(events[2], ProjectEvent::Completed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_can_be_consumed_from_a_channel() {
        let backend = ScriptedBackend::new();
        backend.push_status("FAILED");
        let cache = Arc::new(ClientCache::in_memory());
        let (listener, mut rx) = ChannelListener::<ProjectEvent>::new();

        let handle = poller(&backend, &cache).start("p-1", listener).unwrap();
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome, ProjectOutcome::Failed(FAILURE_MESSAGE.to_string()));
        assert_eq!(
            rx.recv().await,
            Some(ProjectEvent::Failed {
                message: FAILURE_MESSAGE.to_string()
            })
        );
        // the listener was moved into the finished task and dropped with it
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_polls_after_completion() {
        let backend = ScriptedBackend::new();
        backend.push_status("COMPLETED");
        let cache = Arc::new(ClientCache::in_memory());

        let handle = poller(&backend, &cache).start("p-1", NoOpListener).unwrap();
        handle.join().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_terminal() {
        let backend = ScriptedBackend::new();
        backend.push_status("TRANSLATING");
        backend.push_status("FAILED");
        let cache = Arc::new(ClientCache::in_memory());
        let (events, listener) = recorder::<ProjectEvent>();

        let handle = poller(&backend, &cache).start("p-1", listener).unwrap();
        let outcome = handle.join().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(outcome, ProjectOutcome::Failed(FAILURE_MESSAGE.to_string()));
        assert_eq!(backend.status_calls(), 2);
        let events = events.lock().unwrap();
        assert_eq!(
            events.last(),
            Some(&ProjectEvent::Failed { message: FAILURE_MESSAGE.to_string() })
        );
        assert!(cache.current_project().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_errors_back_off_and_retry() {
        let backend = ScriptedBackend::new();
        backend.push_status_error(ApiError::Network("connection reset".to_string()));
        backend.push_status_error(ApiError::Decode("bad json".to_string()));
        backend.push_status("COMPLETED");
        let cache = Arc::new(ClientCache::in_memory());

        let start = Instant::now();
        let handle = poller(&backend, &cache).start("p-1", NoOpListener).unwrap();
        let outcome = handle.join().await.unwrap();

        assert!(matches!(outcome, ProjectOutcome::Completed(_)));
        assert_eq!(backend.status_calls(), 3);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_polls_are_spaced_by_interval() {
        let backend = ScriptedBackend::new();
        backend.push_status("DUBBING");
        backend.push_status("DUBBING");
        backend.push_status("COMPLETED");
        let cache = Arc::new(ClientCache::in_memory());

        let start = Instant::now();
        let handle = poller(&backend, &cache).start("p-1", NoOpListener).unwrap();
        handle.join().await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_details_failure_is_not_retried() {
        let backend = ScriptedBackend::new();
        backend.push_status("COMPLETED");
        backend.push_details(Err(ApiError::Http { status: 500, body: "boom".to_string() }));
        let cache = Arc::new(ClientCache::in_memory());
        let (events, listener) = recorder::<ProjectEvent>();

        let handle = poller(&backend, &cache).start("p-1", listener).unwrap();
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome, ProjectOutcome::DetailsUnavailable);
        assert_eq!(backend.details_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(backend.status_calls(), 1);
        assert!(events.lock().unwrap().is_empty());
        assert!(cache.current_project().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_further_events() {
        let backend = ScriptedBackend::new();
        backend.push_status("TRANSCRIBING");
        let cache = Arc::new(ClientCache::in_memory());
        let (events, listener) = recorder::<ProjectEvent>();

        let handle = poller(&backend, &cache).start("p-1", listener).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(events.lock().unwrap().len(), 1);

        handle.cancel();
        let outcome = handle.join().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(outcome, ProjectOutcome::Cancelled);
        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let backend = ScriptedBackend::new();
        let cache = Arc::new(ClientCache::in_memory());
        let (events, listener) = recorder::<ProjectEvent>();

        let handle = poller(&backend, &cache).start("p-1", listener).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(backend.status_calls(), 1);
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
