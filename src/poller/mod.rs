// src/poller/mod.rs
// Poll-until-terminal loops for job status and credit confirmation

pub mod credits;
pub mod progress;
pub mod project;
pub mod schedule;
pub mod steps;

pub use credits::{CreditConfirmationPoller, CreditOutcome, CreditSnapshot};
pub use progress::{
    ChannelListener, CreditEvent, CreditListener, NoOpListener, ProjectEvent, ProjectListener,
};
pub use project::{ProjectOutcome, ProjectStatusPoller, FAILURE_MESSAGE};
pub use schedule::{CreditSchedule, PollSchedule};
pub use steps::{status_to_step_index, status_to_step_label, JobType};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Project id must not be empty")]
    EmptyProjectId,

    #[error("Poll task aborted: {0}")]
    TaskAborted(String),
}

/// Cooperative cancellation shared between a poll loop and its owner.
///
/// Setting the flag never aborts an in-flight request; the loop checks it
/// before emitting events, writing the cache or scheduling the next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owner of a running poll task. Dropping it cancels the poll.
pub struct PollHandle<T> {
    flag: CancelFlag,
    task: Option<JoinHandle<T>>,
}

impl<T> PollHandle<T> {
    pub(crate) fn new(flag: CancelFlag, task: JoinHandle<T>) -> Self {
        Self {
            flag,
            task: Some(task),
        }
    }

    pub fn cancel(&self) {
        self.flag.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Wait for the poll to resolve
    pub async fn join(mut self) -> Result<T, PollError> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| PollError::TaskAborted(e.to_string())),
            None => Err(PollError::TaskAborted("already joined".to_string())),
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.flag.cancel();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::api::{ApiError, ProjectDetails, ProjectStatusUpdate, StudioBackend, User};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Backend that replays queued responses
    #[derive(Default)]
    pub struct ScriptedBackend {
        statuses: Mutex<VecDeque<Result<ProjectStatusUpdate, ApiError>>>,
        details: Mutex<VecDeque<Result<ProjectDetails, ApiError>>>,
        profiles: Mutex<VecDeque<Result<User, ApiError>>>,
        pub status_calls: AtomicU32,
        pub details_calls: AtomicU32,
        pub profile_calls: AtomicU32,
    }

    impl ScriptedBackend {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn push_status(&self, status: &str) {
            self.statuses.lock().unwrap().push_back(Ok(status_update(status)));
        }

        pub fn push_status_error(&self, error: ApiError) {
            self.statuses.lock().unwrap().push_back(Err(error));
        }

        pub fn push_details(&self, details: Result<ProjectDetails, ApiError>) {
            self.details.lock().unwrap().push_back(details);
        }

        pub fn push_profile(&self, profile: Result<User, ApiError>) {
            self.profiles.lock().unwrap().push_back(profile);
        }

        pub fn status_calls(&self) -> u32 {
            self.status_calls.load(Ordering::SeqCst)
        }

        pub fn profile_calls(&self) -> u32 {
            self.profile_calls.load(Ordering::SeqCst)
        }
    }

    pub fn status_update(status: &str) -> ProjectStatusUpdate {
        ProjectStatusUpdate {
            project_id: "p-1".to_string(),
            status: status.to_string(),
            progress: None,
            message: None,
        }
    }

    pub fn sample_details() -> ProjectDetails {
        ProjectDetails {
            project_id: "p-1".to_string(),
            name: "Launch video".to_string(),
            final_video_signed_url: Some("https://cdn.example.com/final.mp4".to_string()),
            original_video_signed_url: None,
            final_video_signed_url_withwatermark: None,
            srt_signed_url: None,
            segments: Vec::new(),
        }
    }

    #[async_trait]
    impl StudioBackend for ScriptedBackend {
        async fn project_status(&self, _project_id: &str) -> Result<ProjectStatusUpdate, ApiError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(status_update("PROCESSING")))
        }

        async fn project_details(&self, _project_id: &str) -> Result<ProjectDetails, ApiError> {
            self.details_calls.fetch_add(1, Ordering::SeqCst);
            self.details
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(sample_details()))
        }

        async fn profile(&self) -> Result<User, ApiError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            self.profiles
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("no scripted profile".to_string())))
        }
    }

    /// Listener that records every event into a shared vector
    pub fn recorder<E: Send + 'static>() -> (Arc<Mutex<Vec<E>>>, impl FnMut(E) + Send + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event| sink.lock().unwrap().push(event))
    }
}
