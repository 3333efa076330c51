pub mod api;
pub mod billing;
pub mod cache;
pub mod config;
pub mod poller;

pub use api::{ApiClient, ApiError, StudioBackend};
pub use cache::{CacheError, ClientCache};
pub use config::{ClientConfig, ConfigError};
pub use poller::{
    CreditConfirmationPoller, CreditEvent, CreditOutcome, JobType, PollError, PollHandle,
    ProjectEvent, ProjectOutcome, ProjectStatusPoller,
};
