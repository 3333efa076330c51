// src/api/mod.rs
// Backend API - typed REST client and the seam the pollers depend on

mod client;
pub mod metrics;
mod types;

pub use client::ApiClient;
pub use types::*;

use async_trait::async_trait;

/// The backend calls the polling loops need
#[async_trait]
pub trait StudioBackend: Send + Sync {
    /// Current processing status of a project
    async fn project_status(&self, project_id: &str) -> Result<ProjectStatusUpdate, ApiError>;

    /// Full project record, available once processing completed
    async fn project_details(&self, project_id: &str) -> Result<ProjectDetails, ApiError>;

    /// Current user profile with credit balances
    async fn profile(&self) -> Result<User, ApiError>;
}
