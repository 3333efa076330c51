// src/api/types.rs
// Backend records and API error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic `{ "data": ... }` wrapper used by most backend endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Live status of a processing job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatusUpdate {
    /// Some backends answer with the status alone
    #[serde(default)]
    pub project_id: String,
    /// Raw backend value (`QUEUED`, `TRANSCRIBING_AUDIO`, `COMPLETED`, ...)
    pub status: String,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ProjectStatusUpdate {
    pub fn is_completed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("completed")
    }

    pub fn is_failed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("failed")
    }
}

/// One subtitle/dubbing line of a processed project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: i64,
    pub line_number: u32,
    pub original: String,
    pub translated: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_edited: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Full project record returned once a job has completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub final_video_signed_url: Option<String>,
    #[serde(default)]
    pub original_video_signed_url: Option<String>,
    #[serde(default)]
    pub final_video_signed_url_withwatermark: Option<String>,
    #[serde(default)]
    pub srt_signed_url: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    None,
    Source,
    Target,
    Bilingual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOption {
    Original,
    Dubbed,
    Premium,
}

/// Job settings as the backend stores them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    pub erase_original_subtitles: bool,
    pub subtitles_enabled: SubtitleFormat,
    pub audio_option: AudioOption,
    pub allow_lip_syncing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

/// Project summary as listed in the user's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub project_name: String,
    /// `processing | completed | failed | queued | pending`
    pub status: String,
    pub created_at: String,
    pub job_settings: JobSettings,
    #[serde(default)]
    pub project_duration_minutes: f64,
    #[serde(default)]
    pub video_duration_seconds: f64,
    #[serde(default)]
    pub final_video_signed_url: Option<String>,
    #[serde(default)]
    pub final_video_signed_url_withwatermark: Option<String>,
    #[serde(default)]
    pub thumbnail_signed_url: Option<String>,
    #[serde(default)]
    pub srt_signed_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub video_id: String,
    #[serde(rename = "name")]
    pub project_name: String,
    pub description: String,
    pub job_settings: JobSettings,
    pub runtime_params: serde_json::Map<String, serde_json::Value>,
    pub is_production: bool,
}

impl CreateProjectRequest {
    pub fn new(
        video_id: impl Into<String>,
        project_name: impl Into<String>,
        job_settings: JobSettings,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            project_name: project_name.into(),
            description: String::new(),
            job_settings,
            runtime_params: serde_json::Map::new(),
            is_production: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreateResponse {
    pub project_id: String,
}

/// Manual edit applied to a segment before reprocessing
#[derive(Debug, Clone, Serialize)]
pub struct SegmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<i64>,
    pub line_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoUploadResponse {
    pub stored_filename: String,
    pub blob_url: String,
    pub video_id: String,
    #[serde(default)]
    pub thumbnail_signed_url: Option<String>,
}

/// Account profile, including credit balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub plan_name: String,
    pub non_expiring_credits: f64,
    pub expiring_credits: f64,
    #[serde(default)]
    pub subtitle_minutes_used: f64,
    pub current_cycle_start: String,
    pub current_cycle_end: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub data: AuthTokens,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditUsageRequest {
    pub description: String,
    pub credits_used: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditUsageResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub remaining_credits: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    pub data: Vec<Transaction>,
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Backend API errors with retry classification
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Authentication failed")]
    Authentication,

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns true if the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout | ApiError::RateLimit => true,
            ApiError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
