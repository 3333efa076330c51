// src/api/client.rs
// REST client for the Curify backend

use super::metrics::{RequestMetrics, RouteStats};
use super::types::*;
use super::StudioBackend;
use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub struct ApiClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
    metrics: Mutex<RequestMetrics>,
}

/// One outgoing request, labelled with the route it is accounted under
struct Call {
    route: &'static str,
    method: Method,
    url: String,
    builder: RequestBuilder,
}

impl Call {
    fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    fn multipart(mut self, form: multipart::Form) -> Self {
        self.builder = self.builder.multipart(form);
        self
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "ApiClient initialized: base_url={}, authenticated={}",
            config.api_url,
            config.access_token.is_some()
        );

        Ok(Self {
            base_url: config.api_url.clone(),
            access_token: config.access_token.clone(),
            client,
            metrics: Mutex::new(RequestMetrics::new()),
        })
    }

    /// Replace the bearer token, e.g. after a login
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-route totals for every call made through this client
    pub fn request_stats(&self) -> Vec<(String, RouteStats)> {
        self.metrics
            .lock()
            .map(|m| m.snapshot())
            .unwrap_or_default()
    }

    // --- projects ---

    pub async fn get_user_projects(&self) -> Result<Vec<Project>, ApiError> {
        let call = self.call(Method::GET, "/user/projects", "user.projects");
        self.fetch_json(call).await
    }

    pub async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<ProjectCreateResponse, ApiError> {
        let call = self
            .call(Method::POST, "/projects/translate", "projects.create")
            .json(request);
        let envelope: Envelope<ProjectCreateResponse> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<ProjectDetails, ApiError> {
        let call = self.call(Method::GET, &format!("/projects/{}", project_id), "projects.get");
        let envelope: Envelope<ProjectDetails> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    pub async fn get_project_status(
        &self,
        project_id: &str,
    ) -> Result<ProjectStatusUpdate, ApiError> {
        let endpoint = format!("/projects/{}/status", project_id);
        let call = self.call(Method::GET, &endpoint, "projects.status");
        self.fetch_json(call).await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        let endpoint = format!("/projects/{}", project_id);
        let call = self.call(Method::DELETE, &endpoint, "projects.delete");
        self.fetch_empty(call).await
    }

    /// Download the final rendered video
    pub async fn download_video(&self, project_id: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = format!("/videos/{}/download", project_id);
        let call = self.call(Method::GET, &endpoint, "videos.download");
        self.fetch_bytes(call).await
    }

    pub async fn reprocess_project_with_segments(
        &self,
        project_id: &str,
        updated_segments: &[SegmentUpdate],
    ) -> Result<ProjectCreateResponse, ApiError> {
        #[derive(Serialize)]
        struct ReprocessBody<'a> {
            project_id: &'a str,
            updated_segments: &'a [SegmentUpdate],
        }

        let call = self
            .call(Method::POST, "/projects/reprocess", "projects.reprocess")
            .json(&ReprocessBody {
                project_id,
                updated_segments,
            });
        self.fetch_json(call).await
    }

    // --- videos ---

    pub async fn upload_video(&self, path: &Path) -> Result<VideoUploadResponse, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Cannot read {:?}: {}", path, e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        tracing::info!("Uploading video {} ({} bytes)", file_name, bytes.len());

        let form = multipart::Form::new()
            .text("is_youtube_upload", "false")
            .part("video_file", multipart::Part::bytes(bytes).file_name(file_name));

        let call = self
            .call(Method::POST, "/videos/upload", "videos.upload")
            .multipart(form);
        let envelope: Envelope<VideoUploadResponse> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    pub async fn upload_youtube_video(
        &self,
        youtube_url: &str,
    ) -> Result<VideoUploadResponse, ApiError> {
        if youtube_url.trim().is_empty() {
            return Err(ApiError::InvalidRequest("YouTube URL is empty".to_string()));
        }

        let form = multipart::Form::new()
            .text("is_youtube_upload", "true")
            .text("youtube_url", youtube_url.trim().to_string());

        let call = self
            .call(Method::POST, "/videos/upload", "videos.upload")
            .multipart(form);
        let envelope: Envelope<VideoUploadResponse> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    // --- auth ---

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let call = self
            .call(Method::POST, "/auth/login", "auth.login")
            .json(credentials);
        self.fetch_json(call).await
    }

    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse, ApiError> {
        let call = self
            .call(Method::POST, "/auth/register", "auth.register")
            .json(data);
        self.fetch_json(call).await
    }

    /// Exchange a Google Identity credential for backend tokens
    pub async fn google_login(&self, credential: &str) -> Result<AuthResponse, ApiError> {
        let call = self
            .call(Method::POST, "/auth/google-login", "auth.google")
            .json(&serde_json::json!({ "token": credential }));
        self.fetch_json(call).await
    }

    pub async fn refresh_token(&self) -> Result<AuthResponse, ApiError> {
        let call = self.call(Method::POST, "/auth/refresh", "auth.refresh");
        self.fetch_json(call).await
    }

    pub async fn get_profile(&self) -> Result<User, ApiError> {
        let call = self.call(Method::GET, "/user/profile", "user.profile");
        let envelope: Envelope<User> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    // --- billing ---

    pub async fn subscribe_to_plan(
        &self,
        plan_name: &str,
    ) -> Result<SubscriptionResponse, ApiError> {
        let call = self
            .call(Method::POST, "/user/subscribe", "user.subscribe")
            .json(&serde_json::json!({ "plan_name": plan_name }));
        let envelope: Envelope<SubscriptionResponse> = self.fetch_json(call).await?;
        Ok(envelope.data)
    }

    pub async fn cancel_subscription(&self) -> Result<(), ApiError> {
        let call = self.call(Method::POST, "/user/cancel", "user.cancel");
        self.fetch_empty(call).await
    }

    pub async fn record_credit_usage(
        &self,
        usage: &CreditUsageRequest,
    ) -> Result<CreditUsageResponse, ApiError> {
        let call = self
            .call(Method::POST, "/credits/usage", "credits.usage")
            .json(usage);
        self.fetch_json(call).await
    }

    pub async fn get_transactions(&self) -> Result<TransactionsResponse, ApiError> {
        let call = self.call(Method::GET, "/transactions", "transactions");
        self.fetch_json(call).await
    }

    // --- plumbing ---

    fn call(&self, method: Method, endpoint: &str, route: &'static str) -> Call {
        let url = format!("{}{}", self.base_url, endpoint);
        let builder = self.client.request(method.clone(), &url);
        let builder = match self.access_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        Call {
            route,
            method,
            url,
            builder,
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, call: Call) -> Result<T, ApiError> {
        let route = call.route;
        self.finish(call, |response| async move {
            response.json::<T>().await.map_err(|e| {
                tracing::warn!("[{}] response decode failed: {}", route, e);
                ApiError::Decode(e.to_string())
            })
        })
        .await
    }

    async fn fetch_bytes(&self, call: Call) -> Result<Vec<u8>, ApiError> {
        self.finish(call, |response| async move {
            Ok(response.bytes().await?.to_vec())
        })
        .await
    }

    async fn fetch_empty(&self, call: Call) -> Result<(), ApiError> {
        self.finish(call, |_| async { Ok(()) }).await
    }

    /// Send, read the body with `read`, then account the whole call once
    async fn finish<T, F, Fut>(&self, call: Call, read: F) -> Result<T, ApiError>
    where
        F: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let route = call.route;
        let start = Instant::now();
        let result = match self.execute(call).await {
            Ok(response) => read(response).await,
            Err(e) => Err(e),
        };

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record(route, start.elapsed(), result.as_ref().err());
        }
        result
    }

    async fn execute(&self, call: Call) -> Result<Response, ApiError> {
        let Call {
            route,
            method,
            url,
            builder,
        } = call;
        let request_id = Uuid::new_v4().to_string();
        let builder = builder.header(REQUEST_ID_HEADER, request_id.as_str());

        let start = Instant::now();
        let result = send_checked(builder).await;
        let duration_ms = start.elapsed().as_millis();

        match &result {
            Ok(resp) => tracing::debug!(
                "[{}] {} {} {} -> {} in {}ms",
                route,
                request_id,
                method,
                url,
                resp.status(),
                duration_ms
            ),
            Err(e) => tracing::warn!(
                "[{}] {} {} {} failed after {}ms: {}",
                route,
                request_id,
                method,
                url,
                duration_ms,
                e
            ),
        }

        result
    }
}

async fn send_checked(builder: RequestBuilder) -> Result<Response, ApiError> {
    let response = builder.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 => Err(ApiError::Authentication),
        429 => Err(ApiError::RateLimit),
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Http { status: code, body })
        }
    }
}

#[async_trait]
impl StudioBackend for ApiClient {
    async fn project_status(&self, project_id: &str) -> Result<ProjectStatusUpdate, ApiError> {
        self.get_project_status(project_id).await
    }

    async fn project_details(&self, project_id: &str) -> Result<ProjectDetails, ApiError> {
        self.get_project(project_id).await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.get_profile().await
    }
}
