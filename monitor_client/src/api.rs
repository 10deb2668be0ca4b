//! REST API client for the monitor backend
//!
//! Thin typed wrappers over the `/monitor/*` endpoints plus face sign-in.
//! Every monitor-scoped call encodes the resource identifier the same way
//! the live feed does.

use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::DashboardConfig, endpoint::BackendEndpoint, resource::ResourceId, DashboardError,
    Result,
};

/// Default history window for health metrics
pub const DEFAULT_METRIC_DAYS: u32 = 7;

/// One health metrics sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub id: i64,

    /// ISO-8601 local timestamp as produced by the backend
    pub timestamp: String,
}

/// A recorded working session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: i64,

    /// Unix seconds
    #[serde(default)]
    pub start_time: Option<i64>,

    /// Unix seconds, absent while the session is still open
    #[serde(default)]
    pub end_time: Option<i64>,

    /// Whole seconds, set when the session ends
    #[serde(default)]
    pub duration_seconds: Option<i64>,

    #[serde(default)]
    pub monitor_video_url: Option<String>,
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    pub message: String,
}

/// Face sign-in outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigninResponse {
    pub success: bool,
    pub message: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Face embedding distance to the closest known face
    #[serde(default)]
    pub distance: Option<f64>,
}

/// REST client for one backend
#[derive(Debug, Clone)]
pub struct MonitorApi {
    http: Client,
    endpoint: BackendEndpoint,
}

impl MonitorApi {
    /// Create a client with an existing HTTP client
    pub fn new(http: Client, endpoint: BackendEndpoint) -> Self {
        Self { http, endpoint }
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.backend.request_timeout())
            .build()?;
        Ok(Self::new(http, BackendEndpoint::from_config(config)?))
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// List registered monitor identifiers
    pub async fn list_monitors(&self) -> Result<Vec<ResourceId>> {
        let url = self.endpoint.api_url(&["monitor", "list"])?;
        self.get(url).await
    }

    /// Current status document for a monitor
    pub async fn status(&self, resource: &ResourceId) -> Result<Value> {
        let url = self.endpoint.resource_url(resource, &["status"])?;
        self.get(url).await
    }

    /// Health metric samples over the last `days` days
    pub async fn health_metrics(&self, resource: &ResourceId, days: u32) -> Result<Vec<HealthMetric>> {
        let mut url = self.endpoint.resource_url(resource, &["health_metrics"])?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        self.get(url).await
    }

    /// Working sessions between two unix timestamps
    pub async fn history(
        &self,
        resource: &ResourceId,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<Vec<WorkSession>> {
        if end_ts < start_ts {
            return Err(DashboardError::validation(format!(
                "history window ends before it starts: {} > {}",
                start_ts, end_ts
            )));
        }

        let mut url = self.endpoint.resource_url(resource, &["history"])?;
        url.query_pairs_mut()
            .append_pair("start_date_ts", &start_ts.to_string())
            .append_pair("end_date_ts", &end_ts.to_string());
        self.get(url).await
    }

    /// Enable or disable YOLO analysis for a monitor
    pub async fn toggle_yolo(&self, resource: &ResourceId, enable: bool) -> Result<ActionResponse> {
        let flag = if enable { "true" } else { "false" };
        let url = self.endpoint.resource_url(resource, &["toggle_yolo", flag])?;
        self.get(url).await
    }

    /// Upload a face image for sign-in
    pub async fn face_signin(&self, image: Vec<u8>, file_name: &str) -> Result<SigninResponse> {
        let url = self.endpoint.api_url(&["face_signin"])?;
        let part = multipart::Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("image", part);

        debug!(url = %url, file_name = file_name, "Uploading face sign-in image");
        let response = self.http.post(url).multipart(form).send().await?;
        decode(response).await
    }

    /// MJPEG stream URL for a monitor
    pub fn video_feed_url(&self, resource: &ResourceId) -> Result<Url> {
        self.endpoint.resource_url(resource, &["video_feed"])
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.http.get(url).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body);
        warn!(status = status.as_u16(), message = %message, "Monitor API request failed");
        return Err(DashboardError::api(status.as_u16(), message));
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Pull `detail` out of a FastAPI-style error body, else return the body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}
