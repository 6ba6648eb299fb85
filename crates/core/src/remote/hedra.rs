//! Hedra generation API client implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ApiConfig;

use super::{PollResponse, PollStatus, RemoteError, RemoteJobClient};

/// Hedra API client.
///
/// A job is submitted as three calls: upload the character image (once per
/// client, the asset id is cached), upload the audio clip, then create the
/// video. The returned video id is the job id.
pub struct HedraClient {
    client: Client,
    base_url: String,
    /// Uploaded image asset ids by local path.
    image_assets: RwLock<HashMap<PathBuf, String>>,
}

/// Response of `POST /assets`.
#[derive(Debug, Deserialize)]
struct AssetResponse {
    asset_id: String,
}

/// Body of `POST /videos`.
#[derive(Debug, Serialize)]
struct CreateVideoRequest<'a> {
    image_id: &'a str,
    audio_id: &'a str,
    prompt: &'a str,
}

/// Response of `POST /videos`.
#[derive(Debug, Deserialize)]
struct CreateVideoResponse {
    video_id: String,
}

/// Response of `GET /videos/{id}`.
#[derive(Debug, Deserialize)]
struct VideoStatusResponse {
    status: String,
    #[serde(default)]
    progress: Option<f32>,
    #[serde(default)]
    error: Option<String>,
}

impl HedraClient {
    /// Create a new Hedra client.
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self, RemoteError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| RemoteError::Configuration(format!("invalid API key: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RemoteError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_assets: RwLock::new(HashMap::new()),
        })
    }

    /// Get the base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload one local file and return its asset id.
    async fn upload_asset(&self, path: &Path) -> Result<String, RemoteError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| RemoteError::Input(format!("{}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = multipart::Part::bytes(data).file_name(file_name);
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/assets", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;

        let asset: AssetResponse = submission_json(response).await?;
        debug!("Uploaded {} as asset {}", path.display(), asset.asset_id);
        Ok(asset.asset_id)
    }

    /// Asset id of the character image, uploading it on first use.
    async fn image_asset(&self, image: &Path) -> Result<String, RemoteError> {
        if let Some(id) = self.image_assets.read().await.get(image) {
            return Ok(id.clone());
        }

        let id = self.upload_asset(image).await?;
        self.image_assets
            .write()
            .await
            .insert(image.to_path_buf(), id.clone());
        Ok(id)
    }
}

#[async_trait]
impl RemoteJobClient for HedraClient {
    fn name(&self) -> &str {
        "hedra"
    }

    async fn submit(
        &self,
        character_image: &Path,
        audio_clip: &Path,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        let image_id = self.image_asset(character_image).await?;
        let audio_id = self.upload_asset(audio_clip).await?;

        let url = format!("{}/videos", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateVideoRequest {
                image_id: &image_id,
                audio_id: &audio_id,
                prompt,
            })
            .send()
            .await
            .map_err(send_error)?;

        let created: CreateVideoResponse = submission_json(response).await?;
        Ok(created.video_id)
    }

    async fn poll(&self, job_id: &str) -> Result<PollResponse, RemoteError> {
        let url = format!("{}/videos/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await.map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = error_text(response).await;
            return Err(if is_transient_status(status) {
                RemoteError::Transient(format!("HTTP {}: {}", status.as_u16(), text))
            } else {
                RemoteError::Protocol(format!("HTTP {}: {}", status.as_u16(), text))
            });
        }

        let body: VideoStatusResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("invalid status response: {}", e)))?;

        Ok(PollResponse {
            status: parse_status(&body.status),
            progress: body.progress.map(normalize_progress),
            message: body.error,
        })
    }

    async fn fetch_result(&self, job_id: &str) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/videos/{}/download", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "video/*, application/octet-stream")
            .send()
            .await
            .map_err(|e| RemoteError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = error_text(response).await;
            return Err(RemoteError::Fetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref() {
            if !is_video_content_type(ct) {
                return Err(RemoteError::Fetch(format!(
                    "unexpected content type: {}",
                    ct
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Fetch(e.to_string()))?;
        if bytes.is_empty() {
            return Err(RemoteError::Fetch("empty video payload".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

/// Map a transport error. Everything that never reached a response is retryable.
fn send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Transient(format!("request timed out: {}", e))
    } else if e.is_connect() {
        RemoteError::Transient(format!("connection failed: {}", e))
    } else {
        RemoteError::Transient(e.to_string())
    }
}

/// Rate limiting and server errors are worth retrying.
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Decode a submission-phase response, classifying failures.
async fn submission_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();

    if !status.is_success() {
        let text = error_text(response).await;
        return Err(if is_transient_status(status) {
            RemoteError::Transient(format!("HTTP {}: {}", status.as_u16(), text))
        } else if status.is_client_error() {
            RemoteError::submission(status.as_u16(), text)
        } else {
            RemoteError::Protocol(format!("HTTP {}: {}", status.as_u16(), text))
        });
    }

    response
        .json()
        .await
        .map_err(|e| RemoteError::Protocol(format!("failed to parse JSON response: {}", e)))
}

async fn error_text(response: Response) -> String {
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    text.chars().take(200).collect()
}

/// Parse a Hedra video status string.
fn parse_status(status: &str) -> PollStatus {
    match status.to_ascii_lowercase().as_str() {
        "completed" | "complete" | "succeeded" | "done" => PollStatus::Done,
        "failed" | "error" | "cancelled" | "canceled" => PollStatus::Failed,
        _ => PollStatus::Running,
    }
}

/// Accept both 0-1 and 0-100 progress scales.
fn normalize_progress(progress: f32) -> f32 {
    let fraction = if progress > 1.0 {
        progress / 100.0
    } else {
        progress
    };
    fraction.clamp(0.0, 1.0)
}

fn is_video_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("video/") || mime == "application/octet-stream"
}
