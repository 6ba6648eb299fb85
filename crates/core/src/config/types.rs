use serde::{Deserialize, Serialize};

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote generation API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the generation API (e.g., "https://api.hedra.ai/v1")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key. The `--api_key` flag and `HEDRA_API_KEY` take precedence.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: 120)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.hedra.ai/v1".to_string()
}

fn default_timeout() -> u32 {
    120
}

/// Input folder scanning configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Recognized character image extensions (case-insensitive, no dot)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Recognized audio clip extensions (case-insensitive, no dot)
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            audio_extensions: default_audio_extensions(),
        }
    }
}

fn default_image_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_audio_extensions() -> Vec<String> {
    vec!["wav".to_string(), "mp3".to_string(), "m4a".to_string()]
}

/// What to do when a clip's output video already exists
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Keep the existing file and skip the clip without calling the API.
    #[default]
    Skip,
    /// Regenerate the clip and atomically replace the existing file.
    Overwrite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Extension of generated videos (default: "mp4")
    #[serde(default = "default_video_extension")]
    pub video_extension: String,
    /// Run log file name, created inside the output folder
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            video_extension: default_video_extension(),
            log_file: default_log_file(),
            overwrite: OverwritePolicy::default(),
        }
    }
}

fn default_video_extension() -> String {
    "mp4".to_string()
}

fn default_log_file() -> String {
    "hedra_batch.log".to_string()
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: SanitizedApiConfig,
    pub input: InputConfig,
    pub orchestrator: OrchestratorConfig,
    pub output: OutputConfig,
}

/// Sanitized API config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: SanitizedApiConfig {
                base_url: config.api.base_url.clone(),
                api_key_configured: config
                    .api
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_secs: config.api.timeout_secs,
            },
            input: config.input.clone(),
            orchestrator: config.orchestrator.clone(),
            output: config.output.clone(),
        }
    }
}
