use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Environment variable holding the upstream API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// `0` disables the attempt bound.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// `0` disables the deadline.
    #[serde(default = "default_poll_deadline_secs")]
    pub poll_deadline_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    env::var("GENSTUDIO_API_BASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_poll_attempts() -> u32 {
    120
}

fn default_poll_deadline_secs() -> u64 {
    900
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            video_model: default_video_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_deadline_secs: default_poll_deadline_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_poll_attempts(&self) -> Option<u32> {
        (self.max_poll_attempts > 0).then_some(self.max_poll_attempts)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        (self.poll_deadline_secs > 0).then(|| Duration::from_secs(self.poll_deadline_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
