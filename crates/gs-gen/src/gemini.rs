//! `GenerationService` backed by the Generative Language REST API.

use crate::credential::ApiKeySlot;
use crate::media::{data_uri, pcm16_to_wav, MediaStore};
use crate::service::{GenerationService, UpstreamError, VideoOperation};
use async_trait::async_trait;
use base64::Engine;
use gs_quota::Voice;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_PCM_RATE: u32 = 24_000;

#[derive(Debug, Clone)]
pub struct GeminiModels {
    pub image: String,
    pub speech: String,
    pub video: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    models: GeminiModels,
    api_key: ApiKeySlot,
    media: MediaStore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OperationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    /// HTTP status in error envelopes, `google.rpc.Code` in operations.
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl ApiErrorBody {
    fn describe(&self) -> String {
        match &self.status {
            Some(status) if !status.is_empty() => format!("{}: {}", status, self.message),
            _ => self.message.clone(),
        }
    }
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        models: GeminiModels,
        api_key: ApiKeySlot,
        media: MediaStore,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models,
            api_key,
            media,
        })
    }

    fn key(&self) -> Result<String, UpstreamError> {
        self.api_key.get().ok_or(UpstreamError::CredentialMissing)
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<T, UpstreamError> {
        let key = self.key()?;
        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let key = self.key()?;
        let resp = self
            .http
            .get(url)
            .header(API_KEY_HEADER, key)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }
}

fn transport(err: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport(err.without_url().to_string())
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, UpstreamError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(http_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
}

fn http_error(status: u16, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error)
        .map(|e| e.describe())
        .unwrap_or_else(|| body.trim().chars().take(300).collect());
    UpstreamError::Http { status, message }
}

/// First inline-data part of the first candidate, or a failure naming why
/// nothing came back.
fn first_inline_data(resp: GenerateContentResponse, what: &str) -> Result<InlineData, UpstreamError> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(UpstreamError::MissingResult(format!(
            "No {what} generated (prompt blocked: {reason})"
        )));
    }
    let candidate = resp.candidates.into_iter().next();
    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
    let inline = candidate
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data));
    match (inline, finish_reason) {
        (Some(data), _) => Ok(data),
        (None, Some(reason)) if reason != "STOP" => Err(UpstreamError::MissingResult(format!(
            "No {what} generated (finish reason: {reason})"
        ))),
        (None, _) => Err(UpstreamError::MissingResult(format!("No {what} generated"))),
    }
}

fn parse_operation(resp: OperationResponse) -> Result<VideoOperation, UpstreamError> {
    if let Some(err) = resp.error {
        return Err(UpstreamError::Operation {
            code: err.code,
            message: err.describe(),
        });
    }
    let video_uri = resp.response.as_ref().and_then(|r| {
        r.pointer("/generateVideoResponse/generatedSamples/0/video/uri")
            .or_else(|| r.pointer("/generatedVideos/0/video/uri"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    });
    Ok(VideoOperation {
        name: resp.name,
        done: resp.done,
        video_uri,
    })
}

/// Sample rate from an `audio/L16;codec=pcm;rate=24000` style MIME type.
fn pcm_rate(mime: &str) -> u32 {
    mime.split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
        .unwrap_or(DEFAULT_PCM_RATE)
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "imageConfig": { "aspectRatio": "16:9" } }
        });
        let resp: GenerateContentResponse = self
            .post_json(&self.model_url(&self.models.image, "generateContent"), body)
            .await?;
        let inline = first_inline_data(resp, "image")?;
        let mime = if inline.mime_type.is_empty() {
            "image/png"
        } else {
            inline.mime_type.as_str()
        };
        Ok(data_uri(mime, &inline.data))
    }

    async fn generate_speech(&self, text: &str, voice: Voice) -> Result<String, UpstreamError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice.as_str() } }
                }
            }
        });
        let resp: GenerateContentResponse = self
            .post_json(&self.model_url(&self.models.speech, "generateContent"), body)
            .await?;
        let inline = first_inline_data(resp, "audio")?;
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| UpstreamError::InvalidResponse(format!("audio payload: {e}")))?;
        let wav = pcm16_to_wav(&pcm, pcm_rate(&inline.mime_type), 1);
        Ok(self.media.insert("audio/wav", wav).await)
    }

    async fn submit_video(&self, prompt: &str) -> Result<VideoOperation, UpstreamError> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": "16:9", "resolution": "720p", "sampleCount": 1 }
        });
        let resp: OperationResponse = self
            .post_json(&self.model_url(&self.models.video, "predictLongRunning"), body)
            .await?;
        parse_operation(resp)
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, UpstreamError> {
        let url = format!("{}/{}", self.base_url, operation.name.trim_start_matches('/'));
        let resp: OperationResponse = self.get_json(&url).await?;
        let mut next = parse_operation(resp)?;
        if next.name.is_empty() {
            next.name = operation.name.clone();
        }
        Ok(next)
    }

    async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, UpstreamError> {
        let key = self.key()?;
        let resp = self
            .http
            .get(uri)
            .header(API_KEY_HEADER, key)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body));
        }
        let bytes = resp.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}
