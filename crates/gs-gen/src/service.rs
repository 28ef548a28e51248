use async_trait::async_trait;
use gs_quota::Voice;

/// Raw failure reported by the upstream generation service, before classification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("API_KEY_MISSING")]
    CredentialMissing,
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    /// A long-running operation finished with a `google.rpc.Status` error.
    #[error("operation failed (code {code}): {message}")]
    Operation { code: i32, message: String },
    #[error("{0}")]
    MissingResult(String),
    #[error("malformed response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// HTTP status of the failure. Operation errors report the status their
    /// RPC code maps to.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            UpstreamError::Operation { code, .. } => rpc_code_status(*code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, UpstreamError::Transport(_))
    }

    /// Failures raised while reading a response we already received. Their
    /// text never describes the request's credential.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            UpstreamError::MissingResult(_) | UpstreamError::InvalidResponse(_)
        )
    }
}

fn rpc_code_status(code: i32) -> Option<u16> {
    match code {
        3 => Some(400),  // INVALID_ARGUMENT
        7 => Some(403),  // PERMISSION_DENIED
        8 => Some(429),  // RESOURCE_EXHAUSTED
        14 => Some(503), // UNAVAILABLE
        16 => Some(401), // UNAUTHENTICATED
        _ => None,
    }
}

/// Handle to a long-running video job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    /// Media locator, present once the job has completed successfully.
    pub video_uri: Option<String>,
}

impl VideoOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            video_uri: None,
        }
    }
}

/// Contract the dispatcher relies on. Resource references returned by the
/// image and speech operations are directly usable URLs (data URIs or
/// media-store handles).
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, UpstreamError>;
    async fn generate_speech(&self, text: &str, voice: Voice) -> Result<String, UpstreamError>;
    async fn submit_video(&self, prompt: &str) -> Result<VideoOperation, UpstreamError>;
    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, UpstreamError>;
    async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, UpstreamError>;
}
