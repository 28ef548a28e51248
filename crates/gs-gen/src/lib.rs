pub mod classify;
pub mod credential;
pub mod dispatcher;
pub mod gemini;
pub mod media;
pub mod service;

pub use classify::{classify, classify_message, ClassifiedError, ErrorCategory};
pub use credential::{
    ApiKeySlot, CredentialGate, CredentialHost, CredentialUnavailable, EnvCredentialHost,
    StaticCredentialHost,
};
pub use dispatcher::{Dispatcher, GenerationRequest, PollPolicy};
pub use gemini::{GeminiClient, GeminiModels};
pub use media::{MediaBlob, MediaError, MediaStore};
pub use service::{GenerationService, UpstreamError, VideoOperation};

pub use tokio_util::sync::CancellationToken;
