use crate::classify::{ClassifiedError, ErrorCategory};
use crate::credential::CredentialGate;
use crate::media::MediaStore;
use crate::service::{GenerationService, UpstreamError, VideoOperation};
use gs_quota::{GeneratedContent, GeneratedMedia, Modality, Voice};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Video { prompt: String },
    Image { prompt: String },
    Speech { text: String, voice: Voice },
}

impl GenerationRequest {
    pub fn new(modality: Modality, prompt: impl Into<String>, voice: Option<Voice>) -> Self {
        let prompt = prompt.into();
        match modality {
            Modality::Video => GenerationRequest::Video { prompt },
            Modality::Image => GenerationRequest::Image { prompt },
            Modality::Audio => GenerationRequest::Speech {
                text: prompt,
                voice: voice.unwrap_or_default(),
            },
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            GenerationRequest::Video { .. } => Modality::Video,
            GenerationRequest::Image { .. } => Modality::Image,
            GenerationRequest::Speech { .. } => Modality::Audio,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::Video { prompt } | GenerationRequest::Image { prompt } => prompt,
            GenerationRequest::Speech { text, .. } => text,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.prompt().trim().is_empty()
    }
}

/// Bounds for the video polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Maximum number of re-polls after submission. `None` is unbounded.
    pub max_attempts: Option<u32>,
    /// Wall-clock budget measured from submission. `None` is unbounded.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: Some(120),
            deadline: Some(Duration::from_secs(15 * 60)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum JobError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("video job still running after {attempts} polls ({elapsed:?})")]
    TimedOut { attempts: u32, elapsed: Duration },
    #[error("video generation cancelled")]
    Cancelled,
}

impl From<JobError> for ClassifiedError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Upstream(e) => e.into(),
            e @ JobError::TimedOut { .. } => ClassifiedError::new(ErrorCategory::Timeout, e.to_string()),
            e @ JobError::Cancelled => ClassifiedError::new(ErrorCategory::Cancelled, e.to_string()),
        }
    }
}

/// Runs one generation: credential check, the modality operation, and
/// normalization of the result. It never touches session state.
pub struct Dispatcher {
    gate: CredentialGate,
    service: Arc<dyn GenerationService>,
    media: MediaStore,
    policy: PollPolicy,
}

impl Dispatcher {
    pub fn new(
        gate: CredentialGate,
        service: Arc<dyn GenerationService>,
        media: MediaStore,
        policy: PollPolicy,
    ) -> Self {
        Self {
            gate,
            service,
            media,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedContent, ClassifiedError> {
        let modality = request.modality();
        if self.gate.ensure_credential().await.is_err() {
            tracing::warn!(%modality, "Generation refused: no credential");
            return Err(ClassifiedError::login_required());
        }

        tracing::info!(%modality, "Dispatching generation");
        let started = Instant::now();
        let result = match request {
            GenerationRequest::Image { prompt } => self
                .service
                .generate_image(prompt)
                .await
                .map(|url| GeneratedMedia::Image { url })
                .map_err(ClassifiedError::from),
            GenerationRequest::Speech { text, voice } => self
                .service
                .generate_speech(text, *voice)
                .await
                .map(|url| GeneratedMedia::Audio { url, voice: *voice })
                .map_err(ClassifiedError::from),
            GenerationRequest::Video { prompt } => self
                .run_video(prompt, cancel)
                .await
                .map(|url| GeneratedMedia::Video { url })
                .map_err(ClassifiedError::from),
        };

        match result {
            Ok(media) => {
                tracing::info!(%modality, elapsed = ?started.elapsed(), "Generation completed");
                Ok(GeneratedContent::new(media, request.prompt()))
            }
            Err(err) => {
                tracing::warn!(
                    %modality,
                    category = err.category.code(),
                    "Generation failed: {}",
                    err.message
                );
                Err(err)
            }
        }
    }

    /// Speaks the first few words of `text` without producing a history entry.
    pub async fn preview_voice(&self, text: &str, voice: Voice) -> Result<String, ClassifiedError> {
        if self.gate.ensure_credential().await.is_err() {
            return Err(ClassifiedError::login_required());
        }
        let snippet = preview_snippet(text);
        tracing::debug!(%voice, "Previewing voice");
        Ok(self.service.generate_speech(&snippet, voice).await?)
    }

    async fn run_video(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, JobError> {
        let started = Instant::now();
        let mut operation = self
            .until_cancelled(cancel, self.service.submit_video(prompt))
            .await??;
        tracing::info!(operation = %operation.name, "Video job submitted");

        let deadline_at = self.policy.deadline.map(|d| started + d);
        let past_deadline = || deadline_at.is_some_and(|at| Instant::now() >= at);
        let timed_out = |attempts| JobError::TimedOut {
            attempts,
            elapsed: started.elapsed(),
        };

        let mut attempts: u32 = 0;
        while !operation.done {
            let out_of_attempts = self.policy.max_attempts.is_some_and(|max| attempts >= max);
            if out_of_attempts || past_deadline() {
                return Err(timed_out(attempts));
            }

            // Neither the wait nor the poll may run past the deadline.
            let next = Instant::now() + self.policy.interval;
            let wake = deadline_at.map_or(next, |at| next.min(at));
            self.until_cancelled(cancel, tokio::time::sleep_until(wake))
                .await?;
            if past_deadline() {
                return Err(timed_out(attempts));
            }

            attempts += 1;
            let poll = self.service.poll_video(&operation);
            let polled = match deadline_at {
                Some(at) => self
                    .until_cancelled(cancel, tokio::time::timeout_at(at, poll))
                    .await?
                    .map_err(|_| timed_out(attempts))?,
                None => self.until_cancelled(cancel, poll).await?,
            };
            operation = polled?;
            tracing::debug!(operation = %operation.name, attempts, done = operation.done, "Polled video job");
        }

        let uri = completed_uri(operation)?;
        let bytes = self
            .until_cancelled(cancel, self.service.fetch_video(&uri))
            .await??;
        Ok(self.media.insert("video/mp4", bytes).await)
    }

    async fn until_cancelled<F: std::future::Future>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, JobError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

fn completed_uri(operation: VideoOperation) -> Result<String, UpstreamError> {
    operation
        .video_uri
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| UpstreamError::MissingResult("Failed to generate video URI".to_string()))
}

fn preview_snippet(text: &str) -> String {
    let mut snippet: String = text.chars().take(PREVIEW_CHARS).collect();
    snippet.push_str("...");
    snippet
}
