use crate::session::Session;
use gs_config::StudioConfig;
use gs_gen::{
    ApiKeySlot, CancellationToken, ClassifiedError, CredentialGate, Dispatcher,
    EnvCredentialHost, ErrorCategory, GeminiClient, GeminiModels, GenerationRequest, MediaStore,
    PollPolicy,
};
use gs_quota::{
    record, snapshot, snapshot_all, GeneratedContent, Modality, PlanTable, UsageSnapshot, Voice,
};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,
    #[error(
        "Usage limit reached: {}/{} {} generations on the {} plan",
        .0.used, .0.limit, .0.modality, .0.plan
    )]
    UsageLimitReached(UsageSnapshot),
    #[error("Another generation is already running")]
    Busy,
    #[error("{0}")]
    Generation(#[from] ClassifiedError),
}

impl GenerateError {
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            GenerateError::Generation(e) => Some(e.category),
            _ => None,
        }
    }

    /// Key of the display string the presentation layer shows for this error.
    pub fn message_key(&self) -> &'static str {
        match self {
            GenerateError::EmptyPrompt => "promptPlaceholder",
            GenerateError::UsageLimitReached(_) => "usageLimitReached",
            GenerateError::Busy => "errorBusy",
            GenerateError::Generation(e) => e.category.message_key(),
        }
    }
}

/// Outcome of a successful generation: the content plus the session that
/// replaces the caller's.
#[derive(Debug, Clone)]
pub struct Generation {
    pub content: GeneratedContent,
    pub session: Session,
}

/// Orchestration entry point: quota gate, dispatch, then record.
pub struct Studio {
    plans: PlanTable,
    dispatcher: Dispatcher,
    in_flight: Mutex<()>,
}

impl Studio {
    pub fn new(plans: PlanTable, dispatcher: Dispatcher) -> Self {
        Self {
            plans,
            dispatcher,
            in_flight: Mutex::new(()),
        }
    }

    /// Wires the Gemini client, the environment credential host and the
    /// polling policy from `config`.
    pub fn from_config(config: &StudioConfig, interactive: bool) -> anyhow::Result<Self> {
        let g = &config.generation;
        let slot = ApiKeySlot::default();
        let media = MediaStore::new();
        let host = EnvCredentialHost::new(slot.clone(), g.api_key_env.clone(), interactive);
        let client = GeminiClient::new(
            g.api_base_url.clone(),
            GeminiModels {
                image: g.image_model.clone(),
                speech: g.speech_model.clone(),
                video: g.video_model.clone(),
            },
            slot,
            media.clone(),
            g.request_timeout(),
        )?;
        let policy = PollPolicy {
            interval: g.poll_interval(),
            max_attempts: g.max_poll_attempts(),
            deadline: g.poll_deadline(),
        };
        let dispatcher = Dispatcher::new(
            CredentialGate::new(Arc::new(host)),
            Arc::new(client),
            media,
            policy,
        );
        Ok(Self::new(config.plans.clone(), dispatcher))
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    pub fn media(&self) -> &MediaStore {
        self.dispatcher.media()
    }

    pub fn usage(&self, session: &Session) -> Vec<UsageSnapshot> {
        snapshot_all(&self.plans, session.user())
    }

    pub async fn generate(
        &self,
        session: &Session,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Generation, GenerateError> {
        let _guard = self.in_flight.try_lock().map_err(|_| GenerateError::Busy)?;

        if request.is_blank() {
            return Err(GenerateError::EmptyPrompt);
        }

        self.check_quota(session, request.modality())?;

        let content = self.dispatcher.dispatch(&request, cancel).await?;
        let session = Session::from_user(record(session.user().cloned(), content.clone()));
        Ok(Generation { content, session })
    }

    /// Speaks a snippet of `text`. Gated on the audio quota like a full
    /// generation, but never recorded.
    pub async fn preview_voice(
        &self,
        session: &Session,
        text: &str,
        voice: Voice,
    ) -> Result<String, GenerateError> {
        let _guard = self.in_flight.try_lock().map_err(|_| GenerateError::Busy)?;
        if text.trim().is_empty() {
            return Err(GenerateError::EmptyPrompt);
        }
        self.check_quota(session, Modality::Audio)?;
        Ok(self.dispatcher.preview_voice(text, voice).await?)
    }

    fn check_quota(&self, session: &Session, modality: Modality) -> Result<(), GenerateError> {
        let usage = snapshot(&self.plans, session.user(), modality);
        if usage.is_limit_reached {
            tracing::info!(
                modality = %usage.modality,
                plan = %usage.plan,
                "Usage limit reached; not dispatching"
            );
            return Err(GenerateError::UsageLimitReached(usage));
        }
        Ok(())
    }
}
