use async_trait::async_trait;
use genstudio::{GenerateError, Session, Studio};
use gs_gen::{
    ApiKeySlot, CancellationToken, CredentialGate, Dispatcher, ErrorCategory, GenerationRequest,
    GenerationService, MediaStore, PollPolicy, StaticCredentialHost, UpstreamError,
    VideoOperation,
};
use gs_quota::{Modality, PlanTable, UsageCounters, User, Voice};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Succeeds everywhere; video jobs finish after `video_polls` polls.
#[derive(Default)]
struct CountingService {
    calls: AtomicUsize,
    polls: AtomicUsize,
    video_polls: usize,
}

impl CountingService {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for CountingService {
    async fn generate_image(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("data:image/png;base64,{}", prompt.len()))
    }

    async fn generate_speech(&self, text: &str, voice: Voice) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("speech:{voice}:{}", text.len()))
    }

    async fn submit_video(&self, _prompt: &str) -> Result<VideoOperation, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(VideoOperation::pending("operations/v"))
    }

    async fn poll_video(&self, op: &VideoOperation) -> Result<VideoOperation, UpstreamError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let done = n >= self.video_polls;
        Ok(VideoOperation {
            name: op.name.clone(),
            done,
            video_uri: done.then(|| "https://files.example/v.mp4".to_string()),
        })
    }

    async fn fetch_video(&self, _uri: &str) -> Result<Vec<u8>, UpstreamError> {
        Ok(vec![1, 2, 3])
    }
}

fn studio(credential: bool, service: Arc<CountingService>) -> Studio {
    let key = credential.then(|| "test-key".to_string());
    let host = StaticCredentialHost::new(ApiKeySlot::default(), key);
    let dispatcher = Dispatcher::new(
        CredentialGate::new(Arc::new(host)),
        service,
        MediaStore::new(),
        PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts: Some(10),
            deadline: None,
        },
    );
    Studio::new(PlanTable::default(), dispatcher)
}

fn signed_in(usage: UsageCounters) -> Session {
    let mut user = User::new("Lee", "lee@example.com");
    user.usage = usage;
    Session::SignedIn(user)
}

fn image(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(Modality::Image, prompt, None)
}

#[tokio::test]
async fn exhausted_quota_never_reaches_dispatcher() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());
    let session = signed_in(UsageCounters {
        image: 3,
        ..Default::default()
    });

    let err = studio
        .generate(&session, image("cat"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        GenerateError::UsageLimitReached(snap) => {
            assert!(snap.is_limit_reached);
            assert_eq!(snap.plan, "Free");
            assert_eq!(snap.limit, 3);
        }
        other => panic!("expected usage limit, got {other:?}"),
    }
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn signed_in_success_records_history_and_usage() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());
    let session = signed_in(UsageCounters::default());

    let first = studio
        .generate(&session, image("one"), &CancellationToken::new())
        .await
        .unwrap();
    let second = studio
        .generate(
            &first.session,
            GenerationRequest::new(Modality::Audio, "two", Some(Voice::Charon)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let user = second.session.user().unwrap();
    assert_eq!(user.usage.image, 1);
    assert_eq!(user.usage.audio, 1);
    assert_eq!(user.usage.video, 0);
    assert_eq!(user.history, vec![second.content.clone(), first.content.clone()]);
    // caller's original session is untouched
    assert_eq!(session.user().unwrap().history.len(), 0);
}

#[tokio::test]
async fn anonymous_success_is_not_recorded() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());

    let generation = studio
        .generate(&Session::Anonymous, image("fox"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(generation.session, Session::Anonymous);
    assert_eq!(generation.content.modality(), Modality::Image);

    let usage = studio.usage(&generation.session);
    assert!(usage.iter().all(|s| s.plan == "Free" && s.used == 0));
}

#[tokio::test]
async fn blank_prompt_is_rejected_before_dispatch() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());
    let err = studio
        .generate(&Session::Anonymous, image("   "), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::EmptyPrompt));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn missing_credential_surfaces_login_required() {
    let service = Arc::new(CountingService::default());
    let studio = studio(false, service.clone());
    let err = studio
        .generate(&Session::Anonymous, image("x"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::LoginRequired));
    assert_eq!(err.message_key(), "loginRequired");
    assert_eq!(service.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_generation_while_busy_fails_fast() {
    let service = Arc::new(CountingService {
        video_polls: 3,
        ..Default::default()
    });
    let studio = studio(true, service.clone());
    let session = signed_in(UsageCounters::default());
    let cancel = CancellationToken::new();

    let video = GenerationRequest::new(Modality::Video, "waves", None);
    let (first, second) = tokio::join!(studio.generate(&session, video, &cancel), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        studio.generate(&session, image("x"), &cancel).await
    });

    let first = first.unwrap();
    assert_eq!(first.session.user().unwrap().usage.video, 1);
    assert!(matches!(second, Err(GenerateError::Busy)));
    assert_eq!(service.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn preview_rejects_blank_text() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());
    let session = Session::Anonymous;
    assert!(matches!(
        studio.preview_voice(&session, " ", Voice::Kore).await,
        Err(GenerateError::EmptyPrompt)
    ));
    let url = studio.preview_voice(&session, "hello", Voice::Kore).await.unwrap();
    assert_eq!(url, "speech:Kore:8");
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn preview_respects_exhausted_audio_quota() {
    let service = Arc::new(CountingService::default());
    let studio = studio(true, service.clone());
    let session = signed_in(UsageCounters {
        audio: 3,
        ..Default::default()
    });

    let err = studio
        .preview_voice(&session, "hello", Voice::Kore)
        .await
        .unwrap_err();
    match err {
        GenerateError::UsageLimitReached(snap) => {
            assert_eq!(snap.modality, Modality::Audio);
            assert_eq!(snap.used, 3);
        }
        other => panic!("expected usage limit, got {other:?}"),
    }
    assert_eq!(service.calls(), 0);
    // previews never count against the quota or land in history
    assert!(session.user().unwrap().history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn busy_rejection_has_its_own_message_key() {
    let service = Arc::new(CountingService {
        video_polls: 1,
        ..Default::default()
    });
    let studio = studio(true, service.clone());
    let cancel = CancellationToken::new();
    let video = GenerationRequest::new(Modality::Video, "waves", None);

    let (_, preview) = tokio::join!(studio.generate(&Session::Anonymous, video, &cancel), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        studio
            .preview_voice(&Session::Anonymous, "hello", Voice::Puck)
            .await
    });
    let err = preview.unwrap_err();
    assert!(matches!(err, GenerateError::Busy));
    assert_eq!(err.message_key(), "errorBusy");
}
