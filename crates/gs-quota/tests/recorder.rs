use gs_quota::{
    record, snapshot, GeneratedContent, GeneratedMedia, Modality, PlanTable, User, Voice,
};

fn image(prompt: &str, ts: i64) -> GeneratedContent {
    GeneratedContent::with_timestamp(
        GeneratedMedia::Image {
            url: format!("data:image/png;base64,{ts}"),
        },
        prompt,
        ts,
    )
}

#[test]
fn record_increments_exactly_one_counter() {
    let user = User::new("Rita", "rita@example.com");
    let before = user.usage;

    let updated = record(Some(user), image("cat", 1)).unwrap();
    assert_eq!(updated.usage.image, before.image + 1);
    assert_eq!(updated.usage.video, before.video);
    assert_eq!(updated.usage.audio, before.audio);
}

#[test]
fn history_is_newest_first() {
    let user = User::new("Rita", "rita@example.com");
    let c1 = image("first", 1);
    let c2 = GeneratedContent::with_timestamp(
        GeneratedMedia::Audio {
            url: "blob:genstudio/a".into(),
            voice: Voice::Charon,
        },
        "second",
        2,
    );

    let user = record(Some(user), c1.clone());
    let user = record(user, c2.clone()).unwrap();

    assert_eq!(user.history, vec![c2, c1]);
    assert_eq!(user.usage.image, 1);
    assert_eq!(user.usage.audio, 1);
}

#[test]
fn anonymous_record_is_noop() {
    assert!(record(None, image("ghost", 3)).is_none());
    // the anonymous snapshot is still computed against the default plan
    let snap = snapshot(&PlanTable::default(), None, Modality::Image);
    assert_eq!(snap.plan, "Free");
    assert_eq!(snap.used, 0);
}

#[test]
fn recording_reaches_the_free_image_limit() {
    let table = PlanTable::default();
    let mut user = Some(User::new("Rita", "rita@example.com"));
    for ts in 0..3 {
        let snap = snapshot(&table, user.as_ref(), Modality::Image);
        assert!(!snap.is_limit_reached);
        user = record(user, image("loop", ts));
    }
    let snap = snapshot(&table, user.as_ref(), Modality::Image);
    assert!(snap.is_limit_reached);
    assert_eq!(snap.remaining, 0);
}
