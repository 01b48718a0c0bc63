//! End-to-end submission flow through a built `FormController`.

use form_guard::infrastructure::mocks::{MockCaptureLayer, MockClock, RecordingSubmitter};
use form_guard::{
    Field, FieldError, FormController, FormPhase, GuardConfig, KeyValueStore, MemoryStore,
    SimulatedSubmitter, SubmitOutcome, Submission,
};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000)))
}

fn filled() -> Submission {
    Submission::new(
        "  Mei <b>Tanaka</b> ",
        "Mei.Tanaka@Example.org ",
        "Workshop booking",
        "We would like to book the <i>spring</i> workshop for six people.",
    )
}

#[tokio::test]
async fn test_submitter_receives_sanitized_copy() {
    let submitter = RecordingSubmitter::succeeding();
    let form = FormController::builder()
        .with_clock(clock())
        .build(submitter.clone())
        .unwrap();

    form.fill(filled());
    // trailing space fails the email pattern
    let SubmitOutcome::Invalid(errors) = form.submit().await else {
        panic!("expected the untrimmed email to be rejected");
    };
    assert_eq!(errors.field(Field::Email), Some(FieldError::InvalidEmail));

    form.set_field(Field::Email, "Mei.Tanaka@Example.org");
    assert!(form.errors().is_empty());
    assert_eq!(form.submit().await, SubmitOutcome::Submitted);

    let delivered = submitter.last().unwrap();
    assert_eq!(delivered.name, "Mei Tanaka");
    assert_eq!(delivered.email, "mei.tanaka@example.org");
    assert_eq!(
        delivered.message,
        "We would like to book the spring workshop for six people."
    );
}

#[tokio::test]
async fn test_invalid_submissions_consume_attempts() {
    let form = FormController::builder()
        .with_clock(clock())
        .with_rate_limit(2, Duration::from_secs(15 * 60))
        .build(RecordingSubmitter::succeeding())
        .unwrap();

    form.fill(Submission::new("Jo", "jo@x.com", "Hi there", "short"));
    assert!(matches!(form.submit().await, SubmitOutcome::Invalid(_)));
    assert!(matches!(form.submit().await, SubmitOutcome::Invalid(_)));

    let outcome = form.submit().await;
    assert!(matches!(outcome, SubmitOutcome::RateLimited { .. }));
    // field errors from the earlier attempt remain; the rejection goes to the general channel
    let errors = form.errors();
    assert!(errors.field(Field::Message).is_some());
    assert_eq!(
        errors.general.as_deref(),
        Some("Too many attempts. Please wait 15 minute(s).")
    );
}

#[tokio::test]
async fn test_rate_limit_shared_through_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let clock = clock();

    let build = || {
        FormController::builder()
            .with_clock(clock.clone())
            .with_store(store.clone())
            .with_rate_limit(1, Duration::from_secs(60))
            .build(RecordingSubmitter::succeeding())
            .unwrap()
    };
    let first_tab = build();
    let second_tab = build();

    first_tab.fill(filled());
    first_tab.set_field(Field::Email, "mei@example.org");
    assert_eq!(first_tab.submit().await, SubmitOutcome::Submitted);

    // the rate limit is checked before the fields are validated
    second_tab.fill(filled());
    assert!(matches!(
        second_tab.submit().await,
        SubmitOutcome::RateLimited { .. }
    ));
    assert!(store.get("ratelimit_contact-form").unwrap().is_some());

    clock.advance(Duration::from_secs(60));
    second_tab.set_field(Field::Email, "mei@example.org");
    assert_eq!(second_tab.submit().await, SubmitOutcome::Submitted);
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_in_flight_is_busy() {
    let form = FormController::builder()
        .with_clock(clock())
        .build(SimulatedSubmitter::new())
        .unwrap();
    form.fill(Submission::new(
        "Rui Costa",
        "rui@example.pt",
        "Opening hours",
        "Are you open on public holidays?",
    ));

    let (first, observed, second) = tokio::join!(form.submit(), async {
        (form.is_submitting(), form.phase())
    }, form.submit());

    assert_eq!(first, SubmitOutcome::Submitted);
    assert_eq!(observed, (true, FormPhase::Submitting));
    assert_eq!(second, SubmitOutcome::Busy);
    assert!(!form.is_submitting());
    assert_eq!(form.metrics().submissions_accepted(), 1);
}

#[tokio::test]
async fn test_honeypot_trip_logged_and_counted() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let submitter = RecordingSubmitter::succeeding();
    let form = FormController::builder()
        .with_clock(clock())
        .build(submitter.clone())
        .unwrap();
    form.fill(filled().with_honeypot("https://cheap-links.example"));

    assert_eq!(form.submit().await, SubmitOutcome::BotDiscarded);
    assert_eq!(form.phase(), FormPhase::Idle);
    assert_eq!(submitter.calls(), 0);
    assert_eq!(form.metrics().bots_trapped(), 1);
    assert_eq!(form.limiter().attempts_in_window("contact-form").unwrap(), 0);

    let warnings = capture.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "honeypot filled, discarding submission");
}

#[tokio::test]
async fn test_failed_submission_logged_and_reverts() {
    let capture = MockCaptureLayer::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let clock = clock();
    let form = FormController::builder()
        .with_clock(clock.clone())
        .with_status_reset(Duration::from_secs(2))
        .build(RecordingSubmitter::failing("smtp relay timed out"))
        .unwrap();
    form.fill(Submission::new(
        "Rui Costa",
        "rui@example.pt",
        "Opening hours",
        "Are you open on public holidays?",
    ));

    let outcome = form.submit().await;
    let SubmitOutcome::Failed(error) = outcome else {
        panic!("expected Failed, got {:?}", outcome);
    };
    assert_eq!(error.reason(), "smtp relay timed out");
    assert_eq!(form.phase(), FormPhase::Error);
    assert!(form.errors().general.is_none());

    let warnings = capture.at_level(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].field("error"),
        Some("submission failed: smtp relay timed out")
    );

    clock.advance(Duration::from_secs(2));
    assert_eq!(form.phase(), FormPhase::Idle);
}

#[tokio::test]
async fn test_config_driven_controller() {
    let config = GuardConfig::from_json(
        r#"{
            "form_key": "support",
            "fields": { "max_urls": 0 },
            "rules": { "suspicious_keywords": ["crypto giveaway"] }
        }"#,
    )
    .unwrap();
    let form = FormController::builder()
        .with_clock(clock())
        .with_config(&config)
        .build(RecordingSubmitter::succeeding())
        .unwrap();

    form.fill(Submission::new(
        "Rui Costa",
        "rui@example.pt",
        "Docs link",
        "The page at https://example.pt/help is broken.",
    ));
    let SubmitOutcome::Invalid(errors) = form.submit().await else {
        panic!("expected Invalid");
    };
    assert_eq!(errors.field(Field::Message), Some(FieldError::TooManyLinks));

    form.set_field(Field::Message, "Join our CRYPTO GIVEAWAY today, friends");
    let SubmitOutcome::Invalid(errors) = form.submit().await else {
        panic!("expected Invalid");
    };
    assert_eq!(errors.field(Field::Message), Some(FieldError::SuspiciousContent));

    // built-in keywords were replaced, not extended
    form.set_field(Field::Message, "You are a winner of our customer survey");
    assert_eq!(form.submit().await, SubmitOutcome::Submitted);
    assert_eq!(form.limiter().attempts_in_window("support").unwrap(), 3);
}

#[tokio::test]
async fn test_json_boundary_tolerates_non_strings() {
    let form = FormController::builder()
        .with_clock(clock())
        .build(RecordingSubmitter::succeeding())
        .unwrap();

    let submission = Submission::from_json(
        r#"{ "name": 42, "email": null, "subject": ["a"], "message": {"x": 1}, "website": false }"#,
    )
    .unwrap();
    assert_eq!(submission, Submission::default());
    form.fill(submission);

    let SubmitOutcome::Invalid(errors) = form.submit().await else {
        panic!("expected Invalid");
    };
    assert_eq!(errors.fields.len(), 4);
    assert_eq!(
        errors.message(Field::Name).as_deref(),
        Some("Name must be between 2 and 100 characters")
    );
}
