//! Contact form submission state machine.
//!
//! ```text
//! Idle → CheckingBot → CheckingRateLimit → Validating → Submitting → Success
//!          │                 │                 │                   ↘ Error
//!          ↓ (honeypot)      ↓ (blocked)       ↓ (invalid)
//!        Idle              Error             Idle
//! ```
//!
//! `Success` and `Error` are display states: they revert to `Idle` once the
//! status delay has elapsed. The revert is computed lazily from the clock
//! whenever the phase is read, so no timer task is needed.

use crate::application::limiter::{RateLimitDecision, RateLimiter};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, SubmitError, Submitter};
use crate::domain::honeypot::{create_honeypot, is_bot, HoneypotField};
use crate::domain::submission::{Field, Submission};
use crate::domain::validation::{ContactFormValidator, FieldError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

/// Rate-limit key used when none is configured.
pub const DEFAULT_FORM_KEY: &str = "contact-form";
/// How long `Success`/`Error` stay visible.
pub const DEFAULT_STATUS_RESET: Duration = Duration::from_secs(5);

/// Where the form is in its submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    CheckingBot,
    CheckingRateLimit,
    Validating,
    Submitting,
    Success,
    Error,
}

impl FormPhase {
    /// Whether a submission is between its start and its outcome.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            FormPhase::CheckingBot
                | FormPhase::CheckingRateLimit
                | FormPhase::Validating
                | FormPhase::Submitting
        )
    }
}

/// Errors shown next to the form.
///
/// Field errors and the general channel are independent: the general channel
/// only carries rate-limit rejections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub fields: BTreeMap<Field, FieldError>,
    pub general: Option<String>,
}

impl FormErrors {
    /// Whether nothing is reported.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    /// Error for one field.
    pub fn field(&self, field: Field) -> Option<FieldError> {
        self.fields.get(&field).copied()
    }

    /// User-facing message for one field.
    pub fn message(&self, field: Field) -> Option<String> {
        self.field(field)
            .map(|error| format!("{} {}", field.label(), error))
    }
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another submission from this form is still in flight
    Busy,
    /// The honeypot was filled; dropped without feedback
    BotDiscarded,
    /// The rate limiter rejected the attempt
    RateLimited {
        /// Message placed on the general error channel
        message: String,
    },
    /// At least one field failed validation
    Invalid(FormErrors),
    /// The submitter accepted the submission
    Submitted,
    /// The submitter failed
    Failed(SubmitError),
}

#[derive(Debug)]
struct FormState {
    phase: FormPhase,
    status_since: Option<SystemTime>,
    draft: Submission,
    errors: FormErrors,
}

impl FormState {
    fn revert_if_due(&mut self, now: SystemTime, delay: Duration) {
        if let Some(since) = self.status_since {
            let elapsed = now.duration_since(since).unwrap_or(Duration::ZERO);
            if elapsed >= delay {
                self.phase = FormPhase::Idle;
                self.status_since = None;
            }
        }
    }

    fn show_status(&mut self, phase: FormPhase, now: SystemTime) {
        self.phase = phase;
        self.status_since = Some(now);
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
///
/// A submission dropped mid-flight leaves no intermediate phase behind: any
/// checking or submitting phase falls back to `Idle`.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    state: &'a Mutex<FormState>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a Mutex<FormState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { flag, state })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.phase.is_in_progress() {
            state.phase = FormPhase::Idle;
            state.status_since = None;
        }
        drop(state);
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives one contact form: holds the draft, runs the guard checks in order
/// and hands accepted submissions to the `Submitter`.
#[derive(Debug)]
pub struct FormController<U> {
    limiter: RateLimiter,
    validator: ContactFormValidator,
    submitter: U,
    clock: Arc<dyn Clock>,
    form_key: String,
    status_reset: Duration,
    state: Mutex<FormState>,
    submitting: AtomicBool,
    metrics: Metrics,
}

impl<U: Submitter> FormController<U> {
    /// Wire a controller from its parts.
    ///
    /// The controller reports into the limiter's metrics tracker.
    pub fn new(
        limiter: RateLimiter,
        validator: ContactFormValidator,
        submitter: U,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics = limiter.metrics().clone();
        Self {
            limiter,
            validator,
            submitter,
            clock,
            form_key: DEFAULT_FORM_KEY.to_string(),
            status_reset: DEFAULT_STATUS_RESET,
            state: Mutex::new(FormState {
                phase: FormPhase::Idle,
                status_since: None,
                draft: Submission::default(),
                errors: FormErrors::default(),
            }),
            submitting: AtomicBool::new(false),
            metrics,
        }
    }

    /// Use a different rate-limit key.
    pub fn with_form_key(mut self, form_key: impl Into<String>) -> Self {
        self.form_key = form_key.into();
        self
    }

    /// Change how long `Success`/`Error` stay visible.
    pub fn with_status_reset(mut self, delay: Duration) -> Self {
        self.status_reset = delay;
        self
    }

    /// Run the guard checks on the current draft and submit it.
    pub async fn submit(&self) -> SubmitOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.submitting, &self.state) else {
            tracing::debug!(form = %self.form_key, "submission already in flight");
            return SubmitOutcome::Busy;
        };

        let draft = {
            let mut state = self.lock_state();
            state.status_since = None;
            state.phase = FormPhase::CheckingBot;
            state.draft.clone()
        };

        if is_bot(&draft.honeypot) {
            tracing::warn!(form = %self.form_key, "honeypot filled, discarding submission");
            self.metrics.record_bot_trapped();
            self.set_phase(FormPhase::Idle);
            return SubmitOutcome::BotDiscarded;
        }

        self.set_phase(FormPhase::CheckingRateLimit);
        if let RateLimitDecision::Blocked {
            message,
            remaining_minutes,
        } = self.limiter.check(&self.form_key)
        {
            tracing::info!(form = %self.form_key, remaining_minutes, "submission rate limited");
            self.metrics.record_rate_limited();
            let mut state = self.lock_state();
            state.errors.general = Some(message.clone());
            state.show_status(FormPhase::Error, self.clock.now());
            return SubmitOutcome::RateLimited { message };
        }

        self.set_phase(FormPhase::Validating);
        let result = self.validator.validate(&draft);
        if !result.is_valid() {
            tracing::debug!(form = %self.form_key, fields = ?result.errors.keys().collect::<Vec<_>>(), "validation failed");
            self.metrics.record_validation_failure();
            let errors = FormErrors {
                fields: result.errors,
                general: None,
            };
            let mut state = self.lock_state();
            state.errors = errors.clone();
            state.phase = FormPhase::Idle;
            return SubmitOutcome::Invalid(errors);
        }

        {
            let mut state = self.lock_state();
            state.errors.general = None;
            state.phase = FormPhase::Submitting;
        }

        match self.submitter.submit(&result.sanitized).await {
            Ok(()) => {
                tracing::info!(form = %self.form_key, "submission delivered");
                self.metrics.record_submission_accepted();
                let mut state = self.lock_state();
                state.draft.clear();
                state.errors = FormErrors::default();
                state.show_status(FormPhase::Success, self.clock.now());
                SubmitOutcome::Submitted
            }
            Err(error) => {
                tracing::warn!(form = %self.form_key, error = %error, "submission failed");
                self.metrics.record_submission_failed();
                self.lock_state()
                    .show_status(FormPhase::Error, self.clock.now());
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// Current phase, with any due `Success`/`Error` revert applied.
    pub fn phase(&self) -> FormPhase {
        let mut state = self.lock_state();
        state.revert_if_due(self.clock.now(), self.status_reset);
        state.phase
    }

    /// Whether a submission is in flight (the submit control is disabled).
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Update one field of the draft and clear that field's error.
    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        let mut state = self.lock_state();
        state.draft.set(field, value);
        state.errors.fields.remove(&field);
    }

    /// Update the honeypot value of the draft.
    pub fn set_honeypot(&self, value: impl Into<String>) {
        self.lock_state().draft.honeypot = value.into();
    }

    /// Replace the whole draft.
    pub fn fill(&self, submission: Submission) {
        self.lock_state().draft = submission;
    }

    /// Copy of the current draft.
    pub fn draft(&self) -> Submission {
        self.lock_state().draft.clone()
    }

    /// Errors currently shown.
    pub fn errors(&self) -> FormErrors {
        self.lock_state().errors.clone()
    }

    /// Decoy field to render alongside the form.
    pub fn honeypot(&self) -> HoneypotField {
        create_honeypot()
    }

    /// Forget this form's recorded attempts.
    pub fn reset_rate_limit(&self) {
        self.limiter.reset(&self.form_key);
    }

    /// Rate-limit key of this form.
    pub fn form_key(&self) -> &str {
        &self.form_key
    }

    /// Get a reference to the rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Get a reference to the validator.
    pub fn validator(&self) -> &ContactFormValidator {
        &self.validator
    }

    /// Get a reference to the submitter.
    pub fn submitter(&self) -> &U {
        &self.submitter
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn set_phase(&self, phase: FormPhase) {
        tracing::debug!(form = %self.form_key, phase = ?phase, "form phase changed");
        self.lock_state().phase = phase;
    }

    fn lock_state(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::RateLimitConfig;
    use crate::infrastructure::mocks::{MockClock, RecordingSubmitter, UnavailableStore};
    use crate::infrastructure::storage::MemoryStore;
    use crate::application::ports::KeyValueStore;
    use std::time::UNIX_EPOCH;

    fn controller_with(
        store: Arc<dyn KeyValueStore>,
        submitter: RecordingSubmitter,
        limit: u32,
    ) -> (FormController<RecordingSubmitter>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000)));
        let limiter = RateLimiter::new(
            store,
            clock.clone(),
            RateLimitConfig::minutes(limit, 15).unwrap(),
        );
        let controller = FormController::new(
            limiter,
            ContactFormValidator::default(),
            submitter,
            clock.clone(),
        );
        (controller, clock)
    }

    fn controller(limit: u32) -> (FormController<RecordingSubmitter>, Arc<MockClock>) {
        controller_with(Arc::new(MemoryStore::new()), RecordingSubmitter::succeeding(), limit)
    }

    fn valid_draft() -> Submission {
        Submission::new(
            "Carlos Ruiz",
            "Carlos@Example.com",
            "Custom parts",
            "Please send a quote for 40 machined flanges.",
        )
    }

    #[tokio::test]
    async fn test_successful_submission_clears_form() {
        let (controller, _clock) = controller(3);
        controller.fill(valid_draft());

        assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
        assert_eq!(controller.phase(), FormPhase::Success);
        assert_eq!(controller.draft(), Submission::default());
        assert!(controller.errors().is_empty());

        let delivered = controller.submitter().last().unwrap();
        assert_eq!(delivered.email, "carlos@example.com");
        assert_eq!(controller.metrics().submissions_accepted(), 1);
    }

    #[tokio::test]
    async fn test_status_reverts_after_delay() {
        let (controller, clock) = controller(3);
        controller.fill(valid_draft());
        controller.submit().await;

        clock.advance(Duration::from_millis(4_999));
        assert_eq!(controller.phase(), FormPhase::Success);

        clock.advance(Duration::from_millis(1));
        assert_eq!(controller.phase(), FormPhase::Idle);
    }

    #[tokio::test]
    async fn test_honeypot_discards_silently() {
        let (controller, _clock) = controller(1);
        controller.fill(valid_draft().with_honeypot("http://spam.example"));

        assert_eq!(controller.submit().await, SubmitOutcome::BotDiscarded);
        assert_eq!(controller.phase(), FormPhase::Idle);
        assert!(controller.errors().is_empty());
        assert_eq!(controller.submitter().calls(), 0);

        // no attempt consumed: a human can still submit once
        controller.set_honeypot("");
        assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
    }

    #[tokio::test]
    async fn test_rate_limited_sets_general_error() {
        let (controller, _clock) = controller(1);

        controller.fill(valid_draft());
        assert_eq!(controller.submit().await, SubmitOutcome::Submitted);

        controller.fill(valid_draft());
        let outcome = controller.submit().await;
        let SubmitOutcome::RateLimited { message } = outcome else {
            panic!("expected RateLimited, got {:?}", outcome);
        };
        assert_eq!(message, "Too many attempts. Please wait 15 minute(s).");
        assert_eq!(controller.phase(), FormPhase::Error);
        assert_eq!(controller.errors().general.as_deref(), Some(message.as_str()));
        assert!(controller.errors().fields.is_empty());
        assert_eq!(controller.submitter().calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_fields_stay_idle() {
        let (controller, _clock) = controller(3);
        controller.fill(Submission::new("Jo", "jo@x.com", "Hi there", "short"));

        let SubmitOutcome::Invalid(errors) = controller.submit().await else {
            panic!("expected Invalid");
        };
        assert_eq!(errors.fields.len(), 1);
        assert!(errors.field(Field::Message).is_some());
        assert_eq!(controller.phase(), FormPhase::Idle);
        assert_eq!(controller.errors(), errors);
        assert_eq!(controller.submitter().calls(), 0);
    }

    #[tokio::test]
    async fn test_typing_clears_field_error() {
        let (controller, _clock) = controller(3);
        controller.fill(Submission::new("J", "bad", "Hi there", "Long enough message"));
        controller.submit().await;
        assert!(controller.errors().field(Field::Name).is_some());
        assert!(controller.errors().field(Field::Email).is_some());

        controller.set_field(Field::Name, "Jose");
        let errors = controller.errors();
        assert!(errors.field(Field::Name).is_none());
        assert!(errors.field(Field::Email).is_some());
        assert_eq!(controller.draft().name, "Jose");
    }

    #[tokio::test]
    async fn test_submitter_failure_sets_error() {
        let (controller, clock) = controller_with(
            Arc::new(MemoryStore::new()),
            RecordingSubmitter::failing("relay down"),
            3,
        );
        controller.fill(valid_draft());

        let outcome = controller.submit().await;
        assert_eq!(outcome, SubmitOutcome::Failed(SubmitError::new("relay down")));
        assert_eq!(controller.phase(), FormPhase::Error);
        // the draft is kept so the user can retry
        assert_eq!(controller.draft(), valid_draft());
        assert_eq!(controller.metrics().submissions_failed(), 1);

        clock.advance(DEFAULT_STATUS_RESET);
        assert_eq!(controller.phase(), FormPhase::Idle);
        assert!(!controller.is_submitting());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_block_submission() {
        let (controller, _clock) = controller_with(
            Arc::new(UnavailableStore::new()),
            RecordingSubmitter::succeeding(),
            1,
        );

        for _ in 0..3 {
            controller.fill(valid_draft());
            assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
        }
        assert_eq!(controller.metrics().storage_failures(), 3);
    }

    #[tokio::test]
    async fn test_reset_rate_limit() {
        let (controller, _clock) = controller(1);
        controller.fill(valid_draft());
        controller.submit().await;

        controller.fill(valid_draft());
        assert!(matches!(controller.submit().await, SubmitOutcome::RateLimited { .. }));

        controller.reset_rate_limit();
        assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
    }

    #[cfg(feature = "async")]
    #[tokio::test(start_paused = true)]
    async fn test_cancelled_submission_returns_to_idle() {
        let clock = Arc::new(MockClock::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000)));
        let limiter = RateLimiter::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            RateLimitConfig::default(),
        );
        let controller = FormController::new(
            limiter,
            ContactFormValidator::default(),
            crate::infrastructure::submitter::SimulatedSubmitter::with_latency(
                Duration::from_millis(200),
            ),
            clock.clone(),
        );
        controller.fill(valid_draft());

        let result = tokio::time::timeout(Duration::from_millis(10), controller.submit()).await;
        assert!(result.is_err());

        assert!(!controller.is_submitting());
        assert_eq!(controller.phase(), FormPhase::Idle);
        // the draft survives so the user can retry
        assert_eq!(controller.draft(), valid_draft());

        clock.advance(Duration::from_secs(3600));
        assert_eq!(controller.phase(), FormPhase::Idle);
        assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
    }

    #[test]
    fn test_in_progress_phases() {
        assert!(FormPhase::Submitting.is_in_progress());
        assert!(FormPhase::CheckingBot.is_in_progress());
        assert!(!FormPhase::Idle.is_in_progress());
        assert!(!FormPhase::Success.is_in_progress());
        assert!(!FormPhase::Error.is_in_progress());
    }
}
