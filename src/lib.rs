//! # form-guard
//!
//! Input sanitization, attack heuristics, honeypot bot detection and sliding-window
//! rate limiting for public contact forms.
//!
//! A submission goes through four gates, in this order:
//!
//! 1. **Honeypot**: a hidden decoy field that only automated fillers complete.
//!    Bot submissions are dropped silently.
//! 2. **Rate limit**: at most N attempts per key in a sliding window
//!    (3 per 15 minutes by default), persisted in a key-value store.
//! 3. **Validation**: length and email checks on each field, plus XSS,
//!    link-spam and suspicious-keyword heuristics on the raw text.
//! 4. **Submission**: the sanitized copy is handed to a `Submitter`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use form_guard::{Field, FormController, SimulatedSubmitter, SubmitOutcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let form = FormController::builder()
//!         .build(SimulatedSubmitter::new())
//!         .unwrap();
//!
//!     form.set_field(Field::Name, "Ana Lima");
//!     form.set_field(Field::Email, "ana@example.com");
//!     form.set_field(Field::Subject, "Quote request");
//!     form.set_field(Field::Message, "Could you send pricing for 200 units?");
//!
//!     match form.submit().await {
//!         SubmitOutcome::Submitted => println!("sent"),
//!         SubmitOutcome::Invalid(errors) => {
//!             for field in Field::ALL {
//!                 if let Some(message) = errors.message(field) {
//!                     println!("{}", message);
//!                 }
//!             }
//!         }
//!         SubmitOutcome::RateLimited { message } => println!("{}", message),
//!         other => println!("{:?}", other),
//!     }
//! }
//! ```
//!
//! ## Standalone Checks
//!
//! Every rule is also usable on its own:
//!
//! ```rust
//! use form_guard::{detect_xss, escape_html, is_bot, sanitize_input, validate_email};
//!
//! assert_eq!(sanitize_input("<b>Hi</b>"), "Hi");
//! assert_eq!(escape_html("<a href='x'>"), "&lt;a href=&#039;x&#039;&gt;");
//! assert!(validate_email("a@b.co"));
//! assert!(detect_xss("<img src=x onerror=alert(1)>"));
//! assert!(is_bot("http://spam.example"));
//! ```
//!
//! ```rust
//! use form_guard::{validate_contact_form, Field, Submission};
//!
//! let result = validate_contact_form(&Submission::new(
//!     "Jo",
//!     "jo@x.com",
//!     "Hi there",
//!     "Check http://a.com http://b.com http://c.com now",
//! ));
//!
//! assert!(!result.is_valid());
//! assert_eq!(
//!     result.message(Field::Message).as_deref(),
//!     Some("Message contains too many links")
//! );
//! ```
//!
//! ## Rate Limiting
//!
//! Attempt records are JSON arrays of millisecond timestamps stored under
//! `ratelimit_<key>`. Expired entries are dropped lazily on every check;
//! blocked attempts are never recorded.
//!
//! ### Fail-Open Behavior
//!
//! If the store cannot be read or written (disabled, full, unreachable) the
//! attempt is **allowed** and a warning is logged. Infrastructure problems never
//! lock real users out of the form.
//!
//! ### Concurrent Writers
//!
//! The default `UpdateMode::ReadModifyWrite` does a plain read, filter, append,
//! write. Two callers that read before either writes can both get through at the
//! limit. Stores with `compare_and_set` (the in-memory and Redis stores) can use
//! `UpdateMode::CompareAndSwap` instead, which never over-admits.
//!
//! ## Observability
//!
//! Diagnostics go through `tracing`. Counters are available from
//! [`Metrics`](application::metrics::Metrics):
//!
//! ```rust,no_run
//! # use form_guard::{FormController, SimulatedSubmitter};
//! # let form = FormController::builder().build(SimulatedSubmitter::new()).unwrap();
//! let snapshot = form.metrics().snapshot();
//! println!("accepted: {}", snapshot.submissions_accepted);
//! println!("bots trapped: {}", snapshot.bots_trapped);
//! println!("rate limited: {}", snapshot.rate_limited);
//! println!("block rate: {:.1}%", snapshot.block_rate() * 100.0);
//! ```
//!
//! ## Configuration
//!
//! [`GuardConfig`] captures every setting, including the heuristic tables, and
//! deserializes from JSON with defaults for anything left out:
//!
//! ```rust
//! use form_guard::{FormController, GuardConfig, SimulatedSubmitter};
//!
//! let config = GuardConfig::from_json(r#"{ "rate_limit": { "limit": 5, "window_minutes": 60 } }"#)
//!     .unwrap();
//! let form = FormController::builder()
//!     .with_config(&config)
//!     .build(SimulatedSubmitter::new())
//!     .unwrap();
//! assert_eq!(form.limiter().config().limit(), 5);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    attempts::AttemptLog,
    heuristics::{
        detect_spam, detect_suspicious_content, detect_xss, HeuristicConfig, HeuristicRules,
        PatternSpec, RuleError,
    },
    honeypot::{create_honeypot, is_bot, HoneypotField},
    policy::{ConfigError, RateLimitConfig},
    sanitizer::{escape_html, sanitize_html, sanitize_input},
    submission::{Field, SanitizedSubmission, Submission},
    validation::{
        validate_contact_form, ContactFormValidator, FieldError, FieldRules, LengthBounds,
        ValidationResult,
    },
    validators::{validate_email, validate_length},
};

pub use application::{
    form::{FormController, FormErrors, FormPhase, SubmitOutcome},
    limiter::{RateLimitDecision, RateLimiter, UpdateMode},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, KeyValueStore, StoreError, SubmitError, Submitter},
};

pub use infrastructure::{
    clock::SystemClock,
    guard::{BuildError, FormGuardBuilder, GuardConfig},
    storage::MemoryStore,
};

#[cfg(feature = "async")]
pub use infrastructure::submitter::SimulatedSubmitter;

#[cfg(feature = "redis-storage")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};
