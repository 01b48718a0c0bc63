//! Wiring of a `FormController` from defaults, builder calls or a config file.

use crate::application::form::{FormController, DEFAULT_FORM_KEY, DEFAULT_STATUS_RESET};
use crate::application::limiter::{RateLimiter, UpdateMode};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, KeyValueStore, Submitter};
use crate::domain::heuristics::{HeuristicConfig, HeuristicRules, RuleError};
use crate::domain::policy::{ConfigError, RateLimitConfig};
use crate::domain::validation::{ContactFormValidator, FieldRules};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::MemoryStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Error returned when building a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Rate-limit or field settings are invalid
    Config(ConfigError),
    /// A heuristic pattern failed to compile
    Rules(RuleError),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Config(e) => write!(f, "configuration error: {}", e),
            BuildError::Rules(e) => write!(f, "heuristic rules error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Config(e) => Some(e),
            BuildError::Rules(e) => Some(e),
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(e: ConfigError) -> Self {
        BuildError::Config(e)
    }
}

impl From<RuleError> for BuildError {
    fn from(e: RuleError) -> Self {
        BuildError::Rules(e)
    }
}

/// Serializable guard settings. Every field has a default, so `{}` is a
/// valid configuration.
///
/// ```
/// use form_guard::GuardConfig;
///
/// let config = GuardConfig::from_json(
///     r#"{ "form_key": "support", "rate_limit": { "limit": 5, "window_minutes": 10 } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.form_key, "support");
/// assert_eq!(config.rate_limit.limit(), 5);
/// assert_eq!(config.status_reset_secs, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Rate-limit key for the form
    pub form_key: String,
    pub rate_limit: RateLimitConfig,
    pub fields: FieldRules,
    /// Seconds `Success`/`Error` stay visible
    pub status_reset_secs: u64,
    pub rules: HeuristicConfig,
    pub update_mode: UpdateMode,
}

impl GuardConfig {
    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            form_key: DEFAULT_FORM_KEY.to_string(),
            rate_limit: RateLimitConfig::default(),
            fields: FieldRules::default(),
            status_reset_secs: DEFAULT_STATUS_RESET.as_secs(),
            rules: HeuristicConfig::default(),
            update_mode: UpdateMode::default(),
        }
    }
}

/// Builder for constructing a `FormController`.
pub struct FormGuardBuilder {
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn KeyValueStore>>,
    limit: u32,
    window: Duration,
    update_mode: UpdateMode,
    form_key: String,
    rules: Option<HeuristicConfig>,
    field_rules: FieldRules,
    status_reset: Duration,
    metrics: Option<Metrics>,
}

impl Default for FormGuardBuilder {
    fn default() -> Self {
        let rate_limit = RateLimitConfig::default();
        Self {
            clock: None,
            store: None,
            limit: rate_limit.limit(),
            window: rate_limit.window(),
            update_mode: UpdateMode::default(),
            form_key: DEFAULT_FORM_KEY.to_string(),
            rules: None,
            field_rules: FieldRules::default(),
            status_reset: DEFAULT_STATUS_RESET,
            metrics: None,
        }
    }
}

impl FormGuardBuilder {
    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Keep attempt records in `store` instead of a private `MemoryStore`.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the attempt limit and window.
    ///
    /// The values will be validated when `build()` is called.
    pub fn with_rate_limit(mut self, limit: u32, window: Duration) -> Self {
        self.limit = limit;
        self.window = window;
        self
    }

    /// Set how admitted attempts are written back.
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    /// Set the rate-limit key.
    pub fn with_form_key(mut self, form_key: impl Into<String>) -> Self {
        self.form_key = form_key.into();
        self
    }

    /// Replace the heuristic tables.
    ///
    /// Patterns are compiled when `build()` is called.
    pub fn with_rules(mut self, rules: HeuristicConfig) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Replace the per-field bounds and link limit.
    pub fn with_field_rules(mut self, field_rules: FieldRules) -> Self {
        self.field_rules = field_rules;
        self
    }

    /// Set how long `Success`/`Error` stay visible.
    pub fn with_status_reset(mut self, delay: Duration) -> Self {
        self.status_reset = delay;
        self
    }

    /// Report into a shared metrics tracker.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Apply every setting from a `GuardConfig`.
    pub fn with_config(self, config: &GuardConfig) -> Self {
        self.with_form_key(config.form_key.clone())
            .with_rate_limit(config.rate_limit.limit(), config.rate_limit.window())
            .with_update_mode(config.update_mode)
            .with_field_rules(config.fields)
            .with_rules(config.rules.clone())
            .with_status_reset(Duration::from_secs(config.status_reset_secs))
    }

    /// Build the controller around `submitter`.
    ///
    /// # Errors
    /// Returns `BuildError` if the rate limit or field bounds are invalid, or
    /// a heuristic pattern does not compile.
    pub fn build<U: Submitter>(self, submitter: U) -> Result<FormController<U>, BuildError> {
        let rate_limit = RateLimitConfig::new(self.limit, self.window)?;
        let heuristics = match &self.rules {
            Some(rules) => HeuristicRules::from_config(rules)?,
            None => HeuristicRules::default(),
        };
        let validator = ContactFormValidator::new(heuristics, self.field_rules)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let limiter = RateLimiter::new(store, clock.clone(), rate_limit)
            .with_update_mode(self.update_mode)
            .with_metrics(self.metrics.unwrap_or_default());

        tracing::debug!(
            form = %self.form_key,
            limit = rate_limit.limit(),
            window_secs = rate_limit.window().as_secs(),
            mode = ?self.update_mode,
            "form guard built"
        );

        Ok(FormController::new(limiter, validator, submitter, clock)
            .with_form_key(self.form_key)
            .with_status_reset(self.status_reset))
    }
}

impl FormController<()> {
    /// Create a builder with the default settings.
    ///
    /// The submitter type is fixed later by [`FormGuardBuilder::build`].
    pub fn builder() -> FormGuardBuilder {
        FormGuardBuilder::default()
    }
}
