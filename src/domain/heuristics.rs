//! Attack and spam heuristics.
//!
//! The rule tables are data: a list of named XSS patterns, a list of
//! suspicious keywords, and the URL pattern used for link counting. They can
//! be loaded from JSON (`HeuristicConfig`) and are compiled once into
//! `HeuristicRules`. The built-in tables are used by the free functions
//! [`detect_xss`], [`detect_spam`] and [`detect_suspicious_content`].
//!
//! All checks are best-effort. False negatives are expected; a server-side
//! validator is assumed downstream.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of links a message may contain before it counts as spam.
pub const DEFAULT_MAX_URLS: usize = 2;

/// Error returned when a rule table cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A pattern failed to compile
    InvalidPattern {
        /// Rule name
        name: String,
        /// Compiler message
        reason: String,
    },
    /// The JSON document could not be decoded
    Json(String),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidPattern { name, reason } => {
                write!(f, "invalid pattern for rule '{}': {}", name, reason)
            }
            RuleError::Json(reason) => write!(f, "invalid rule table: {}", reason),
        }
    }
}

impl std::error::Error for RuleError {}

/// A named, uncompiled pattern entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub pattern: String,
}

impl PatternSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Uncompiled heuristic tables.
///
/// Missing keys fall back to the built-in tables, so a JSON document only
/// needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Patterns matched case-insensitively against raw input
    pub xss_patterns: Vec<PatternSpec>,
    /// Phrases matched against lower-cased input
    pub suspicious_keywords: Vec<String>,
    /// Pattern whose matches are counted as links
    pub url_pattern: String,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            xss_patterns: vec![
                PatternSpec::new("script_tag", r"<script[\s\S]*?>"),
                PatternSpec::new("javascript_uri", r"javascript:"),
                PatternSpec::new("event_handler", r"on(?-u:\w)+\s*="),
                PatternSpec::new("iframe_tag", r"<iframe"),
                PatternSpec::new("object_tag", r"<object"),
                PatternSpec::new("embed_tag", r"<embed"),
                PatternSpec::new("eval_call", r"eval\("),
                PatternSpec::new("css_expression", r"expression\("),
                PatternSpec::new("vbscript_uri", r"vbscript:"),
                PatternSpec::new("html_data_uri", r"data:text/html"),
            ],
            suspicious_keywords: [
                "viagra",
                "cialis",
                "casino",
                "lottery",
                "winner",
                "congratulations",
                "claim your prize",
                "click here now",
                "limited time offer",
                "act now",
                "buy now",
            ]
            .iter()
            .map(|keyword| keyword.to_string())
            .collect(),
            url_pattern: r"https?://[^\s]+".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct PatternRule {
    name: String,
    regex: Regex,
}

/// Compiled heuristic tables.
#[derive(Debug, Clone)]
pub struct HeuristicRules {
    xss: Vec<PatternRule>,
    keywords: Vec<String>,
    url: Regex,
}

fn compile(name: &str, pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| RuleError::InvalidPattern {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

impl HeuristicRules {
    /// Compile a rule table.
    ///
    /// # Errors
    /// Returns `RuleError::InvalidPattern` naming the first rule that fails
    /// to compile.
    pub fn from_config(config: &HeuristicConfig) -> Result<Self, RuleError> {
        let xss = config
            .xss_patterns
            .iter()
            .map(|spec| {
                Ok(PatternRule {
                    name: spec.name.clone(),
                    regex: compile(&spec.name, &spec.pattern)?,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;

        Ok(Self {
            xss,
            keywords: config
                .suspicious_keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
            url: compile("url_pattern", &config.url_pattern)?,
        })
    }

    /// Decode and compile a JSON rule table.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let config: HeuristicConfig =
            serde_json::from_str(json).map_err(|e| RuleError::Json(e.to_string()))?;
        Self::from_config(&config)
    }

    /// Name of the first XSS rule matching `text`, if any.
    pub fn matching_xss_rule(&self, text: &str) -> Option<&str> {
        self.xss
            .iter()
            .find(|rule| rule.regex.is_match(text))
            .map(|rule| rule.name.as_str())
    }

    /// Whether any XSS rule matches `text`.
    pub fn detect_xss(&self, text: &str) -> bool {
        self.matching_xss_rule(text).is_some()
    }

    /// Number of links in `text`.
    pub fn count_urls(&self, text: &str) -> usize {
        self.url.find_iter(text).count()
    }

    /// Whether `text` contains more than `max_urls` links.
    pub fn detect_spam(&self, text: &str, max_urls: usize) -> bool {
        self.count_urls(text) > max_urls
    }

    /// First suspicious keyword found in `text`, if any.
    pub fn matching_keyword(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| lower.contains(keyword.as_str()))
            .map(String::as_str)
    }

    /// Whether `text` contains a suspicious keyword.
    pub fn detect_suspicious_content(&self, text: &str) -> bool {
        self.matching_keyword(text).is_some()
    }

    /// Names of the loaded XSS rules, in evaluation order.
    pub fn xss_rule_names(&self) -> impl Iterator<Item = &str> {
        self.xss.iter().map(|rule| rule.name.as_str())
    }
}

impl Default for HeuristicRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

static DEFAULT_RULES: Lazy<HeuristicRules> = Lazy::new(|| {
    HeuristicRules::from_config(&HeuristicConfig::default())
        .expect("built-in heuristic tables compile")
});

/// Whether `text` matches any built-in XSS pattern (case-insensitive).
///
/// # Example
/// ```
/// use form_guard::detect_xss;
///
/// assert!(detect_xss("<script>alert(1)</script>"));
/// assert!(!detect_xss("hello world"));
/// ```
pub fn detect_xss(text: &str) -> bool {
    DEFAULT_RULES.detect_xss(text)
}

/// Whether `text` contains more than `max_urls` `http(s)://` links.
pub fn detect_spam(text: &str, max_urls: usize) -> bool {
    DEFAULT_RULES.detect_spam(text, max_urls)
}

/// Whether the lower-cased `text` contains a built-in spam phrase.
pub fn detect_suspicious_content(text: &str) -> bool {
    DEFAULT_RULES.detect_suspicious_content(text)
}
