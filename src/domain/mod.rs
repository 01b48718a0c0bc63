//! Domain layer - pure form-guard logic with no I/O.
//!
//! This layer contains the rules applied to a single submission:
//! - Markup sanitization and HTML escaping
//! - Email and length validators
//! - XSS, link-spam and keyword heuristics (data-driven tables)
//! - Honeypot decoy descriptor and bot check
//! - Attempt history and the sliding-window policy
//! - Contact form validation with first-failing-rule precedence
//!
//! All types in this layer are pure and easily testable.

pub mod attempts;
pub mod heuristics;
pub mod honeypot;
pub mod policy;
pub mod sanitizer;
pub mod submission;
pub mod validation;
pub mod validators;
