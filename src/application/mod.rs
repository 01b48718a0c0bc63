//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain rules and manages runtime behavior:
//! - Rate limiter (sliding window over an injected store)
//! - Form controller (submission state machine)
//! - Metrics (counters shared by limiter and controller)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod form;
pub mod limiter;
pub mod metrics;
pub mod ports;
