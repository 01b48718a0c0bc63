//! Stand-in submission collaborator.

use crate::application::ports::{SubmitError, Submitter};
use crate::domain::submission::SanitizedSubmission;
use std::time::Duration;

/// Default simulated delivery latency.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);

/// Submitter that waits a fixed latency on the tokio timer and then succeeds.
///
/// Useful before a real email relay or HTTP endpoint is wired in.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSubmitter {
    latency: Duration,
}

impl SimulatedSubmitter {
    /// Create a submitter with the default 1.5 s latency.
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    /// Create a submitter with a custom latency.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Get the configured latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Submitter for SimulatedSubmitter {
    async fn submit(&self, submission: &SanitizedSubmission) -> Result<(), SubmitError> {
        tokio::time::sleep(self.latency).await;
        tracing::debug!(email = %submission.email, "simulated submission delivered");
        Ok(())
    }
}
