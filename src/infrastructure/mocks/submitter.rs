//! Recording submitter for testing.

use crate::application::ports::{SubmitError, Submitter};
use crate::domain::submission::SanitizedSubmission;
use std::sync::{Arc, Mutex};

/// Submitter that records what it receives and answers with a fixed result.
///
/// Clones share the same record.
#[derive(Debug, Clone)]
pub struct RecordingSubmitter {
    received: Arc<Mutex<Vec<SanitizedSubmission>>>,
    failure: Option<SubmitError>,
}

impl RecordingSubmitter {
    /// Create a submitter that accepts everything.
    pub fn succeeding() -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Create a submitter that fails every call with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            received: Arc::new(Mutex::new(Vec::new())),
            failure: Some(SubmitError::new(reason)),
        }
    }

    /// Get every submission received so far.
    pub fn received(&self) -> Vec<SanitizedSubmission> {
        self.received
            .lock()
            .expect("RecordingSubmitter mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get the most recent submission.
    pub fn last(&self) -> Option<SanitizedSubmission> {
        self.received().pop()
    }

    /// Get the number of calls.
    pub fn calls(&self) -> usize {
        self.received
            .lock()
            .expect("RecordingSubmitter mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }
}

impl Submitter for RecordingSubmitter {
    async fn submit(&self, submission: &SanitizedSubmission) -> Result<(), SubmitError> {
        self.received
            .lock()
            .expect("RecordingSubmitter mutex poisoned - a test thread panicked while holding the lock")
            .push(submission.clone());

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
