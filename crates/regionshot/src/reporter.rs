//! Attachment sink for failed comparisons.
//!
//! When a screenshot does not match, the unmatched, reference and diff
//! images are offered to a [`Reporter`] (an HTML report, a CI artifact
//! store). Attaching is best-effort: errors are logged and dropped.

use crate::result::{SnapError, SnapResult};
use std::sync::Mutex;

/// MIME type of every attachment produced here
pub const PNG_MIME: &str = "image/png";

/// Receives named binary attachments
pub trait Reporter: Send + Sync {
    /// Attach `data` under `name`
    fn attach(&self, name: &str, data: &[u8], mime_type: &str) -> SnapResult<()>;
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn attach(&self, _name: &str, _data: &[u8], _mime_type: &str) -> SnapResult<()> {
        Ok(())
    }
}

/// One stored attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment name
    pub name: String,
    /// Raw bytes
    pub data: Vec<u8>,
    /// MIME type
    pub mime_type: String,
}

/// Reporter that keeps attachments in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemoryReporter {
    /// Create an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything attached so far
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Names of everything attached so far
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.attachments().into_iter().map(|a| a.name).collect()
    }
}

impl Reporter for MemoryReporter {
    fn attach(&self, name: &str, data: &[u8], mime_type: &str) -> SnapResult<()> {
        let mut list = self.attachments.lock().map_err(|_| SnapError::Reporter {
            message: "attachment list poisoned".to_string(),
        })?;
        list.push(Attachment {
            name: name.to_string(),
            data: data.to_vec(),
            mime_type: mime_type.to_string(),
        });
        Ok(())
    }
}

/// Attach and log-and-drop any error
pub(crate) fn attach_best_effort(reporter: &dyn Reporter, name: &str, data: &[u8]) {
    if let Err(e) = reporter.attach(name, data, PNG_MIME) {
        tracing::debug!(attachment = %name, error = %e, "attachment dropped");
    }
}
