//! Content sanitization job.

use serde::{Deserialize, Serialize};

/// Job to re-derive a post's cached sanitized rendering.
///
/// Carries only the post ID; the worker reloads the post at execution
/// time so duplicate deliveries and stale enqueues stay harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeJob {
    /// The post to sanitize.
    pub post_id: String,
}

impl SanitizeJob {
    /// Create a new sanitize job.
    #[must_use]
    pub const fn new(post_id: String) -> Self {
        Self { post_id }
    }
}
