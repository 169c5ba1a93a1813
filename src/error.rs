// ABOUTME: Error taxonomy for the chat pipeline.
// ABOUTME: Batch workers catch these at their boundary and turn them into Failed outcomes.

use std::time::Duration;
use thiserror::Error;

/// Failures that can surface from a single chat call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Required input is missing or unusable (no text/image, unsupported format).
    #[error("invalid chat input: {0}")]
    Validation(String),

    /// The model settings do not describe a usable provider configuration.
    #[error("invalid model configuration: {0}")]
    Configuration(String),

    /// The provider call did not complete within the deadline. The in-flight
    /// future is dropped; the vendor may still have processed the request.
    #[error("chat request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// Transport, auth, quota, or malformed-response failure from the vendor.
    #[error("provider request failed: {0}")]
    Provider(String),
}
