//! Error types for the preview scene core.
//!
//! Errors are split in two layers: [`HostError`] covers faults raised by the
//! host environment (resource creation, handle resolution, the render call
//! itself), while [`PreviewError`] is what the preview scene surface raises
//! to callers. Host faults bubble up through [`PreviewError::Host`].

use thiserror::Error;

/// Faults raised by a [`RenderHost`](crate::host::RenderHost) implementation.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to initialize host: {0}")]
    InitializationFailed(String),
    #[error("failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("unknown handle: {0}")]
    UnknownHandle(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("render failed: {0}")]
    RenderFailed(String),
}

/// Result alias for host-level operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by the preview scene surface.
///
/// All of these are raised synchronously to the immediate caller; nothing is
/// retried internally. Cleanup paths (`destroy`, `clear`) never raise — they
/// are idempotent and log teardown faults instead.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// A caller-supplied value is out of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A focus index outside the current object list.
    #[error("index {index} out of range (object count is {count})")]
    IndexOutOfRange { index: usize, count: usize },
    /// An operation that requires a loaded scene (or a live camera) was
    /// invoked without one.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// A host-level fault surfaced through the preview scene.
    #[error(transparent)]
    Host(#[from] HostError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PreviewError::IndexOutOfRange { index: 4, count: 2 };
        assert_eq!(err.to_string(), "index 4 out of range (object count is 2)");

        let err = PreviewError::Host(HostError::UnknownHandle("camera 7".into()));
        assert_eq!(err.to_string(), "unknown handle: camera 7");
    }
}
