use thiserror::Error;

/// Failures reported by thread actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error("Cancelling is not supported")]
    CancelUnsupported,
}
