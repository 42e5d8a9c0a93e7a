//! Service error types.

/// Error returned by a service invocation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service ran but failed to produce a result.
    #[error("service execution failed: {0}")]
    ExecutionFailed(String),

    /// The input could not be understood by the service.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
