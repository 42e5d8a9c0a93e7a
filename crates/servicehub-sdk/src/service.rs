//! The service capability trait.

use crate::error::ServiceError;

/// A named, invocable capability with help text.
///
/// Service packages implement this trait and export it with
/// [`export_service!`](crate::export_service); the server adapts loaded
/// instances back to this same trait, so in-process and dynamically loaded
/// services are interchangeable.
///
/// Implementations must be thread-safe: the server invokes a service from
/// any connection task that has it active.
pub trait Service: Send + Sync {
    /// Human-readable service name, used to identify the service in listings.
    fn name(&self) -> String;

    /// Usage instructions for the service.
    fn help(&self) -> String;

    /// Execute the service with the given input and return the result.
    fn execute(&self, input: &str) -> Result<String, ServiceError>;
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service").field("name", &self.name()).finish()
    }
}
