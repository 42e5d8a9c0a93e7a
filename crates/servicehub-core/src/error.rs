//! Package loading errors.

use servicehub_sdk::DescriptorError;

/// Error raised while loading a service package.
///
/// A load failure is never fatal to the server: the registry logs it and
/// skips the package.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The package file could not be opened as a dynamic library.
    #[error("failed to open service package: {0}")]
    Open(#[source] libloading::Error),

    /// The package exports no service descriptor.
    #[error("package does not export a service descriptor")]
    MissingDescriptor(#[source] libloading::Error),

    /// The descriptor is present but malformed.
    #[error("invalid service descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    /// The descriptor names no entry point.
    #[error("service descriptor names no entry point")]
    MissingEntryPoint,

    /// The entry point named by the descriptor does not resolve.
    #[error("entry point '{0}' not found in package")]
    EntryPointNotFound(String, #[source] libloading::Error),

    /// The entry-point constructor failed to produce an instance.
    #[error("service constructor failed: {0}")]
    InstantiationFailed(String),
}
