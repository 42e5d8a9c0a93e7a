//! Core service hosting for ServiceHub.
//!
//! This crate owns the pieces the server builds on:
//!
//! - **Loader**: opens a service package (a dynamic library), reads its
//!   embedded descriptor to find the entry point, and instantiates the
//!   exported service.
//! - **Adapter**: wraps the loaded instance behind the common
//!   [`Service`] capability trait, keeping the library handle alive for the
//!   lifetime of the service.
//! - **Registry**: owns every loaded service, tracks the single active
//!   selection, and supports directory rescans at runtime.
//!
//! Loaded packages run with full process privileges. There is no
//! authentication or sandboxing of uploaded code; deployments must only
//! accept connections from trusted clients.

pub mod adapter;
pub mod error;
pub mod loader;
pub mod registry;

pub use adapter::ServiceAdapter;
pub use error::LoadError;
pub use loader::{LibraryLoader, ServiceLoader};
pub use registry::ServiceRegistry;

// The capability trait is defined in the SDK so packages and host share it.
pub use servicehub_sdk::{Service, ServiceError};
