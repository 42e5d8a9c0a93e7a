//! Service package loading.
//!
//! A package is a platform dynamic library exporting a service descriptor.
//! Each package is opened into its own [`Library`] handle, so symbol
//! resolution is scoped to that package and two packages may carry
//! same-named private symbols without collision.

use std::path::Path;
use std::sync::Arc;

use libloading::{Library, Symbol};
use servicehub_sdk::{
    ParsedDescriptor, Service, ServiceConstructorFn, ServiceDescriptor, DESCRIPTOR_SYMBOL,
};

use crate::adapter::ServiceAdapter;
use crate::error::LoadError;

/// Source of loadable services.
///
/// The registry talks to the loader through this trait; tests substitute
/// their own implementation.
pub trait ServiceLoader: Send + Sync {
    /// Whether `path` looks like a loadable package.
    fn is_package(&self, path: &Path) -> bool;

    /// Load the package at `path` and return the service it exports.
    fn load(&self, path: &Path) -> Result<Arc<dyn Service>, LoadError>;
}

/// Production loader for native service packages.
#[derive(Debug, Default)]
pub struct LibraryLoader;

impl LibraryLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceLoader for LibraryLoader {
    fn is_package(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str());
        match std::env::consts::OS {
            "macos" => ext == Some("dylib"),
            "linux" => ext == Some("so"),
            "windows" => ext == Some("dll"),
            _ => false,
        }
    }

    fn load(&self, path: &Path) -> Result<Arc<dyn Service>, LoadError> {
        // SAFETY: Loading a package executes its initializers. Packages are
        // trusted by design; see the crate-level trust note.
        let library = unsafe { Library::new(path).map_err(LoadError::Open)? };

        let descriptor = unsafe {
            let symbol: Symbol<*const ServiceDescriptor> = library
                .get(DESCRIPTOR_SYMBOL)
                .map_err(LoadError::MissingDescriptor)?;
            ParsedDescriptor::from_raw(&**symbol)?
        };

        let entry_point = descriptor.entry_point.ok_or(LoadError::MissingEntryPoint)?;

        let raw = unsafe {
            let constructor: Symbol<ServiceConstructorFn> = library
                .get(entry_point.as_bytes())
                .map_err(|e| LoadError::EntryPointNotFound(entry_point.clone(), e))?;
            constructor()
        };

        if raw.is_null() {
            return Err(LoadError::InstantiationFailed(
                "constructor returned null".to_string(),
            ));
        }

        tracing::debug!(
            package = %path.display(),
            entry_point = %entry_point,
            version = descriptor.package_version.as_deref().unwrap_or("unknown"),
            "service package loaded"
        );

        // SAFETY: `raw` is the vtable just produced by this library's
        // constructor; the adapter takes sole ownership of it and of the
        // library handle.
        Ok(Arc::new(unsafe { ServiceAdapter::new(raw, library) }))
    }
}
