//! The shared service registry.
//!
//! One registry instance is shared by every client connection. The service
//! sequence and the active selection live behind a single lock, so
//! activation, deactivation, and reloads are atomic with respect to each
//! other and the active index can never point outside the sequence.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::loader::{LibraryLoader, ServiceLoader};
use servicehub_sdk::{Service, ServiceError};

/// Answer for name queries when nothing is active.
pub const NO_ACTIVE_SERVICE: &str = "No service is currently active.";
/// Answer for help queries when nothing is active.
pub const NO_ACTIVE_HELP: &str = "No active service to show help for.";
/// Answer for execute requests when nothing is active.
pub const NO_ACTIVE_EXECUTE: &str = "No active service to execute.";

#[derive(Default)]
struct State {
    /// Loaded services, in directory scan order.
    services: Vec<Arc<dyn Service>>,

    /// Index of the active service, if any. Invariant: in bounds.
    active: Option<usize>,
}

/// Registry of loaded services with at most one active selection.
///
/// The active selection is global across connections: activating a service
/// from one connection is visible to every other connection. This mirrors
/// the system's original single-operator design and is documented behavior,
/// not an accident.
pub struct ServiceRegistry {
    services_dir: PathBuf,
    loader: Box<dyn ServiceLoader>,
    state: RwLock<State>,
}

impl ServiceRegistry {
    /// Create a registry that scans `services_dir` with the given loader.
    pub fn new(services_dir: impl Into<PathBuf>, loader: Box<dyn ServiceLoader>) -> Self {
        Self {
            services_dir: services_dir.into(),
            loader,
            state: RwLock::new(State::default()),
        }
    }

    /// Create a registry backed by the native package loader.
    pub fn with_library_loader(services_dir: impl Into<PathBuf>) -> Self {
        Self::new(services_dir, Box::new(LibraryLoader::new()))
    }

    /// The directory scanned for packages (and the upload target).
    pub fn services_dir(&self) -> &Path {
        &self.services_dir
    }

    /// Scan the services directory non-recursively and load every package.
    ///
    /// A package that fails to load is logged and skipped; it never aborts
    /// the rest of the scan.
    fn scan(&self) -> Vec<Arc<dyn Service>> {
        let mut loaded = Vec::new();

        let entries = match std::fs::read_dir(&self.services_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    dir = %self.services_dir.display(),
                    error = %e,
                    "services directory not readable"
                );
                return loaded;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| self.loader.is_package(path))
            .collect();
        paths.sort();

        for path in paths {
            match self.loader.load(&path) {
                Ok(service) => {
                    tracing::info!(name = %service.name(), package = %path.display(), "service loaded");
                    loaded.push(service);
                }
                Err(e) => {
                    tracing::warn!(package = %path.display(), error = %e, "skipping package");
                }
            }
        }

        loaded
    }

    /// Load every package from the services directory, appending to the
    /// current sequence.
    pub async fn load_all(&self) {
        let loaded = self.scan();
        let mut state = self.state.write().await;
        state.services.extend(loaded);
    }

    /// Atomically replace the service sequence with a fresh scan and clear
    /// the active selection.
    pub async fn reload(&self) {
        let mut state = self.state.write().await;
        state.services = self.scan();
        state.active = None;
        tracing::info!(count = state.services.len(), "service list reloaded");
    }

    /// Register an already-constructed service, appending it to the
    /// sequence. Used by embedders that mix in-process services with loaded
    /// packages.
    pub async fn register(&self, service: Arc<dyn Service>) {
        let mut state = self.state.write().await;
        state.services.push(service);
    }

    /// Activate the service at `index`.
    ///
    /// Returns the activated service, or `None` when the index is out of
    /// range, in which case the previous selection is left untouched.
    pub async fn activate(&self, index: usize) -> Option<Arc<dyn Service>> {
        let mut state = self.state.write().await;
        if index < state.services.len() {
            state.active = Some(index);
            Some(Arc::clone(&state.services[index]))
        } else {
            None
        }
    }

    /// Clear the active selection. Always succeeds; idempotent.
    pub async fn deactivate(&self) {
        let mut state = self.state.write().await;
        state.active = None;
    }

    /// Snapshot of the current service names, in sequence order.
    pub async fn names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.services.iter().map(|s| s.name()).collect()
    }

    /// Number of loaded services.
    pub async fn count(&self) -> usize {
        self.state.read().await.services.len()
    }

    /// Name of the active service, or a placeholder when none is active.
    pub async fn active_name(&self) -> String {
        match self.active_service().await {
            Some(service) => service.name(),
            None => NO_ACTIVE_SERVICE.to_string(),
        }
    }

    /// Help text of the active service, or a placeholder when none is
    /// active.
    pub async fn active_help(&self) -> String {
        match self.active_service().await {
            Some(service) => service.help(),
            None => NO_ACTIVE_HELP.to_string(),
        }
    }

    /// Execute the active service.
    ///
    /// With no active service this answers the placeholder, never an error;
    /// only the service itself can fail.
    pub async fn active_execute(&self, input: &str) -> Result<String, ServiceError> {
        // The Arc is cloned under the read lock and invoked outside it, so
        // an execute racing a reload runs against a best-effort snapshot
        // instead of blocking the swap.
        match self.active_service().await {
            Some(service) => service.execute(input),
            None => Ok(NO_ACTIVE_EXECUTE.to_string()),
        }
    }

    async fn active_service(&self) -> Option<Arc<dyn Service>> {
        let state = self.state.read().await;
        state.active.map(|index| Arc::clone(&state.services[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedService {
        name: &'static str,
        help: &'static str,
        reply: &'static str,
    }

    impl Service for FixedService {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn help(&self) -> String {
            self.help.to_string()
        }

        fn execute(&self, input: &str) -> Result<String, ServiceError> {
            Ok(format!("{}{}!", self.reply, input))
        }
    }

    struct FailingService;

    impl Service for FailingService {
        fn name(&self) -> String {
            "Failing Service".to_string()
        }

        fn help(&self) -> String {
            "Always fails.".to_string()
        }

        fn execute(&self, _input: &str) -> Result<String, ServiceError> {
            Err(ServiceError::ExecutionFailed("boom".to_string()))
        }
    }

    async fn registry_with_demo_services(dir: &Path) -> ServiceRegistry {
        let registry = ServiceRegistry::with_library_loader(dir);
        registry
            .register(Arc::new(FixedService {
                name: "Greeting Service",
                help: "This service greets the person by name.",
                reply: "Hello, ",
            }))
            .await;
        registry
            .register(Arc::new(FixedService {
                name: "Bye bye Service",
                help: "This service dismiss the person by name.",
                reply: "Bye bye, ",
            }))
            .await;
        registry
    }

    #[tokio::test]
    async fn activate_in_range_selects_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_demo_services(dir.path()).await;

        let service = registry.activate(0).await.expect("index 0 is valid");
        assert_eq!(service.name(), "Greeting Service");
        assert_eq!(registry.active_name().await, "Greeting Service");

        assert_eq!(
            registry.active_execute("Ana").await.unwrap(),
            "Hello, Ana!"
        );

        registry.activate(1).await.expect("index 1 is valid");
        assert_eq!(
            registry.active_execute("Ana").await.unwrap(),
            "Bye bye, Ana!"
        );
    }

    #[tokio::test]
    async fn activate_out_of_range_leaves_selection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_demo_services(dir.path()).await;

        registry.activate(0).await.unwrap();
        assert!(registry.activate(5).await.is_none());
        // Active selection survives the invalid request.
        assert_eq!(registry.active_name().await, "Greeting Service");

        // And with nothing active, an invalid index activates nothing.
        registry.deactivate().await;
        assert!(registry.activate(2).await.is_none());
        assert_eq!(registry.active_name().await, NO_ACTIVE_SERVICE);
    }

    #[tokio::test]
    async fn reload_clears_the_active_selection() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_demo_services(dir.path()).await;

        registry.activate(1).await.unwrap();
        registry.reload().await;

        assert_eq!(registry.active_name().await, NO_ACTIVE_SERVICE);
        // The empty directory scan also replaced the sequence.
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_demo_services(dir.path()).await;

        registry.activate(0).await.unwrap();
        registry.deactivate().await;
        let after_first = registry.active_name().await;
        registry.deactivate().await;
        let after_second = registry.active_name().await;

        assert_eq!(after_first, NO_ACTIVE_SERVICE);
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn queries_without_active_service_answer_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::with_library_loader(dir.path());

        assert_eq!(registry.active_name().await, NO_ACTIVE_SERVICE);
        assert_eq!(registry.active_help().await, NO_ACTIVE_HELP);
        assert_eq!(
            registry.active_execute("input").await.unwrap(),
            NO_ACTIVE_EXECUTE
        );
    }

    #[tokio::test]
    async fn names_preserve_sequence_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_demo_services(dir.path()).await;

        assert_eq!(
            registry.names().await,
            vec!["Greeting Service", "Bye bye Service"]
        );
    }

    #[tokio::test]
    async fn execution_error_propagates_from_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServiceRegistry::with_library_loader(dir.path());
        registry.register(Arc::new(FailingService)).await;

        registry.activate(0).await.unwrap();
        let err = registry.active_execute("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn load_all_over_empty_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a package").unwrap();

        let registry = ServiceRegistry::with_library_loader(dir.path());
        registry.load_all().await;
        assert_eq!(registry.count().await, 0);
    }
}
