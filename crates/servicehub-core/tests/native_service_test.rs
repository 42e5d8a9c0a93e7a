//! Integration tests for loading real service packages.
//!
//! These exercise the full pipeline: dynamic library open, descriptor
//! resolution, entry-point construction, and adapter calls through the
//! vtable. They need the demo service crates to be built first, so they are
//! ignored by default. Run with:
//!
//! ```text
//! cargo build -p servicehub-greeting-service -p servicehub-bye-service
//! cargo test -p servicehub-core -- --ignored
//! ```

use std::path::PathBuf;

use servicehub_core::{LibraryLoader, Service, ServiceLoader, ServiceRegistry};

/// Locate a built demo package in the workspace target directory.
fn package_path(lib_name: &str) -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let file_name = format!("lib{lib_name}.dylib");
    #[cfg(target_os = "linux")]
    let file_name = format!("lib{lib_name}.so");
    #[cfg(target_os = "windows")]
    let file_name = format!("{lib_name}.dll");

    let mut target = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    target.push("..");
    target.push("..");
    target.push("target");

    for profile in ["debug", "release"] {
        let candidate = target.join(profile).join(&file_name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[test]
#[ignore = "requires the demo service packages to be built"]
fn loads_greeting_service_package() {
    let Some(path) = package_path("greeting_service") else {
        println!("Skipping test: greeting_service package not built");
        return;
    };

    let loader = LibraryLoader::new();
    let service = loader.load(&path).expect("greeting package loads");

    assert_eq!(service.name(), "Greeting Service");
    assert_eq!(service.help(), "This service greets the person by name.");
    assert_eq!(service.execute("Ana").unwrap(), "Hello, Ana!");
}

#[tokio::test]
#[ignore = "requires the demo service packages to be built"]
async fn registry_scans_a_directory_of_packages() {
    let (Some(greeting), Some(bye)) = (
        package_path("greeting_service"),
        package_path("bye_service"),
    ) else {
        println!("Skipping test: demo packages not built");
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    // Copy under names that sort as (bye, greeting) to pin scan order.
    std::fs::copy(&bye, dir.path().join(format!(
        "a_bye{}",
        bye.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default()
    )))
    .unwrap();
    std::fs::copy(&greeting, dir.path().join(format!(
        "b_greeting{}",
        greeting.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default()
    )))
    .unwrap();

    let registry = ServiceRegistry::with_library_loader(dir.path());
    registry.load_all().await;

    assert_eq!(
        registry.names().await,
        vec!["Bye bye Service", "Greeting Service"]
    );

    registry.activate(1).await.expect("index 1 is valid");
    assert_eq!(
        registry.active_execute("Ana").await.unwrap(),
        "Hello, Ana!"
    );
}
