//! Shared fixtures for resource manager integration tests.

use stratus_core::{MemoryStore, Resource, ResourceManager, UploadFile, UserId};
use tracing_subscriber::EnvFilter;

pub const USER_1: UserId = UserId::new(1);
#[allow(dead_code)] // Used in resource_tests
pub const USER_2: UserId = UserId::new(2);

/// Install a test subscriber so `RUST_LOG=debug cargo test` shows spans.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A manager over a fresh in-memory store, with user 1's root created.
pub fn manager() -> ResourceManager<MemoryStore> {
    init_tracing();
    let manager = ResourceManager::new(MemoryStore::new());
    manager
        .create_user_root(USER_1)
        .expect("Failed to create user root");
    manager
}

pub fn text_file(name: &str, content: &str) -> UploadFile {
    UploadFile::new(name, content.as_bytes().to_vec()).with_content_type("text/plain")
}

#[allow(dead_code)] // Used in resource_tests
pub fn jpeg_file(name: &str, size: usize) -> UploadFile {
    UploadFile::new(name, vec![0xAB; size]).with_content_type("image/jpeg")
}

/// Find a listed resource by name, panicking with the listing on a miss.
#[allow(dead_code)] // Used in resource_tests
pub fn find_by_name<'a>(resources: &'a [Resource], name: &str) -> &'a Resource {
    resources
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("No resource named '{name}' in {resources:?}"))
}
