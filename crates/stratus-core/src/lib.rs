pub mod archive;
pub mod error;
pub mod locks;
pub mod manager;
pub mod path;
pub mod resource;
pub mod store;

// Re-export commonly used types at crate root
pub use manager::{ErrorKind, OpContext, ResourceError, ResourceManager};
pub use path::{is_directory_path, ObjectKey, StorageLayout, UserId};
pub use resource::{DownloadBody, Resource, ResourceDownload, ResourceType, UploadFile};
pub use store::{MemoryStore, ObjectEntry, ObjectStat, ObjectStore, StoreError};
