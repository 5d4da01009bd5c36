//! Error types for the stratus-core crate
//!
//! Re-exports the error types and their context structures from the modules
//! that define them.

pub use crate::archive::ArchiveError;
pub use crate::manager::{ErrorKind, OpContext, ResourceError};
pub use crate::store::StoreError;
