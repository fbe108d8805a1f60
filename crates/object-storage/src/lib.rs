//! Object storage port
//!
//! [`ObjectStorage`] is the contract the file service reads through. The
//! bundled [`ObjectStoreStorage`] implements it on top of the `object_store`
//! crate for Cloudflare R2, a local directory, or process memory.

mod backend;
mod error;
mod storage;
mod types;

pub use backend::ObjectStoreStorage;
pub use error::{Result, StorageError};
pub use storage::ObjectStorage;
pub use types::{R2Config, StorageBackend};
