//! Database module exports.

pub mod backend;
pub mod error;
pub mod memory;
pub mod models;
pub mod mongo;
pub mod repository;
#[cfg(test)]
pub(crate) mod testing;

pub use backend::StoreBackend;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use models::*;
pub use mongo::{Database, MongoBackend};
pub use repository::*;
