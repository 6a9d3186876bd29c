//! Storage layer for fieldbase.
//!
//! Records are JSON documents grouped into namespaces. Stores keep their
//! collections in memory and write through to a [`Persistence`] backend
//! without waiting on, or failing because of, the result.

mod backend;
mod config;
mod engine;
mod memory;

pub mod key;
pub mod record;

pub use backend::Persistence;
pub use config::StoreConfig;
pub use engine::SledPersistence;
pub use key::{generate_id, Namespace};
pub use memory::MemoryPersistence;
