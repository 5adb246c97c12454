//! `db` crate: pure persistence layer.
//!
//! Provides typed row structs, the [`Repository`] trait, and two backends:
//! an in-memory store and a JSON-file store. No business logic lives here;
//! domain types are serialised into the rows by the `engine` crate.

pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use pool::{connect, DbPool};
pub use repository::{JsonFileRepository, MemoryRepository, Repository};
