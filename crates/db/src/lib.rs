//! `db` crate — persistence layer for the HR portal.
//!
//! Provides connection configuration, the schema bootstrap, typed row
//! structs, the association graph, and the [`RequestStore`] seam with a
//! MySQL and an in-memory implementation. No business logic lives here.

pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod store;

pub use config::DatabaseConfig;
pub use error::DbError;
pub use memory::MemoryStore;
pub use pool::{bootstrap, Database, DbPool};
pub use store::{MySqlStore, RequestStore};
