//! # partreg-database
//!
//! Persistence layer for PartReg. Defines the store traits the
//! authorization core depends on ([`store::GrantStore`],
//! [`store::Directory`], [`store::EntryCreator`]), their PostgreSQL
//! implementations over `sqlx`, and an in-memory implementation used by
//! tests and single-node tooling.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryRegistry;
pub use repositories::directory::PgDirectory;
pub use repositories::grant::PgGrantStore;
pub use store::{Directory, EntryCreator, GrantQuery, GrantStore};
