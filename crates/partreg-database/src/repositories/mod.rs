//! PostgreSQL repository implementations.

pub mod directory;
pub mod grant;
