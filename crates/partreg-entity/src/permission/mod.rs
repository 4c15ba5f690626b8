//! Permission (grant) domain entities.

pub mod access;
pub mod model;

pub use access::{AccessRow, AccessSpec, AccessType, PartGrant};
pub use model::{Grant, Grantee, Subject};
