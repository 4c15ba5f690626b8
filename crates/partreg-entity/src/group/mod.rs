//! Group domain entities.

pub mod model;

pub use model::{Group, GroupType, PUBLIC_GROUP_UUID};
