//! Grant mutation and projection services.

pub mod projection;
pub mod service;

pub use projection::PermissionProjection;
pub use service::{PartPermissions, PermissionService};
