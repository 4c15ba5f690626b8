//! # partreg-service
//!
//! Business logic service layer for PartReg. Orchestrates the registry
//! directory, the grant store, and the authorization evaluator to implement
//! permission mutation and projection use cases.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references.

pub mod permission;

pub use permission::{PartPermissions, PermissionProjection, PermissionService};
