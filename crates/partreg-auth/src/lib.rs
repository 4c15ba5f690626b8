//! # partreg-auth
//!
//! Authorization core for the PartReg parts registry.
//!
//! ## Modules
//!
//! - `principal` — resolves user identifiers to accounts and transitive
//!   group memberships (including the implicit PUBLIC group)
//! - `access` — the read/write authorization evaluator and public
//!   visibility checks

pub mod access;
pub mod principal;

pub use access::AccessEvaluator;
pub use principal::PrincipalResolver;
