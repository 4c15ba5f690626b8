//! # partreg-core
//!
//! Core crate for the PartReg biological parts registry. Contains the
//! configuration schemas, logging setup, and the unified error system.
//!
//! This crate has **no** internal dependencies on other PartReg crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
