//! # partreg-entity
//!
//! Domain entity models for the PartReg biological parts registry. Every
//! struct in this crate represents a database table row or a domain value
//! object. All entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`,
//! and database entities additionally derive `sqlx::FromRow`.

pub mod account;
pub mod entry;
pub mod folder;
pub mod group;
pub mod permission;
