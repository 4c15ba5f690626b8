//! Entry (part record) domain entities.

pub mod model;

pub use model::{Entry, PartDraft};
