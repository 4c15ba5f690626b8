//! Entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registry entry — a single biological part record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    /// Unique entry identifier (the "part id").
    pub id: i64,
    /// Email of the owning account.
    pub owner_email: String,
    /// Record type discriminator (e.g. `"plasmid"`, `"strain"`, `"part"`).
    pub record_type: String,
    /// Short human-readable name.
    pub name: Option<String>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Check whether the given user identifier owns this entry.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_email.eq_ignore_ascii_case(user_id)
    }
}

/// Data required to create a new part record.
///
/// Passed to the entry-creation collaborator when permissions are set on a
/// part that does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDraft {
    /// Record type discriminator.
    pub record_type: String,
    /// Short human-readable name (optional).
    pub name: Option<String>,
}

impl Default for PartDraft {
    fn default() -> Self {
        Self {
            record_type: "part".to_string(),
            name: None,
        }
    }
}
