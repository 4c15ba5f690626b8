//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A folder — an ordered collection of entries that can be shared as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: i64,
    /// Email of the owning account.
    pub owner_email: String,
    /// Folder name.
    pub name: String,
    /// Whether grant mutations on this folder cascade to contained entries.
    ///
    /// The flag is consulted at mutation time only; toggling it does not
    /// retroactively change grants on the contents.
    pub propagate_permissions: bool,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
}

impl Folder {
    /// Check whether the given user identifier owns this folder.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_email.eq_ignore_ascii_case(user_id)
    }
}
