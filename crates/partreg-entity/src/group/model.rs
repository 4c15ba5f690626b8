//! Group entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stable identifier of the singleton PUBLIC group.
///
/// The PUBLIC group represents "every authenticated or anonymous viewer";
/// a read grant to it makes the subject publicly visible.
pub const PUBLIC_GROUP_UUID: Uuid = Uuid::from_u128(0x8746a64b_abd5_4838_a332_02c356bbeac0);

/// Visibility classification of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "group_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Visible to every account; used to pre-populate default permissions.
    Public,
    /// Visible only to its members.
    Private,
}

impl GroupType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named collection of accounts that can be granted permissions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Unique group identifier.
    pub id: i64,
    /// Stable external identifier.
    pub uuid: Uuid,
    /// Human-readable label, used as the display label in permission rows.
    pub label: String,
    /// Visibility classification.
    pub group_type: GroupType,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Check whether this is the well-known PUBLIC group.
    pub fn is_public_group(&self) -> bool {
        self.uuid == PUBLIC_GROUP_UUID
    }
}
