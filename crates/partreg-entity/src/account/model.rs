//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account in the parts registry.
///
/// Accounts are identified by email; email comparison is always
/// case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    pub id: i64,
    /// Email address, the login identity.
    pub email: String,
    /// Human-readable full name, used as the display label in permission rows.
    pub full_name: String,
    /// Whether this account holds administrator privileges.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Check whether the given user identifier refers to this account.
    pub fn email_matches(&self, user_id: &str) -> bool {
        self.email.eq_ignore_ascii_case(user_id)
    }
}
