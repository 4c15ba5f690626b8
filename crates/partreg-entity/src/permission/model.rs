//! Grant entity model.
//!
//! A grant binds exactly one subject (an entry or a folder) to exactly one
//! grantee (an account or a group). Both sides are modeled as tagged unions
//! so that "both set" and "neither set" are unrepresentable; the persistence
//! layer is responsible for mapping these onto its own row shape.

use serde::{Deserialize, Serialize};

/// The entry or folder a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    /// A registry entry, by id.
    Entry(i64),
    /// A folder, by id.
    Folder(i64),
}

impl Subject {
    /// Returns the entry id when this subject is an entry.
    pub fn entry_id(&self) -> Option<i64> {
        match self {
            Self::Entry(id) => Some(*id),
            Self::Folder(_) => None,
        }
    }

    /// Returns the folder id when this subject is a folder.
    pub fn folder_id(&self) -> Option<i64> {
        match self {
            Self::Entry(_) => None,
            Self::Folder(id) => Some(*id),
        }
    }

    /// Returns the raw identifier regardless of kind.
    pub fn id(&self) -> i64 {
        match self {
            Self::Entry(id) | Self::Folder(id) => *id,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry(id) => write!(f, "entry {id}"),
            Self::Folder(id) => write!(f, "folder {id}"),
        }
    }
}

/// The account or group a grant is issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Grantee {
    /// An individual account, by id.
    Account(i64),
    /// A group, by id.
    Group(i64),
}

impl Grantee {
    /// Returns the account id when this grantee is an account.
    pub fn account_id(&self) -> Option<i64> {
        match self {
            Self::Account(id) => Some(*id),
            Self::Group(_) => None,
        }
    }

    /// Returns the group id when this grantee is a group.
    pub fn group_id(&self) -> Option<i64> {
        match self {
            Self::Account(_) => None,
            Self::Group(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for Grantee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account {id}"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// A persisted authorization record.
///
/// No two grants share the same (subject, grantee, can_read, can_write)
/// tuple; creation through the mutation engine is idempotent by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Unique grant identifier.
    pub id: i64,
    /// What the grant applies to.
    pub subject: Subject,
    /// Who receives the grant.
    pub grantee: Grantee,
    /// Read capability.
    pub can_read: bool,
    /// Write capability.
    pub can_write: bool,
}

impl Grant {
    /// The value identity of this grant, ignoring its surrogate id.
    pub fn shape(&self) -> (Subject, Grantee, bool, bool) {
        (self.subject, self.grantee, self.can_read, self.can_write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_accessors() {
        let entry = Subject::Entry(42);
        assert_eq!(entry.entry_id(), Some(42));
        assert_eq!(entry.folder_id(), None);
        assert_eq!(entry.id(), 42);

        let folder = Subject::Folder(7);
        assert_eq!(folder.folder_id(), Some(7));
        assert_eq!(folder.entry_id(), None);
    }

    #[test]
    fn test_grantee_accessors() {
        let account = Grantee::Account(3);
        assert_eq!(account.account_id(), Some(3));
        assert_eq!(account.group_id(), None);

        let group = Grantee::Group(9);
        assert_eq!(group.group_id(), Some(9));
        assert_eq!(group.account_id(), None);
    }

    #[test]
    fn test_subject_serde_shape() {
        let json = serde_json::to_value(Subject::Entry(5)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "entry", "id": 5 }));
    }
}
