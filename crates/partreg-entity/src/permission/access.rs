//! Caller-facing access types: mutation requests and projection rows.

use partreg_core::AppResult;
use partreg_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::model::{Grantee, Subject};

/// A requested grant mutation: subject, grantee, and capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSpec {
    /// The entry or folder the grant applies to.
    pub subject: Subject,
    /// The account or group receiving the grant.
    pub grantee: Grantee,
    /// Read capability.
    pub can_read: bool,
    /// Write capability.
    pub can_write: bool,
}

impl AccessSpec {
    /// A read grant on an entry.
    pub fn read_entry(entry_id: i64, grantee: Grantee) -> Self {
        Self {
            subject: Subject::Entry(entry_id),
            grantee,
            can_read: true,
            can_write: false,
        }
    }

    /// A write grant on an entry.
    pub fn write_entry(entry_id: i64, grantee: Grantee) -> Self {
        Self {
            subject: Subject::Entry(entry_id),
            grantee,
            can_read: false,
            can_write: true,
        }
    }

    /// A read grant on a folder.
    pub fn read_folder(folder_id: i64, grantee: Grantee) -> Self {
        Self {
            subject: Subject::Folder(folder_id),
            grantee,
            can_read: true,
            can_write: false,
        }
    }

    /// A write grant on a folder.
    pub fn write_folder(folder_id: i64, grantee: Grantee) -> Self {
        Self {
            subject: Subject::Folder(folder_id),
            grantee,
            can_read: false,
            can_write: true,
        }
    }

    /// The same spec re-targeted at a different subject.
    ///
    /// Used when a folder grant propagates to the folder's contents.
    pub fn for_subject(&self, subject: Subject) -> Self {
        Self { subject, ..*self }
    }

    /// Reject specs that carry no capability at all.
    pub fn validate(&self) -> AppResult<()> {
        if !self.can_read && !self.can_write {
            return Err(AppError::validation(
                "A grant must carry at least one of read or write",
            ));
        }
        Ok(())
    }
}

/// A direct account grant item used when setting a part's permission list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartGrant {
    /// The account receiving the grant.
    pub account_id: i64,
    /// Read capability.
    pub can_read: bool,
    /// Write capability.
    pub can_write: bool,
}

/// The capability/subject-kind combination of a projection row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Read access to an entry.
    ReadEntry,
    /// Write access to an entry.
    WriteEntry,
    /// Read access to a folder.
    ReadFolder,
    /// Write access to a folder.
    WriteFolder,
}

impl AccessType {
    /// Derive the access type for a capability on a subject.
    pub fn for_subject(subject: Subject, write: bool) -> Self {
        match (subject, write) {
            (Subject::Entry(_), false) => Self::ReadEntry,
            (Subject::Entry(_), true) => Self::WriteEntry,
            (Subject::Folder(_), false) => Self::ReadFolder,
            (Subject::Folder(_), true) => Self::WriteFolder,
        }
    }

    /// Whether this access type carries the write capability.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::WriteEntry | Self::WriteFolder)
    }
}

/// One caller-facing permission row: a grantee holding one capability on one
/// subject.
///
/// `subject` is `None` for default-permission templates that have not been
/// attached to any target yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRow {
    /// Who holds the capability.
    pub grantee: Grantee,
    /// Which capability, on which kind of subject.
    pub access: AccessType,
    /// The subject, when attached.
    pub subject: Option<Subject>,
    /// Account full name or group label.
    pub display: String,
}
