//! The read/write authorization evaluator.
//!
//! Decision order, first match wins:
//! 1. Administrator — allow always.
//! 2. Owner of the target (case-insensitive email match) — allow always.
//! 3. Explicit direct account grant with the required capability — allow.
//! 4. Group grant for any group the principal belongs to, including the
//!    implicit PUBLIC group — allow.
//! 5. Deny.
//!
//! Folder *write authority* is the deliberate exception: it consults only
//! ownership, administrator status, and direct explicit write grants — not
//! group membership.

use std::sync::Arc;

use tracing::debug;

use partreg_core::error::AppError;
use partreg_core::result::AppResult;
use partreg_database::store::{Directory, GrantQuery, GrantStore};
use partreg_entity::folder::Folder;
use partreg_entity::permission::{Grantee, Subject};

use crate::principal::PrincipalResolver;

/// The capability a check requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capability {
    /// Read access.
    Read,
    /// Write access.
    Write,
}

impl Capability {
    fn apply(self, query: GrantQuery) -> GrantQuery {
        match self {
            Self::Read => query.read(),
            Self::Write => query.write(),
        }
    }
}

/// Decides allow/deny for a principal against an entry or folder.
#[derive(Clone)]
pub struct AccessEvaluator {
    /// Registry directory.
    dir: Arc<dyn Directory>,
    /// Grant store.
    grants: Arc<dyn GrantStore>,
    /// Principal resolver.
    principals: PrincipalResolver,
}

impl std::fmt::Debug for AccessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEvaluator").finish()
    }
}

impl AccessEvaluator {
    /// Creates a new evaluator.
    pub fn new(
        dir: Arc<dyn Directory>,
        grants: Arc<dyn GrantStore>,
        principals: PrincipalResolver,
    ) -> Self {
        Self {
            dir,
            grants,
            principals,
        }
    }

    /// Whether the principal may read the subject.
    ///
    /// Unknown principals are denied; a missing target is a NotFound error.
    pub async fn can_read(&self, user_id: &str, subject: Subject) -> AppResult<bool> {
        self.allows(user_id, subject, Capability::Read).await
    }

    /// Whether the principal may write the subject.
    pub async fn can_write(&self, user_id: &str, subject: Subject) -> AppResult<bool> {
        self.allows(user_id, subject, Capability::Write).await
    }

    /// Errors with Authorization unless the principal may read the subject.
    pub async fn expect_read(&self, user_id: &str, subject: Subject) -> AppResult<()> {
        if self.can_read(user_id, subject).await? {
            return Ok(());
        }
        Err(AppError::authorization(format!(
            "'{user_id}' does not have read access to {subject}"
        )))
    }

    /// Errors with Authorization unless the principal may write the subject.
    pub async fn expect_write(&self, user_id: &str, subject: Subject) -> AppResult<()> {
        if self.can_write(user_id, subject).await? {
            return Ok(());
        }
        Err(AppError::authorization(format!(
            "'{user_id}' does not have write access to {subject}"
        )))
    }

    /// Whether the PUBLIC group holds a read grant on the subject,
    /// independent of any principal.
    ///
    /// Used for visibility badges, not for access gating.
    pub async fn is_publicly_visible(&self, subject: Subject) -> AppResult<bool> {
        let public = self.dir.public_group().await?;
        let query = GrantQuery::subject(subject)
            .grantee(Grantee::Group(public.id))
            .read();
        self.grants.has_grant(&query).await
    }

    /// Whether the principal has write authority over the folder.
    ///
    /// Administrators and the owner always do; otherwise only a direct
    /// explicit write grant counts. Group-held write grants deliberately do
    /// not confer folder write authority.
    pub async fn has_folder_write(&self, user_id: &str, folder: &Folder) -> AppResult<bool> {
        if self.principals.is_administrator(user_id).await? || folder.is_owned_by(user_id) {
            return Ok(true);
        }

        match self.principals.try_resolve(user_id).await? {
            Some(account) => self.grants.has_explicit_write(folder.id, account.id).await,
            None => Ok(false),
        }
    }

    /// Whether the principal holds a read grant on any of the folders,
    /// directly or through group membership.
    pub async fn can_read_via_folders(
        &self,
        user_id: &str,
        folder_ids: &[i64],
    ) -> AppResult<bool> {
        self.any_folder_grant(user_id, folder_ids, Capability::Read)
            .await
    }

    /// Whether the principal holds a write grant on any of the folders,
    /// directly or through group membership.
    pub async fn can_write_via_folders(
        &self,
        user_id: &str,
        folder_ids: &[i64],
    ) -> AppResult<bool> {
        self.any_folder_grant(user_id, folder_ids, Capability::Write)
            .await
    }

    async fn any_folder_grant(
        &self,
        user_id: &str,
        folder_ids: &[i64],
        capability: Capability,
    ) -> AppResult<bool> {
        let Some(account) = self.principals.try_resolve(user_id).await? else {
            return Ok(false);
        };

        let groups = self.principals.groups_of(&account).await?;
        let query = GrantQuery::subjects(folder_ids.iter().map(|id| Subject::Folder(*id)))
            .grantee(Grantee::Account(account.id))
            .grantees(groups.iter().map(|g| Grantee::Group(g.id)));
        self.grants.has_grant(&capability.apply(query)).await
    }

    async fn allows(
        &self,
        user_id: &str,
        subject: Subject,
        capability: Capability,
    ) -> AppResult<bool> {
        let Some(account) = self.principals.try_resolve(user_id).await? else {
            debug!(user_id, "Denying access for unknown principal");
            return Ok(false);
        };

        if account.is_admin {
            return Ok(true);
        }

        let owner_email = self.owner_email(subject).await?;
        if owner_email.eq_ignore_ascii_case(&account.email) {
            return Ok(true);
        }

        let direct = GrantQuery::subject(subject).grantee(Grantee::Account(account.id));
        if self.grants.has_grant(&capability.apply(direct)).await? {
            return Ok(true);
        }

        let groups = self.principals.groups_of(&account).await?;
        let via_groups =
            GrantQuery::subject(subject).grantees(groups.iter().map(|g| Grantee::Group(g.id)));
        self.grants.has_grant(&capability.apply(via_groups)).await
    }

    async fn owner_email(&self, subject: Subject) -> AppResult<String> {
        match subject {
            Subject::Entry(id) => self
                .dir
                .entry(id)
                .await?
                .map(|e| e.owner_email)
                .ok_or_else(|| AppError::not_found(format!("Cannot find entry {id}"))),
            Subject::Folder(id) => self
                .dir
                .folder(id)
                .await?
                .map(|f| f.owner_email)
                .ok_or_else(|| AppError::not_found(format!("Cannot find folder {id}"))),
        }
    }
}
