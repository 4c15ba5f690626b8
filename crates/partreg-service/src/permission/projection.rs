//! Caller-facing permission views.
//!
//! Converts stored grants into one row per (grantee, capability) pair and
//! renders display labels. The implicit PUBLIC read grant is hidden unless
//! explicitly requested; public visibility itself is a separate check on
//! the evaluator.

use std::sync::Arc;

use tracing::debug;

use partreg_auth::{AccessEvaluator, PrincipalResolver};
use partreg_core::error::AppError;
use partreg_core::result::AppResult;
use partreg_database::store::{Directory, GrantStore};
use partreg_entity::folder::Folder;
use partreg_entity::permission::{AccessRow, AccessType, Grantee, Subject};

/// Builds caller-facing permission rows from stored grants.
#[derive(Clone)]
pub struct PermissionProjection {
    /// Registry directory.
    dir: Arc<dyn Directory>,
    /// Grant store.
    grants: Arc<dyn GrantStore>,
    /// Authorization evaluator.
    evaluator: AccessEvaluator,
    /// Principal resolver.
    principals: PrincipalResolver,
}

impl std::fmt::Debug for PermissionProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionProjection").finish()
    }
}

impl PermissionProjection {
    /// Creates a new projection.
    pub fn new(
        dir: Arc<dyn Directory>,
        grants: Arc<dyn GrantStore>,
        evaluator: AccessEvaluator,
        principals: PrincipalResolver,
    ) -> Self {
        Self {
            dir,
            grants,
            evaluator,
            principals,
        }
    }

    /// The explicitly set permissions on a subject, one row per grantee and
    /// capability.
    ///
    /// The PUBLIC group's read grant is excluded unless `include_public` is
    /// set; every other grant always appears.
    pub async fn list_set_permissions(
        &self,
        subject: Subject,
        include_public: bool,
    ) -> AppResult<Vec<AccessRow>> {
        let public = self.dir.public_group().await?;
        let mut rows = Vec::new();

        // Read rows, then write rows; accounts before groups.
        for write in [false, true] {
            let (require_read, require_write) = (!write, write);
            let access = AccessType::for_subject(subject, write);

            for account_id in self
                .grants
                .account_grantees(subject, require_read, require_write)
                .await?
            {
                let Some(account) = self.dir.account(account_id).await? else {
                    debug!(account_id, "Skipping grant row for missing account");
                    continue;
                };
                rows.push(AccessRow {
                    grantee: Grantee::Account(account_id),
                    access,
                    subject: Some(subject),
                    display: account.full_name,
                });
            }

            for group_id in self
                .grants
                .group_grantees(subject, require_read, require_write)
                .await?
            {
                if !write && !include_public && group_id == public.id {
                    continue;
                }
                let Some(group) = self.dir.group(group_id).await? else {
                    debug!(group_id, "Skipping grant row for missing group");
                    continue;
                };
                rows.push(AccessRow {
                    grantee: Grantee::Group(group_id),
                    access,
                    subject: Some(subject),
                    display: group.label,
                });
            }
        }

        Ok(rows)
    }

    /// The full permission rows of a folder, public grant included.
    ///
    /// Requires folder write authority, since the grantee list itself is
    /// privileged information.
    pub async fn list_folder_permissions(
        &self,
        actor: &str,
        folder_id: i64,
    ) -> AppResult<Vec<AccessRow>> {
        let folder = self
            .dir
            .folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cannot find folder {folder_id}")))?;

        if !self.evaluator.has_folder_write(actor, &folder).await? {
            return Err(AppError::authorization(format!(
                "'{actor}' may not view permissions of folder {folder_id}"
            )));
        }

        self.list_set_permissions(Subject::Folder(folder.id), true)
            .await
    }

    /// Read-entry grant templates for every public group the account
    /// belongs to, used to pre-populate new-part permission forms.
    ///
    /// Template rows carry no subject; they have not been attached to a
    /// part yet.
    pub async fn default_permissions_for(&self, account_id: i64) -> AppResult<Vec<AccessRow>> {
        self.dir
            .account(account_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cannot find account {account_id}")))?;

        let groups = self.dir.public_groups_of(account_id).await?;
        Ok(groups
            .into_iter()
            .map(|group| AccessRow {
                grantee: Grantee::Group(group.id),
                access: AccessType::ReadEntry,
                subject: None,
                display: group.label,
            })
            .collect())
    }

    /// The folders shared with a user, directly or through group
    /// membership.
    pub async fn permission_folders(&self, user_id: &str) -> AppResult<Vec<Folder>> {
        let account = self.principals.resolve(user_id).await?;
        let groups = self.principals.groups_of(&account).await?;
        let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();

        let folder_ids = self
            .grants
            .folders_granted_to(account.id, &group_ids)
            .await?;

        let mut folders = Vec::with_capacity(folder_ids.len());
        for folder_id in folder_ids {
            if let Some(folder) = self.dir.folder(folder_id).await? {
                folders.push(folder);
            }
        }
        Ok(folders)
    }
}
