//! Grant mutation engine — add, remove, and replace permission grants.
//!
//! All mutations authorize the acting user first. Folder mutations with
//! `propagate_permissions` set apply the same grant to every contained
//! entry; the folder-level check authorizes the whole batch, so the
//! per-entry applications are unconditional.

use std::sync::Arc;

use tracing::{info, warn};

use partreg_auth::AccessEvaluator;
use partreg_auth::PrincipalResolver;
use partreg_core::error::{AppError, ErrorKind};
use partreg_core::result::AppResult;
use partreg_database::store::{Directory, EntryCreator, GrantStore};
use partreg_entity::entry::{Entry, PartDraft};
use partreg_entity::folder::Folder;
use partreg_entity::permission::{AccessSpec, Grant, Grantee, PartGrant, Subject};

/// Result of setting a part's permission list: the part id (which may have
/// just been created) and the grants now in force.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartPermissions {
    /// The part the grants apply to.
    pub part_id: i64,
    /// The full grant set after the replacement.
    pub grants: Vec<Grant>,
}

/// Orchestrates grant mutations against the grant store.
#[derive(Clone)]
pub struct PermissionService {
    /// Registry directory.
    dir: Arc<dyn Directory>,
    /// Grant store.
    grants: Arc<dyn GrantStore>,
    /// Authorization evaluator.
    evaluator: AccessEvaluator,
    /// Principal resolver.
    principals: PrincipalResolver,
    /// Part creation collaborator.
    creator: Arc<dyn EntryCreator>,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService").finish()
    }
}

impl PermissionService {
    /// Creates a new permission service.
    pub fn new(
        dir: Arc<dyn Directory>,
        grants: Arc<dyn GrantStore>,
        evaluator: AccessEvaluator,
        principals: PrincipalResolver,
        creator: Arc<dyn EntryCreator>,
    ) -> Self {
        Self {
            dir,
            grants,
            evaluator,
            principals,
            creator,
        }
    }

    /// Adds a grant, authorizing `actor` against the subject first.
    ///
    /// Idempotent by value: an identical existing grant is returned instead
    /// of being duplicated. Folder grants propagate to the folder's
    /// contents when the folder is marked propagating.
    pub async fn add_grant(&self, actor: &str, spec: &AccessSpec) -> AppResult<Grant> {
        spec.validate()?;
        self.require_grantee(spec.grantee).await?;

        match spec.subject {
            Subject::Entry(entry_id) => {
                self.require_entry(entry_id).await?;
                self.evaluator.expect_write(actor, spec.subject).await?;
                self.apply(spec).await
            }
            Subject::Folder(folder_id) => {
                let folder = self.require_folder_write(actor, folder_id).await?;

                if folder.propagate_permissions {
                    for entry in self.dir.folder_contents(folder_id).await? {
                        self.apply(&spec.for_subject(Subject::Entry(entry.id)))
                            .await?;
                    }
                }
                let grant = self.apply(spec).await?;
                info!(
                    actor = actor,
                    folder_id = folder_id,
                    propagated = folder.propagate_permissions,
                    "Folder grant added"
                );
                Ok(grant)
            }
        }
    }

    /// Removes the grant matching the spec, with the same authority checks
    /// as [`add_grant`](Self::add_grant). A grant that does not exist is a
    /// no-op; a denied actor is an Authorization error.
    pub async fn remove_grant(&self, actor: &str, spec: &AccessSpec) -> AppResult<()> {
        match spec.subject {
            Subject::Entry(entry_id) => {
                self.require_entry(entry_id).await?;
                self.evaluator.expect_write(actor, spec.subject).await?;
                self.strip(spec).await
            }
            Subject::Folder(folder_id) => {
                let folder = self.require_folder_write(actor, folder_id).await?;

                if folder.propagate_permissions {
                    for entry in self.dir.folder_contents(folder_id).await? {
                        self.strip(&spec.for_subject(Subject::Entry(entry.id)))
                            .await?;
                    }
                }
                self.strip(spec).await
            }
        }
    }

    /// Removes every grant on a folder. Typically used when a shared or
    /// public folder is retired.
    pub async fn remove_all_folder_grants(&self, actor: &str, folder_id: i64) -> AppResult<u64> {
        let folder = self.require_folder_write(actor, folder_id).await?;
        let removed = self.grants.clear_subject(Subject::Folder(folder.id)).await?;
        info!(actor = actor, folder_id = folder_id, removed = removed, "Folder grants cleared");
        Ok(removed)
    }

    /// Replaces the full grant set of a part with the given direct account
    /// grants. An empty list clears every grant.
    ///
    /// When no part exists under `part_id`, one is created owned by the
    /// actor. The clear and the re-creation happen in a single store unit
    /// of work, so a failure cannot leave a partial grant set.
    pub async fn set_part_permissions(
        &self,
        actor: &str,
        part_id: i64,
        permissions: &[PartGrant],
    ) -> AppResult<PartPermissions> {
        let entry = match self.dir.entry(part_id).await? {
            Some(entry) => {
                self.evaluator
                    .expect_write(actor, Subject::Entry(entry.id))
                    .await?;
                entry
            }
            None => self.create_part_for(actor).await?,
        };

        let mut items = Vec::with_capacity(permissions.len());
        for permission in permissions {
            let grantee = self.require_account_grantee(permission).await?;
            items.push((grantee, permission.can_read, permission.can_write));
        }

        let grants = self
            .grants
            .replace_subject_grants(Subject::Entry(entry.id), &items)
            .await?;

        info!(
            actor = actor,
            part_id = entry.id,
            count = grants.len(),
            "Part permissions replaced"
        );
        Ok(PartPermissions {
            part_id: entry.id,
            grants,
        })
    }

    /// Adds a single direct account grant to a part, creating the part
    /// (owned by the actor) when it does not exist.
    pub async fn create_part_grant(
        &self,
        actor: &str,
        part_id: i64,
        permission: &PartGrant,
    ) -> AppResult<Grant> {
        let entry = match self.dir.entry(part_id).await? {
            Some(entry) => {
                self.evaluator
                    .expect_write(actor, Subject::Entry(entry.id))
                    .await?;
                entry
            }
            None => self.create_part_for(actor).await?,
        };

        let grantee = self.require_account_grantee(permission).await?;
        self.apply(&AccessSpec {
            subject: Subject::Entry(entry.id),
            grantee,
            can_read: permission.can_read,
            can_write: permission.can_write,
        })
        .await
    }

    /// Removes a grant by id from a part. Silently a no-op when the part,
    /// the grant, or the part/grant association does not exist; the write
    /// authority check still applies.
    pub async fn remove_grant_by_id(
        &self,
        actor: &str,
        part_id: i64,
        grant_id: i64,
    ) -> AppResult<()> {
        let Some(entry) = self.dir.entry(part_id).await? else {
            return Ok(());
        };
        let Some(grant) = self.grants.get(grant_id).await? else {
            return Ok(());
        };

        self.evaluator
            .expect_write(actor, Subject::Entry(entry.id))
            .await?;

        // The grant must actually belong to the named part.
        if grant.subject != Subject::Entry(part_id) {
            return Ok(());
        }

        self.grants.delete_by_id(grant_id).await?;
        Ok(())
    }

    /// Grants the PUBLIC group read access to a part.
    pub async fn enable_public_read(&self, actor: &str, part_id: i64) -> AppResult<Grant> {
        let public = self.dir.public_group().await?;
        let spec = AccessSpec::read_entry(part_id, Grantee::Group(public.id));
        self.add_grant(actor, &spec).await
    }

    /// Revokes the PUBLIC group's read access to a part.
    ///
    /// The error-swallowing variant: reports success as a boolean instead
    /// of propagating, for callers that treat revocation as best-effort.
    pub async fn disable_public_read(&self, actor: &str, part_id: i64) -> bool {
        let result = async {
            let public = self.dir.public_group().await?;
            let spec = AccessSpec::read_entry(part_id, Grantee::Group(public.id));
            self.remove_grant(actor, &spec).await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(actor = actor, part_id = part_id, error = %e, "Disabling public read failed");
                false
            }
        }
    }

    /// Applies (or removes) every grant currently set on a folder to (or
    /// from) all of its contents.
    ///
    /// Used when the folder's propagation flag is toggled. Only the owner
    /// or an administrator may do this; anyone else gets `false` back.
    pub async fn propagate_folder_grants(
        &self,
        actor: &str,
        folder_id: i64,
        enable: bool,
    ) -> AppResult<bool> {
        let folder = self
            .dir
            .folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cannot find folder {folder_id}")))?;

        if !self.principals.is_administrator(actor).await? && !folder.is_owned_by(actor) {
            return Ok(false);
        }

        let folder_grants = self.grants.grants_for(Subject::Folder(folder.id)).await?;
        if folder_grants.is_empty() {
            return Ok(true);
        }

        for entry in self.dir.folder_contents(folder.id).await? {
            for grant in &folder_grants {
                let spec = AccessSpec {
                    subject: Subject::Entry(entry.id),
                    grantee: grant.grantee,
                    can_read: grant.can_read,
                    can_write: grant.can_write,
                };
                if enable {
                    self.apply(&spec).await?;
                } else {
                    self.strip(&spec).await?;
                }
            }
        }

        info!(
            actor = actor,
            folder_id = folder_id,
            enabled = enable,
            grants = folder_grants.len(),
            "Folder grants propagated"
        );
        Ok(true)
    }

    /// Create or return the existing grant with the spec's value shape.
    async fn apply(&self, spec: &AccessSpec) -> AppResult<Grant> {
        if let Some(existing) = self
            .grants
            .find(spec.subject, spec.grantee, spec.can_read, spec.can_write)
            .await?
        {
            return Ok(existing);
        }
        match self
            .grants
            .create(spec.subject, spec.grantee, spec.can_read, spec.can_write)
            .await
        {
            // An identical grant landed between the lookup and the insert;
            // return it instead of surfacing the conflict.
            Err(err) if err.kind == ErrorKind::Conflict => self
                .grants
                .find(spec.subject, spec.grantee, spec.can_read, spec.can_write)
                .await?
                .ok_or(err),
            result => result,
        }
    }

    /// Delete the grant with the spec's value shape, if present.
    async fn strip(&self, spec: &AccessSpec) -> AppResult<()> {
        self.grants
            .delete(spec.subject, spec.grantee, spec.can_read, spec.can_write)
            .await
    }

    async fn create_part_for(&self, actor: &str) -> AppResult<Entry> {
        let account = self.principals.resolve(actor).await?;
        let part_id = self
            .creator
            .create_part(&account.email, &PartDraft::default())
            .await?;
        self.dir
            .entry(part_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Created part {part_id} did not resolve")))
    }

    async fn require_entry(&self, entry_id: i64) -> AppResult<Entry> {
        self.dir
            .entry(entry_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cannot find entry {entry_id}")))
    }

    async fn require_folder_write(&self, actor: &str, folder_id: i64) -> AppResult<Folder> {
        let folder = self
            .dir
            .folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Cannot find folder {folder_id}")))?;

        if !self.evaluator.has_folder_write(actor, &folder).await? {
            warn!(actor = actor, folder_id = folder_id, "Folder mutation denied");
            return Err(AppError::authorization(format!(
                "'{actor}' is not allowed to modify folder {folder_id}"
            )));
        }
        Ok(folder)
    }

    async fn require_grantee(&self, grantee: Grantee) -> AppResult<()> {
        match grantee {
            Grantee::Account(id) => {
                self.dir
                    .account(id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Cannot find account {id}")))?;
            }
            Grantee::Group(id) => {
                self.dir
                    .group(id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Cannot find group {id}")))?;
            }
        }
        Ok(())
    }

    async fn require_account_grantee(&self, permission: &PartGrant) -> AppResult<Grantee> {
        if !permission.can_read && !permission.can_write {
            return Err(AppError::validation(
                "A grant must carry at least one of read or write",
            ));
        }
        let account = self
            .dir
            .account(permission.account_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Cannot find account {}", permission.account_id))
            })?;
        Ok(Grantee::Account(account.id))
    }
}
