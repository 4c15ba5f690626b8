//! Grant store implementation over PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use partreg_core::error::{AppError, ErrorKind};
use partreg_core::result::AppResult;
use partreg_entity::permission::{Grant, Grantee, Subject};

use crate::store::{GrantQuery, GrantStore};

/// Repository for grant CRUD and the generalized existence queries,
/// implementing [`GrantStore`] over a sqlx pool.
#[derive(Debug, Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

/// Raw row shape of the `grants` table: one nullable column per subject and
/// grantee alternative. Converted into the sum-typed [`Grant`] on read.
#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: i64,
    entry_id: Option<i64>,
    folder_id: Option<i64>,
    account_id: Option<i64>,
    group_id: Option<i64>,
    can_read: bool,
    can_write: bool,
}

impl TryFrom<GrantRow> for Grant {
    type Error = AppError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let subject = match (row.entry_id, row.folder_id) {
            (Some(id), None) => Subject::Entry(id),
            (None, Some(id)) => Subject::Folder(id),
            _ => {
                return Err(AppError::database(format!(
                    "Grant {} does not reference exactly one subject",
                    row.id
                )));
            }
        };
        let grantee = match (row.account_id, row.group_id) {
            (Some(id), None) => Grantee::Account(id),
            (None, Some(id)) => Grantee::Group(id),
            _ => {
                return Err(AppError::database(format!(
                    "Grant {} does not reference exactly one grantee",
                    row.id
                )));
            }
        };
        Ok(Grant {
            id: row.id,
            subject,
            grantee,
            can_read: row.can_read,
            can_write: row.can_write,
        })
    }
}

/// Split a subject into its nullable column pair.
fn subject_columns(subject: Subject) -> (Option<i64>, Option<i64>) {
    (subject.entry_id(), subject.folder_id())
}

/// Split a grantee into its nullable column pair.
fn grantee_columns(grantee: Grantee) -> (Option<i64>, Option<i64>) {
    (grantee.account_id(), grantee.group_id())
}

/// Partition query subjects and grantees into id arrays for `= ANY` binds.
fn partition_query(query: &GrantQuery) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<i64>) {
    let entry_ids = query.subjects.iter().filter_map(Subject::entry_id).collect();
    let folder_ids = query.subjects.iter().filter_map(Subject::folder_id).collect();
    let account_ids = query.grantees.iter().filter_map(Grantee::account_id).collect();
    let group_ids = query.grantees.iter().filter_map(Grantee::group_id).collect();
    (entry_ids, folder_ids, account_ids, group_ids)
}

impl PgGrantStore {
    /// Create a new grant store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn get(&self, grant_id: i64) -> AppResult<Option<Grant>> {
        sqlx::query_as::<_, GrantRow>("SELECT * FROM grants WHERE id = $1")
            .bind(grant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch grant", e))?
            .map(Grant::try_from)
            .transpose()
    }

    async fn find(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Option<Grant>> {
        let (entry_id, folder_id) = subject_columns(subject);
        let (account_id, group_id) = grantee_columns(grantee);

        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2 \
             AND account_id IS NOT DISTINCT FROM $3 \
             AND group_id IS NOT DISTINCT FROM $4 \
             AND can_read = $5 AND can_write = $6",
        )
        .bind(entry_id)
        .bind(folder_id)
        .bind(account_id)
        .bind(group_id)
        .bind(can_read)
        .bind(can_write)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find grant", e))?
        .map(Grant::try_from)
        .transpose()
    }

    async fn create(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Grant> {
        let (entry_id, folder_id) = subject_columns(subject);
        let (account_id, group_id) = grantee_columns(grantee);

        let row = sqlx::query_as::<_, GrantRow>(
            "INSERT INTO grants (entry_id, folder_id, account_id, group_id, can_read, can_write) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(entry_id)
        .bind(folder_id)
        .bind(account_id)
        .bind(group_id)
        .bind(can_read)
        .bind(can_write)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|d| d.is_unique_violation())
            {
                AppError::conflict("An identical grant already exists")
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to create grant", e)
            }
        })?;

        debug!(grant_id = row.id, %subject, %grantee, "Grant created");
        Grant::try_from(row)
    }

    async fn delete(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<()> {
        let (entry_id, folder_id) = subject_columns(subject);
        let (account_id, group_id) = grantee_columns(grantee);

        sqlx::query(
            "DELETE FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2 \
             AND account_id IS NOT DISTINCT FROM $3 \
             AND group_id IS NOT DISTINCT FROM $4 \
             AND can_read = $5 AND can_write = $6",
        )
        .bind(entry_id)
        .bind(folder_id)
        .bind(account_id)
        .bind(group_id)
        .bind(can_read)
        .bind(can_write)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete grant", e))?;

        Ok(())
    }

    async fn delete_by_id(&self, grant_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM grants WHERE id = $1")
            .bind(grant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete grant", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_subject(&self, subject: Subject) -> AppResult<u64> {
        let (entry_id, folder_id) = subject_columns(subject);

        let result = sqlx::query(
            "DELETE FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2",
        )
        .bind(entry_id)
        .bind(folder_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear grants", e))?;

        Ok(result.rows_affected())
    }

    async fn has_grant(&self, query: &GrantQuery) -> AppResult<bool> {
        if query.subjects.is_empty() || query.grantees.is_empty() {
            return Ok(false);
        }
        let (entry_ids, folder_ids, account_ids, group_ids) = partition_query(query);

        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
               SELECT 1 FROM grants \
               WHERE (entry_id = ANY($1) OR folder_id = ANY($2)) \
               AND (account_id = ANY($3) OR group_id = ANY($4)) \
               AND (NOT $5 OR can_read) \
               AND (NOT $6 OR can_write) \
             )",
        )
        .bind(entry_ids)
        .bind(folder_ids)
        .bind(account_ids)
        .bind(group_ids)
        .bind(query.require_read)
        .bind(query.require_write)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to query grants", e))
    }

    async fn grants_for(&self, subject: Subject) -> AppResult<Vec<Grant>> {
        let (entry_id, folder_id) = subject_columns(subject);

        sqlx::query_as::<_, GrantRow>(
            "SELECT * FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2 \
             ORDER BY id ASC",
        )
        .bind(entry_id)
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list grants", e))?
        .into_iter()
        .map(Grant::try_from)
        .collect()
    }

    async fn account_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>> {
        let (entry_id, folder_id) = subject_columns(subject);

        sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT account_id FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2 \
             AND account_id IS NOT NULL \
             AND (NOT $3 OR can_read) \
             AND (NOT $4 OR can_write) \
             ORDER BY account_id ASC",
        )
        .bind(entry_id)
        .bind(folder_id)
        .bind(require_read)
        .bind(require_write)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list account grantees", e)
        })
    }

    async fn group_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>> {
        let (entry_id, folder_id) = subject_columns(subject);

        sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT group_id FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2 \
             AND group_id IS NOT NULL \
             AND (NOT $3 OR can_read) \
             AND (NOT $4 OR can_write) \
             ORDER BY group_id ASC",
        )
        .bind(entry_id)
        .bind(folder_id)
        .bind(require_read)
        .bind(require_write)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list group grantees", e)
        })
    }

    async fn has_explicit_write(&self, folder_id: i64, account_id: i64) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
               SELECT 1 FROM grants \
               WHERE folder_id = $1 AND account_id = $2 AND can_write \
             )",
        )
        .bind(folder_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check folder write grant", e)
        })
    }

    async fn folders_granted_to(
        &self,
        account_id: i64,
        group_ids: &[i64],
    ) -> AppResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT folder_id FROM grants \
             WHERE folder_id IS NOT NULL \
             AND (account_id = $1 OR group_id = ANY($2)) \
             ORDER BY folder_id ASC",
        )
        .bind(account_id)
        .bind(group_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list granted folders", e)
        })
    }

    async fn replace_subject_grants(
        &self,
        subject: Subject,
        grants: &[(Grantee, bool, bool)],
    ) -> AppResult<Vec<Grant>> {
        let (entry_id, folder_id) = subject_columns(subject);

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query(
            "DELETE FROM grants \
             WHERE entry_id IS NOT DISTINCT FROM $1 \
             AND folder_id IS NOT DISTINCT FROM $2",
        )
        .bind(entry_id)
        .bind(folder_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear grants", e))?;

        let mut created = Vec::with_capacity(grants.len());
        for (grantee, can_read, can_write) in grants {
            let (account_id, group_id) = grantee_columns(*grantee);
            let row = sqlx::query_as::<_, GrantRow>(
                "INSERT INTO grants \
                 (entry_id, folder_id, account_id, group_id, can_read, can_write) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
            )
            .bind(entry_id)
            .bind(folder_id)
            .bind(account_id)
            .bind(group_id)
            .bind(can_read)
            .bind(can_write)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to recreate grant", e)
            })?;
            created.push(Grant::try_from(row)?);
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit grant replacement", e)
        })?;

        debug!(%subject, count = created.len(), "Replaced subject grants");
        Ok(created)
    }
}
