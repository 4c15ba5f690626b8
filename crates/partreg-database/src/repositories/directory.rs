//! Registry directory implementation over PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use partreg_core::error::{AppError, ErrorKind};
use partreg_core::result::AppResult;
use partreg_entity::account::Account;
use partreg_entity::entry::Entry;
use partreg_entity::folder::Folder;
use partreg_entity::group::{Group, PUBLIC_GROUP_UUID};

use crate::store::Directory;

/// Read-only lookups of accounts, groups, entries, and folders,
/// implementing [`Directory`] over a sqlx pool.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new directory over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn entry(&self, id: i64) -> AppResult<Option<Entry>> {
        sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch entry", e))
    }

    async fn folder(&self, id: i64) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch folder", e))
    }

    async fn folder_contents(&self, folder_id: i64) -> AppResult<Vec<Entry>> {
        sqlx::query_as::<_, Entry>(
            "SELECT e.* FROM entries e \
             INNER JOIN folder_entries fe ON fe.entry_id = e.id \
             WHERE fe.folder_id = $1 \
             ORDER BY fe.position ASC",
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list folder contents", e)
        })
    }

    async fn account(&self, id: i64) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch account", e))
    }

    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch account", e))
    }

    async fn group(&self, id: i64) -> AppResult<Option<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch group", e))
    }

    async fn public_group(&self) -> AppResult<Group> {
        // The PUBLIC group is seeded by migration; recreate it if something
        // removed the row, matching create-or-retrieve semantics.
        if let Some(group) =
            sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE uuid = $1")
                .bind(PUBLIC_GROUP_UUID)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to fetch public group", e)
                })?
        {
            return Ok(group);
        }

        sqlx::query_as::<_, Group>(
            "INSERT INTO groups (uuid, label, group_type) \
             VALUES ($1, 'Public', 'public') \
             ON CONFLICT (uuid) DO UPDATE SET label = EXCLUDED.label \
             RETURNING *",
        )
        .bind(PUBLIC_GROUP_UUID)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create public group", e)
        })
    }

    async fn groups_of(&self, account_id: i64) -> AppResult<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            "SELECT g.* FROM groups g \
             INNER JOIN group_members gm ON gm.group_id = g.id \
             WHERE gm.account_id = $1 \
             ORDER BY g.id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list groups", e))
    }

    async fn public_groups_of(&self, account_id: i64) -> AppResult<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            "SELECT g.* FROM groups g \
             INNER JOIN group_members gm ON gm.group_id = g.id \
             WHERE gm.account_id = $1 AND g.group_type = 'public' \
             ORDER BY g.id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list public groups", e)
        })
    }
}
