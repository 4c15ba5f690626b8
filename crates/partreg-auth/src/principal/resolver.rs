//! Resolves user identifiers to accounts and group memberships.

use std::sync::Arc;

use partreg_core::error::AppError;
use partreg_core::result::AppResult;
use partreg_database::store::Directory;
use partreg_entity::account::Account;
use partreg_entity::group::Group;

/// Resolves a user identifier (an email, compared case-insensitively) to an
/// account, and an account to its group memberships.
///
/// Read-only; no side effects.
#[derive(Clone)]
pub struct PrincipalResolver {
    /// Registry directory.
    dir: Arc<dyn Directory>,
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver").finish()
    }
}

impl PrincipalResolver {
    /// Creates a new principal resolver.
    pub fn new(dir: Arc<dyn Directory>) -> Self {
        Self { dir }
    }

    /// Resolves the account for a user identifier, or errors with NotFound.
    pub async fn resolve(&self, user_id: &str) -> AppResult<Account> {
        self.try_resolve(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("No account for '{user_id}'")))
    }

    /// Resolves the account for a user identifier, if one exists.
    pub async fn try_resolve(&self, user_id: &str) -> AppResult<Option<Account>> {
        self.dir.account_by_email(user_id).await
    }

    /// Whether the user identifier belongs to an administrator account.
    ///
    /// Unknown identifiers are simply not administrators.
    pub async fn is_administrator(&self, user_id: &str) -> AppResult<bool> {
        Ok(self
            .try_resolve(user_id)
            .await?
            .is_some_and(|account| account.is_admin))
    }

    /// The account's transitive group memberships, with the implicit PUBLIC
    /// group always included.
    pub async fn groups_of(&self, account: &Account) -> AppResult<Vec<Group>> {
        let mut groups = self.dir.groups_of(account.id).await?;
        let public = self.dir.public_group().await?;
        if !groups.iter().any(|g| g.id == public.id) {
            groups.push(public);
        }
        Ok(groups)
    }
}
