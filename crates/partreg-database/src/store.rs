//! Store traits the authorization core is written against.
//!
//! Services and evaluators receive these as `Arc<dyn …>` so that the
//! PostgreSQL repositories and the in-memory registry are interchangeable.

use async_trait::async_trait;

use partreg_core::result::AppResult;
use partreg_entity::account::Account;
use partreg_entity::entry::{Entry, PartDraft};
use partreg_entity::folder::Folder;
use partreg_entity::group::Group;
use partreg_entity::permission::{Grant, Grantee, Subject};

/// A generalized grant existence query.
///
/// Matches grants whose subject is any of `subjects`, whose grantee is any
/// of `grantees`, and which carry every required capability. Empty subject
/// or grantee lists match nothing.
#[derive(Debug, Clone, Default)]
pub struct GrantQuery {
    /// Candidate subjects.
    pub subjects: Vec<Subject>,
    /// Candidate grantees.
    pub grantees: Vec<Grantee>,
    /// Require the read capability.
    pub require_read: bool,
    /// Require the write capability.
    pub require_write: bool,
}

impl GrantQuery {
    /// Start a query for a single subject.
    pub fn subject(subject: Subject) -> Self {
        Self {
            subjects: vec![subject],
            ..Self::default()
        }
    }

    /// Start a query over a set of subjects.
    pub fn subjects(subjects: impl IntoIterator<Item = Subject>) -> Self {
        Self {
            subjects: subjects.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a candidate grantee.
    pub fn grantee(mut self, grantee: Grantee) -> Self {
        self.grantees.push(grantee);
        self
    }

    /// Add several candidate grantees.
    pub fn grantees(mut self, grantees: impl IntoIterator<Item = Grantee>) -> Self {
        self.grantees.extend(grantees);
        self
    }

    /// Require the read capability.
    pub fn read(mut self) -> Self {
        self.require_read = true;
        self
    }

    /// Require the write capability.
    pub fn write(mut self) -> Self {
        self.require_write = true;
        self
    }

    /// Whether a concrete grant satisfies this query.
    pub fn matches(&self, grant: &Grant) -> bool {
        self.subjects.contains(&grant.subject)
            && self.grantees.contains(&grant.grantee)
            && (!self.require_read || grant.can_read)
            && (!self.require_write || grant.can_write)
    }
}

/// Persistent store of permission grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Fetch a grant by id.
    async fn get(&self, grant_id: i64) -> AppResult<Option<Grant>>;

    /// Find the grant with exactly this value shape.
    async fn find(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Option<Grant>>;

    /// Whether a grant with exactly this value shape exists.
    async fn exists(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<bool> {
        Ok(self.find(subject, grantee, can_read, can_write).await?.is_some())
    }

    /// Persist a new grant and return it.
    ///
    /// Callers are expected to have checked for an identical grant first;
    /// a duplicate tuple surfaces as a Conflict error from the store.
    async fn create(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Grant>;

    /// Delete the grant with exactly this value shape. No-op when absent.
    async fn delete(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<()>;

    /// Delete a grant by id. Returns `true` if a row was removed.
    async fn delete_by_id(&self, grant_id: i64) -> AppResult<bool>;

    /// Remove every grant whose subject matches. Returns the removed count.
    async fn clear_subject(&self, subject: Subject) -> AppResult<u64>;

    /// Whether any grant satisfies the query.
    async fn has_grant(&self, query: &GrantQuery) -> AppResult<bool>;

    /// Every grant on the subject.
    async fn grants_for(&self, subject: Subject) -> AppResult<Vec<Grant>>;

    /// Account ids holding every required capability on the subject.
    async fn account_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>>;

    /// Group ids holding every required capability on the subject.
    async fn group_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>>;

    /// Whether the account holds a direct, explicit write grant on the
    /// folder. Ownership and group membership are deliberately not
    /// consulted here.
    async fn has_explicit_write(&self, folder_id: i64, account_id: i64) -> AppResult<bool>;

    /// Folder ids on which the account or any of the groups holds a grant.
    async fn folders_granted_to(
        &self,
        account_id: i64,
        group_ids: &[i64],
    ) -> AppResult<Vec<i64>>;

    /// Atomically replace every grant on the subject with the given direct
    /// grants. The clear and the inserts happen in one unit of work.
    async fn replace_subject_grants(
        &self,
        subject: Subject,
        grants: &[(Grantee, bool, bool)],
    ) -> AppResult<Vec<Grant>>;
}

/// Read-only lookup of registry records consumed by the authorization core.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch an entry by id.
    async fn entry(&self, id: i64) -> AppResult<Option<Entry>>;

    /// Fetch a folder by id.
    async fn folder(&self, id: i64) -> AppResult<Option<Folder>>;

    /// The folder's contained entries, in folder order.
    async fn folder_contents(&self, folder_id: i64) -> AppResult<Vec<Entry>>;

    /// Fetch an account by id.
    async fn account(&self, id: i64) -> AppResult<Option<Account>>;

    /// Fetch an account by email, case-insensitively.
    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Fetch a group by id.
    async fn group(&self, id: i64) -> AppResult<Option<Group>>;

    /// The singleton PUBLIC group.
    async fn public_group(&self) -> AppResult<Group>;

    /// The account's transitive group memberships, without the implicit
    /// PUBLIC group.
    async fn groups_of(&self, account_id: i64) -> AppResult<Vec<Group>>;

    /// The public groups the account belongs to.
    async fn public_groups_of(&self, account_id: i64) -> AppResult<Vec<Group>>;
}

/// Collaborator that creates a part record when permissions are assigned to
/// a part id that does not resolve.
#[async_trait]
pub trait EntryCreator: Send + Sync {
    /// Create a part owned by `owner_email` and return its id.
    async fn create_part(&self, owner_email: &str, draft: &PartDraft) -> AppResult<i64>;
}
