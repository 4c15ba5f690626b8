//! In-memory registry backing the store traits, using a Tokio mutex.
//!
//! Implements [`GrantStore`], [`Directory`], and [`EntryCreator`] over plain
//! maps. Used by the test suites and by single-node tooling that does not
//! need PostgreSQL; the seeding helpers build a small registry world.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use partreg_core::error::AppError;
use partreg_core::result::AppResult;
use partreg_entity::account::Account;
use partreg_entity::entry::{Entry, PartDraft};
use partreg_entity::folder::Folder;
use partreg_entity::group::{Group, GroupType, PUBLIC_GROUP_UUID};
use partreg_entity::permission::{Grant, Grantee, Subject};

use crate::store::{Directory, EntryCreator, GrantQuery, GrantStore};

/// Internal state for the in-memory registry.
#[derive(Debug)]
struct Inner {
    /// Next surrogate id, shared across record kinds.
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
    groups: BTreeMap<i64, Group>,
    /// Group id -> member account ids.
    members: BTreeMap<i64, Vec<i64>>,
    entries: BTreeMap<i64, Entry>,
    folders: BTreeMap<i64, Folder>,
    /// Folder id -> ordered entry ids.
    contents: BTreeMap<i64, Vec<i64>>,
    grants: BTreeMap<i64, Grant>,
    /// Id of the seeded PUBLIC group.
    public_group_id: i64,
}

impl Inner {
    fn take_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory implementation of all three store traits.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    /// Protected inner state.
    state: Arc<Mutex<Inner>>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Creates a new registry with the PUBLIC group pre-seeded.
    pub fn new() -> Self {
        let public = Group {
            id: 1,
            uuid: PUBLIC_GROUP_UUID,
            label: "Public".to_string(),
            group_type: GroupType::Public,
            created_at: Utc::now(),
        };
        let mut groups = BTreeMap::new();
        groups.insert(public.id, public);

        Self {
            state: Arc::new(Mutex::new(Inner {
                next_id: 2,
                accounts: BTreeMap::new(),
                groups,
                members: BTreeMap::new(),
                entries: BTreeMap::new(),
                folders: BTreeMap::new(),
                contents: BTreeMap::new(),
                grants: BTreeMap::new(),
                public_group_id: 1,
            })),
        }
    }

    /// Seed an account.
    pub async fn add_account(&self, email: &str, full_name: &str, is_admin: bool) -> Account {
        let mut state = self.state.lock().await;
        let account = Account {
            id: state.take_id(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            is_admin,
            created_at: Utc::now(),
        };
        state.accounts.insert(account.id, account.clone());
        account
    }

    /// Seed a group.
    pub async fn add_group(&self, label: &str, group_type: GroupType) -> Group {
        let mut state = self.state.lock().await;
        let group = Group {
            id: state.take_id(),
            uuid: uuid::Uuid::new_v4(),
            label: label.to_string(),
            group_type,
            created_at: Utc::now(),
        };
        state.groups.insert(group.id, group.clone());
        group
    }

    /// Add an account to a group.
    pub async fn add_member(&self, group_id: i64, account_id: i64) {
        let mut state = self.state.lock().await;
        let members = state.members.entry(group_id).or_default();
        if !members.contains(&account_id) {
            members.push(account_id);
        }
    }

    /// Seed an entry.
    pub async fn add_entry(&self, owner_email: &str, record_type: &str) -> Entry {
        let mut state = self.state.lock().await;
        let entry = Entry {
            id: state.take_id(),
            owner_email: owner_email.to_string(),
            record_type: record_type.to_string(),
            name: None,
            created_at: Utc::now(),
        };
        state.entries.insert(entry.id, entry.clone());
        entry
    }

    /// Seed a folder.
    pub async fn add_folder(&self, owner_email: &str, name: &str, propagate: bool) -> Folder {
        let mut state = self.state.lock().await;
        let folder = Folder {
            id: state.take_id(),
            owner_email: owner_email.to_string(),
            name: name.to_string(),
            propagate_permissions: propagate,
            created_at: Utc::now(),
        };
        state.folders.insert(folder.id, folder.clone());
        folder
    }

    /// Append an entry to a folder's ordered contents.
    pub async fn add_to_folder(&self, folder_id: i64, entry_id: i64) {
        let mut state = self.state.lock().await;
        let contents = state.contents.entry(folder_id).or_default();
        if !contents.contains(&entry_id) {
            contents.push(entry_id);
        }
    }

    /// Flip a folder's propagation flag.
    pub async fn set_propagation(&self, folder_id: i64, propagate: bool) {
        let mut state = self.state.lock().await;
        if let Some(folder) = state.folders.get_mut(&folder_id) {
            folder.propagate_permissions = propagate;
        }
    }

    /// Number of stored grants, across all subjects.
    pub async fn grant_count(&self) -> usize {
        self.state.lock().await.grants.len()
    }
}

#[async_trait]
impl GrantStore for MemoryRegistry {
    async fn get(&self, grant_id: i64) -> AppResult<Option<Grant>> {
        Ok(self.state.lock().await.grants.get(&grant_id).cloned())
    }

    async fn find(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Option<Grant>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .values()
            .find(|g| g.shape() == (subject, grantee, can_read, can_write))
            .cloned())
    }

    async fn create(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<Grant> {
        let mut state = self.state.lock().await;
        if state
            .grants
            .values()
            .any(|g| g.shape() == (subject, grantee, can_read, can_write))
        {
            return Err(AppError::conflict("An identical grant already exists"));
        }
        let grant = Grant {
            id: state.take_id(),
            subject,
            grantee,
            can_read,
            can_write,
        };
        state.grants.insert(grant.id, grant.clone());
        debug!(grant_id = grant.id, %subject, %grantee, "Grant created");
        Ok(grant)
    }

    async fn delete(
        &self,
        subject: Subject,
        grantee: Grantee,
        can_read: bool,
        can_write: bool,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .grants
            .retain(|_, g| g.shape() != (subject, grantee, can_read, can_write));
        Ok(())
    }

    async fn delete_by_id(&self, grant_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().await.grants.remove(&grant_id).is_some())
    }

    async fn clear_subject(&self, subject: Subject) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.grants.len();
        state.grants.retain(|_, g| g.subject != subject);
        Ok((before - state.grants.len()) as u64)
    }

    async fn has_grant(&self, query: &GrantQuery) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.grants.values().any(|g| query.matches(g)))
    }

    async fn grants_for(&self, subject: Subject) -> AppResult<Vec<Grant>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .values()
            .filter(|g| g.subject == subject)
            .cloned()
            .collect())
    }

    async fn account_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .grants
            .values()
            .filter(|g| {
                g.subject == subject
                    && (!require_read || g.can_read)
                    && (!require_write || g.can_write)
            })
            .filter_map(|g| g.grantee.account_id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn group_grantees(
        &self,
        subject: Subject,
        require_read: bool,
        require_write: bool,
    ) -> AppResult<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .grants
            .values()
            .filter(|g| {
                g.subject == subject
                    && (!require_read || g.can_read)
                    && (!require_write || g.can_write)
            })
            .filter_map(|g| g.grantee.group_id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn has_explicit_write(&self, folder_id: i64, account_id: i64) -> AppResult<bool> {
        let state = self.state.lock().await;
        Ok(state.grants.values().any(|g| {
            g.subject == Subject::Folder(folder_id)
                && g.grantee == Grantee::Account(account_id)
                && g.can_write
        }))
    }

    async fn folders_granted_to(
        &self,
        account_id: i64,
        group_ids: &[i64],
    ) -> AppResult<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .grants
            .values()
            .filter(|g| match g.grantee {
                Grantee::Account(id) => id == account_id,
                Grantee::Group(id) => group_ids.contains(&id),
            })
            .filter_map(|g| g.subject.folder_id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn replace_subject_grants(
        &self,
        subject: Subject,
        grants: &[(Grantee, bool, bool)],
    ) -> AppResult<Vec<Grant>> {
        // One lock held across clear and recreate keeps this atomic.
        let mut state = self.state.lock().await;
        state.grants.retain(|_, g| g.subject != subject);

        let mut created = Vec::with_capacity(grants.len());
        for (grantee, can_read, can_write) in grants {
            let grant = Grant {
                id: state.take_id(),
                subject,
                grantee: *grantee,
                can_read: *can_read,
                can_write: *can_write,
            };
            state.grants.insert(grant.id, grant.clone());
            created.push(grant);
        }
        debug!(%subject, count = created.len(), "Replaced subject grants");
        Ok(created)
    }
}

#[async_trait]
impl Directory for MemoryRegistry {
    async fn entry(&self, id: i64) -> AppResult<Option<Entry>> {
        Ok(self.state.lock().await.entries.get(&id).cloned())
    }

    async fn folder(&self, id: i64) -> AppResult<Option<Folder>> {
        Ok(self.state.lock().await.folders.get(&id).cloned())
    }

    async fn folder_contents(&self, folder_id: i64) -> AppResult<Vec<Entry>> {
        let state = self.state.lock().await;
        let ids = state.contents.get(&folder_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.entries.get(id).cloned())
            .collect())
    }

    async fn account(&self, id: i64) -> AppResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email_matches(email))
            .cloned())
    }

    async fn group(&self, id: i64) -> AppResult<Option<Group>> {
        Ok(self.state.lock().await.groups.get(&id).cloned())
    }

    async fn public_group(&self) -> AppResult<Group> {
        let state = self.state.lock().await;
        state
            .groups
            .get(&state.public_group_id)
            .cloned()
            .ok_or_else(|| AppError::internal("PUBLIC group missing from registry"))
    }

    async fn groups_of(&self, account_id: i64) -> AppResult<Vec<Group>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .filter(|(_, members)| members.contains(&account_id))
            .filter_map(|(group_id, _)| state.groups.get(group_id).cloned())
            .collect())
    }

    async fn public_groups_of(&self, account_id: i64) -> AppResult<Vec<Group>> {
        let groups = self.groups_of(account_id).await?;
        Ok(groups
            .into_iter()
            .filter(|g| g.group_type == GroupType::Public)
            .collect())
    }
}

#[async_trait]
impl EntryCreator for MemoryRegistry {
    async fn create_part(&self, owner_email: &str, draft: &PartDraft) -> AppResult<i64> {
        let mut state = self.state.lock().await;
        let entry = Entry {
            id: state.take_id(),
            owner_email: owner_email.to_string(),
            record_type: draft.record_type.clone(),
            name: draft.name.clone(),
            created_at: Utc::now(),
        };
        let id = entry.id;
        state.entries.insert(id, entry);
        debug!(entry_id = id, owner = owner_email, "Part created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_rejects_duplicate_tuple() {
        let registry = MemoryRegistry::new();
        let subject = Subject::Entry(10);
        let grantee = Grantee::Account(20);

        registry.create(subject, grantee, true, false).await.unwrap();
        let err = registry
            .create(subject, grantee, true, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, partreg_core::error::ErrorKind::Conflict);

        // A different capability shape is a different grant.
        registry.create(subject, grantee, true, true).await.unwrap();
        assert_eq!(registry.grant_count().await, 2);
    }

    #[tokio::test]
    async fn test_has_grant_requires_both_sides() {
        let registry = MemoryRegistry::new();
        let subject = Subject::Folder(1);
        registry
            .create(subject, Grantee::Group(5), true, false)
            .await
            .unwrap();

        let hit = GrantQuery::subject(subject).grantee(Grantee::Group(5)).read();
        assert!(registry.has_grant(&hit).await.unwrap());

        let wrong_grantee = GrantQuery::subject(subject).grantee(Grantee::Group(6)).read();
        assert!(!registry.has_grant(&wrong_grantee).await.unwrap());

        let needs_write = GrantQuery::subject(subject).grantee(Grantee::Group(5)).write();
        assert!(!registry.has_grant(&needs_write).await.unwrap());

        let empty = GrantQuery::subject(subject);
        assert!(!registry.has_grant(&empty).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_subject_leaves_other_subjects() {
        let registry = MemoryRegistry::new();
        registry
            .create(Subject::Entry(1), Grantee::Account(9), true, false)
            .await
            .unwrap();
        registry
            .create(Subject::Entry(1), Grantee::Group(9), true, true)
            .await
            .unwrap();
        registry
            .create(Subject::Entry(2), Grantee::Account(9), true, false)
            .await
            .unwrap();

        let removed = registry.clear_subject(Subject::Entry(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(registry.grant_count().await, 1);
        assert!(
            registry
                .grants_for(Subject::Entry(2))
                .await
                .unwrap()
                .len()
                == 1
        );
    }

    #[tokio::test]
    async fn test_replace_subject_grants_swaps_the_full_set() {
        let registry = MemoryRegistry::new();
        let subject = Subject::Entry(1);
        registry
            .create(subject, Grantee::Account(7), true, false)
            .await
            .unwrap();
        registry
            .create(subject, Grantee::Group(8), true, false)
            .await
            .unwrap();

        let created = registry
            .replace_subject_grants(subject, &[(Grantee::Account(9), true, true)])
            .await
            .unwrap();
        assert_eq!(created.len(), 1);

        let remaining = registry.grants_for(subject).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].grantee, Grantee::Account(9));
        assert!(remaining[0].can_write);
    }

    #[tokio::test]
    async fn test_folder_contents_preserve_order() {
        let registry = MemoryRegistry::new();
        let folder = registry.add_folder("alice@x.org", "lib", false).await;
        let e1 = registry.add_entry("alice@x.org", "plasmid").await;
        let e2 = registry.add_entry("alice@x.org", "strain").await;
        registry.add_to_folder(folder.id, e2.id).await;
        registry.add_to_folder(folder.id, e1.id).await;

        let contents = registry.folder_contents(folder.id).await.unwrap();
        let ids: Vec<i64> = contents.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![e2.id, e1.id]);
    }

    #[tokio::test]
    async fn test_public_group_is_seeded() {
        let registry = MemoryRegistry::new();
        let public = registry.public_group().await.unwrap();
        assert!(public.is_public_group());
        assert_eq!(public.group_type, GroupType::Public);
    }
}
