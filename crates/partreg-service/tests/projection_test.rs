//! Integration tests for the permission projection views.

use std::sync::Arc;

use partreg_auth::{AccessEvaluator, PrincipalResolver};
use partreg_database::MemoryRegistry;
use partreg_database::store::{Directory, GrantStore};
use partreg_entity::group::GroupType;
use partreg_entity::permission::{AccessType, Grantee, Subject};
use partreg_service::PermissionProjection;

fn projection(registry: &MemoryRegistry) -> PermissionProjection {
    let dir: Arc<dyn Directory> = Arc::new(registry.clone());
    let grants: Arc<dyn GrantStore> = Arc::new(registry.clone());
    let principals = PrincipalResolver::new(dir.clone());
    let evaluator = AccessEvaluator::new(dir.clone(), grants.clone(), principals.clone());
    PermissionProjection::new(dir, grants, evaluator, principals)
}

#[tokio::test]
async fn test_set_permissions_one_row_per_capability() {
    let registry = MemoryRegistry::new();
    let bob = registry.add_account("bob@x.org", "Bob Jones", false).await;
    let lab = registry.add_group("Keasling Lab", GroupType::Private).await;
    let entry = registry.add_entry("alice@x.org", "plasmid").await;
    let subject = Subject::Entry(entry.id);

    registry.create(subject, Grantee::Account(bob.id), true, false).await.unwrap();
    registry.create(subject, Grantee::Account(bob.id), false, true).await.unwrap();
    registry.create(subject, Grantee::Group(lab.id), true, false).await.unwrap();

    let rows = projection(&registry)
        .list_set_permissions(subject, false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    let bob_rows: Vec<_> = rows
        .iter()
        .filter(|r| r.grantee == Grantee::Account(bob.id))
        .collect();
    assert_eq!(bob_rows.len(), 2);
    assert!(bob_rows.iter().all(|r| r.display == "Bob Jones"));
    assert!(bob_rows.iter().any(|r| r.access == AccessType::ReadEntry));
    assert!(bob_rows.iter().any(|r| r.access == AccessType::WriteEntry));

    let lab_row = rows
        .iter()
        .find(|r| r.grantee == Grantee::Group(lab.id))
        .unwrap();
    assert_eq!(lab_row.display, "Keasling Lab");
    assert_eq!(lab_row.access, AccessType::ReadEntry);
    assert_eq!(lab_row.subject, Some(subject));
}

#[tokio::test]
async fn test_public_read_row_hidden_unless_requested() {
    let registry = MemoryRegistry::new();
    let entry = registry.add_entry("alice@x.org", "plasmid").await;
    let subject = Subject::Entry(entry.id);
    let public = registry.public_group().await.unwrap();
    registry.create(subject, Grantee::Group(public.id), true, false).await.unwrap();

    let proj = projection(&registry);
    let without = proj.list_set_permissions(subject, false).await.unwrap();
    assert!(without.is_empty());

    let with = proj.list_set_permissions(subject, true).await.unwrap();
    assert_eq!(with.len(), 1);
    assert_eq!(with[0].grantee, Grantee::Group(public.id));
    assert_eq!(with[0].access, AccessType::ReadEntry);
}

#[tokio::test]
async fn test_rows_for_missing_records_are_skipped() {
    let registry = MemoryRegistry::new();
    let entry = registry.add_entry("alice@x.org", "plasmid").await;
    let subject = Subject::Entry(entry.id);

    // Grants pointing at records that no longer resolve.
    registry.create(subject, Grantee::Account(999), true, false).await.unwrap();
    registry.create(subject, Grantee::Group(998), true, false).await.unwrap();

    let rows = projection(&registry)
        .list_set_permissions(subject, false)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_folder_permissions_require_write_authority() {
    let registry = MemoryRegistry::new();
    registry.add_account("alice@x.org", "Alice", false).await;
    let bob = registry.add_account("bob@x.org", "Bob", false).await;
    registry.add_account("mallory@x.org", "Mallory", false).await;
    let folder = registry.add_folder("alice@x.org", "lib", false).await;
    let subject = Subject::Folder(folder.id);
    let public = registry.public_group().await.unwrap();
    registry.create(subject, Grantee::Account(bob.id), true, false).await.unwrap();
    registry.create(subject, Grantee::Group(public.id), true, false).await.unwrap();

    let proj = projection(&registry);
    let err = proj
        .list_folder_permissions("mallory@x.org", folder.id)
        .await
        .unwrap_err();
    assert!(err.is_authorization());

    let missing = proj
        .list_folder_permissions("alice@x.org", 999)
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    // The owner sees every row, public grant included.
    let rows = proj
        .list_folder_permissions("alice@x.org", folder.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.grantee == Grantee::Group(public.id)));
    assert!(rows.iter().all(|r| r.access == AccessType::ReadFolder));
}

#[tokio::test]
async fn test_default_permissions_cover_public_groups_only() {
    let registry = MemoryRegistry::new();
    let alice = registry.add_account("alice@x.org", "Alice", false).await;
    let open = registry.add_group("iGEM", GroupType::Public).await;
    let closed = registry.add_group("Lab", GroupType::Private).await;
    registry.add_member(open.id, alice.id).await;
    registry.add_member(closed.id, alice.id).await;

    let rows = projection(&registry)
        .default_permissions_for(alice.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].grantee, Grantee::Group(open.id));
    assert_eq!(rows[0].access, AccessType::ReadEntry);
    assert_eq!(rows[0].subject, None);
    assert_eq!(rows[0].display, "iGEM");

    let err = projection(&registry)
        .default_permissions_for(999)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_permission_folders_collect_direct_and_group_shares() {
    let registry = MemoryRegistry::new();
    let bob = registry.add_account("bob@x.org", "Bob", false).await;
    let lab = registry.add_group("Lab", GroupType::Private).await;
    registry.add_member(lab.id, bob.id).await;
    let direct = registry.add_folder("alice@x.org", "direct", false).await;
    let via_group = registry.add_folder("alice@x.org", "group", false).await;
    let unshared = registry.add_folder("alice@x.org", "private", false).await;

    registry
        .create(Subject::Folder(direct.id), Grantee::Account(bob.id), true, false)
        .await
        .unwrap();
    registry
        .create(Subject::Folder(via_group.id), Grantee::Group(lab.id), true, false)
        .await
        .unwrap();
    // Entry grants never surface as shared folders.
    let entry = registry.add_entry("alice@x.org", "plasmid").await;
    registry
        .create(Subject::Entry(entry.id), Grantee::Account(bob.id), true, false)
        .await
        .unwrap();

    let folders = projection(&registry)
        .permission_folders("bob@x.org")
        .await
        .unwrap();
    let ids: Vec<i64> = folders.iter().map(|f| f.id).collect();
    assert!(ids.contains(&direct.id));
    assert!(ids.contains(&via_group.id));
    assert!(!ids.contains(&unshared.id));
    assert_eq!(ids.len(), 2);
}
