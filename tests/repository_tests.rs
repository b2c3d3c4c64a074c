//! PostgreSQL 仓库测试
//!
//! 需要设置 TEST_DATABASE_URL，未设置时直接跳过

use rbac_permissions::{
    error::AppError,
    models::permission::{CreatePermissionRequest, Permission, UpdatePermissionRequest},
    repository::{PermissionRepository, PgPermissionRepository},
};

mod common;
use common::{setup_test_pool, unique_tenant};

fn permission(tenant: &str, code: &str) -> Permission {
    Permission::new(
        tenant,
        Some("entityCode1"),
        CreatePermissionRequest {
            code: code.to_string(),
            name: format!("{} name", code),
            description: "Ready and Waiting".to_string(),
            valid_until: "23-04-2004".to_string(),
        },
    )
}

macro_rules! repo_or_skip {
    () => {
        match setup_test_pool().await {
            Some(pool) => PgPermissionRepository::new(pool),
            None => {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_pg_insert_and_find() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();

    let created = repo.insert(permission(&tenant, "code1")).await.unwrap();

    let by_id = repo.find_by_id(&tenant, created.id).await.unwrap().unwrap();
    assert_eq!(by_id.code, "code1");
    assert_eq!(by_id.managed_entity_code.as_deref(), Some("entityCode1"));
    assert!(by_id.is_active());

    let by_code = repo.find_by_code(&tenant, "code1").await.unwrap().unwrap();
    assert_eq!(by_code.id, created.id);

    assert!(repo.find_by_id(&unique_tenant(), created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pg_duplicate_active_code() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();

    repo.insert(permission(&tenant, "code1")).await.unwrap();
    let err = repo.insert(permission(&tenant, "code1")).await.unwrap_err();

    assert!(matches!(err, AppError::DuplicateCode(code) if code == "code1"));
}

#[tokio::test]
async fn test_pg_deactivate_frees_code() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();

    let first = repo.insert(permission(&tenant, "code1")).await.unwrap();
    assert!(repo.deactivate(&tenant, first.id).await.unwrap());
    assert!(repo.deactivate(&tenant, first.id).await.unwrap());

    let second = repo.insert(permission(&tenant, "code1")).await.unwrap();
    let found = repo.find_by_code(&tenant, "code1").await.unwrap().unwrap();
    assert_eq!(found.id, second.id);

    let listed = repo.list_active(&tenant).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, second.id);
}

#[tokio::test]
async fn test_pg_update_details() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();
    let created = repo.insert(permission(&tenant, "code6")).await.unwrap();

    let req = UpdatePermissionRequest {
        code: None,
        name: "updatedPermissionName".to_string(),
        description: "updatedPermissionDescription".to_string(),
        valid_until: "23-04-2023".to_string(),
    };
    let updated = repo
        .update_details(&tenant, created.id, &req)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "updatedPermissionName");
    assert_eq!(updated.valid_until, "23-04-2023");
    assert_eq!(updated.code, "code6");
}

#[tokio::test]
async fn test_pg_insert_batch_is_atomic() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();
    repo.insert(permission(&tenant, "b")).await.unwrap();

    let batch = vec![permission(&tenant, "a"), permission(&tenant, "b")];
    assert!(repo.insert_batch(batch).await.is_err());
    assert_eq!(repo.list_active(&tenant).await.unwrap().len(), 1);

    let batch = vec![permission(&tenant, "c"), permission(&tenant, "d")];
    assert_eq!(repo.insert_batch(batch).await.unwrap().len(), 2);

    let batch: Vec<Permission> = ["e", "f", "g", "h"]
        .iter()
        .map(|code| permission(&tenant, code))
        .collect();
    repo.insert_batch(batch).await.unwrap();

    let codes: Vec<String> = repo
        .list_active(&tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.code)
        .collect();
    assert_eq!(codes, vec!["b", "c", "d", "e", "f", "g", "h"]);
}

#[tokio::test]
async fn test_pg_list_order_ignores_timestamps() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();

    // 同一时间戳的记录按写入顺序返回
    let created_at = chrono::Utc::now();
    let batch: Vec<Permission> = ["z", "m", "a"]
        .iter()
        .map(|code| {
            let mut p = permission(&tenant, code);
            p.created_at = created_at;
            p.updated_at = created_at;
            p
        })
        .collect();
    repo.insert_batch(batch).await.unwrap();

    let codes: Vec<String> = repo
        .list_active(&tenant)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.code)
        .collect();
    assert_eq!(codes, vec!["z", "m", "a"]);
}

#[tokio::test]
async fn test_pg_update_skips_inactive_record() {
    let repo = repo_or_skip!();
    let tenant = unique_tenant();
    let created = repo.insert(permission(&tenant, "code6")).await.unwrap();
    repo.deactivate(&tenant, created.id).await.unwrap();

    let req = UpdatePermissionRequest {
        code: None,
        name: "late".to_string(),
        description: String::new(),
        valid_until: "23-04-2023".to_string(),
    };
    assert!(repo
        .update_details(&tenant, created.id, &req)
        .await
        .unwrap()
        .is_none());
}
