//! In-memory permission repository.
//!
//! Records live in a `Vec` guarded by `tokio::sync::RwLock`, which keeps insertion order for
//! listing. Lookups scan linearly; this backend is meant for tests, local development and
//! deployments that do not need durability. Every mutation takes the write lock, so the
//! duplicate-code check and the insert happen atomically (first writer wins).

use super::PermissionRepository;
use crate::{
    error::{AppError, Result},
    models::permission::{Permission, UpdatePermissionRequest},
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryPermissionRepository {
    records: Arc<RwLock<Vec<Permission>>>,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn has_active_code(records: &[Permission], tenant_id: &str, code: &str) -> bool {
        records
            .iter()
            .any(|p| p.is_active() && p.tenant_id == tenant_id && p.code == code)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn insert(&self, permission: Permission) -> Result<Permission> {
        let mut records = self.records.write().await;

        if Self::has_active_code(&records, &permission.tenant_id, &permission.code) {
            return Err(AppError::DuplicateCode(permission.code));
        }

        records.push(permission.clone());
        Ok(permission)
    }

    async fn insert_batch(&self, permissions: Vec<Permission>) -> Result<Vec<Permission>> {
        let mut records = self.records.write().await;

        let mut seen = HashSet::new();
        for permission in &permissions {
            let key = (permission.tenant_id.as_str(), permission.code.as_str());
            if !seen.insert(key)
                || Self::has_active_code(&records, &permission.tenant_id, &permission.code)
            {
                return Err(AppError::DuplicateCode(permission.code.clone()));
            }
        }

        records.extend(permissions.iter().cloned());
        Ok(permissions)
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> Result<Option<Permission>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|p| p.id == id && p.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_code(&self, tenant_id: &str, code: &str) -> Result<Option<Permission>> {
        let records = self.records.read().await;
        let matching = records
            .iter()
            .filter(|p| p.tenant_id == tenant_id && p.code == code);

        if let Some(active) = matching.clone().find(|p| p.is_active()) {
            return Ok(Some(active.clone()));
        }

        Ok(matching.max_by_key(|p| p.updated_at).cloned())
    }

    async fn list_active(&self, tenant_id: &str) -> Result<Vec<Permission>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|p| p.is_active() && p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn update_details(
        &self,
        tenant_id: &str,
        id: Uuid,
        req: &UpdatePermissionRequest,
    ) -> Result<Option<Permission>> {
        let mut records = self.records.write().await;
        Ok(records
            .iter_mut()
            .find(|p| p.id == id && p.tenant_id == tenant_id && p.is_active())
            .map(|p| {
                p.apply_update(req);
                p.clone()
            }))
    }

    async fn deactivate(&self, tenant_id: &str, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        match records
            .iter_mut()
            .find(|p| p.id == id && p.tenant_id == tenant_id)
        {
            Some(permission) => {
                permission.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
