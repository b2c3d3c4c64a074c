//! 权限管理服务
//!
//! 业务规则：
//! - 同一租户内活跃权限的 code 唯一
//! - 删除为软删除，记录保留且仍可按 id / code 查到
//! - 更新只替换 name、description、validUntil

use crate::{
    error::{AppError, Result},
    models::permission::*,
    repository::PermissionRepository,
    services::import::{self, ImportUpload},
    tenant::TenantContext,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub struct PermissionService {
    repo: Arc<dyn PermissionRepository>,
    max_import_rows: usize,
}

impl PermissionService {
    pub fn new(repo: Arc<dyn PermissionRepository>, max_import_rows: usize) -> Self {
        Self {
            repo,
            max_import_rows,
        }
    }

    /// 创建权限
    pub async fn create(
        &self,
        tenant: &TenantContext,
        managed_entity_code: Option<&str>,
        req: CreatePermissionRequest,
    ) -> Result<Permission> {
        req.validate()?;
        check_managed_entity_code(managed_entity_code)?;

        let permission = Permission::new(tenant.tenant_id(), managed_entity_code, req);
        let created = self.repo.insert(permission).await?;

        tracing::info!(
            tenant = %tenant,
            id = %created.id,
            code = %created.code,
            managed_entity = created.managed_entity_code.as_deref().unwrap_or("-"),
            "Permission created"
        );

        Ok(created)
    }

    /// 按 id 获取权限（包含已停用的）
    pub async fn get_by_id(&self, tenant: &TenantContext, id: &str) -> Result<Permission> {
        let id = parse_id(id)?;

        self.repo
            .find_by_id(tenant.tenant_id(), id)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))
    }

    /// 按 code 获取权限；没有活跃记录时返回最近停用的记录
    pub async fn get_by_code(&self, tenant: &TenantContext, code: &str) -> Result<Permission> {
        self.repo
            .find_by_code(tenant.tenant_id(), code)
            .await?
            .ok_or_else(|| AppError::not_found("Permission not found"))
    }

    /// 列出租户下所有活跃权限
    pub async fn list_all(&self, tenant: &TenantContext) -> Result<Vec<Permission>> {
        self.repo.list_active(tenant.tenant_id()).await
    }

    /// 按 code 更新权限
    pub async fn update(
        &self,
        tenant: &TenantContext,
        managed_entity_code: Option<&str>,
        code: &str,
        req: UpdatePermissionRequest,
    ) -> Result<Permission> {
        req.validate()?;
        check_managed_entity_code(managed_entity_code)?;

        if let Some(body_code) = req.code.as_deref() {
            if body_code != code {
                return Err(AppError::BadRequest(format!(
                    "Permission code cannot be changed (path '{}', body '{}')",
                    code, body_code
                )));
            }
        }

        let existing = self.get_by_code(tenant, code).await?;

        if !existing.is_active() {
            return Err(AppError::Conflict(format!(
                "Permission '{}' is inactive and cannot be updated",
                code
            )));
        }

        // 记录有所属托管实体时，路径中的实体必须一致
        if let (Some(owner), Some(requested)) =
            (existing.managed_entity_code.as_deref(), managed_entity_code)
        {
            if owner != requested {
                return Err(AppError::not_found("Permission not found"));
            }
        }

        let updated = self
            .repo
            .update_details(tenant.tenant_id(), existing.id, &req)
            .await?
            .ok_or_else(|| {
                // 查询之后被并发停用
                AppError::Conflict(format!(
                    "Permission '{}' is inactive and cannot be updated",
                    code
                ))
            })?;

        tracing::info!(tenant = %tenant, id = %updated.id, code = %updated.code, "Permission updated");

        Ok(updated)
    }

    /// 按 id 软删除，重复删除视为成功
    pub async fn delete_by_id(&self, tenant: &TenantContext, id: &str) -> Result<()> {
        let id = parse_id(id)?;

        if !self.repo.deactivate(tenant.tenant_id(), id).await? {
            return Err(AppError::not_found("Permission not found"));
        }

        tracing::info!(tenant = %tenant, id = %id, "Permission deactivated");
        Ok(())
    }

    /// 按 code 软删除，重复删除视为成功
    pub async fn delete_by_code(&self, tenant: &TenantContext, code: &str) -> Result<()> {
        let existing = self.get_by_code(tenant, code).await?;

        if existing.is_active() {
            self.repo.deactivate(tenant.tenant_id(), existing.id).await?;
            tracing::info!(tenant = %tenant, id = %existing.id, code = %code, "Permission deactivated");
        } else {
            tracing::debug!(tenant = %tenant, code = %code, "Permission already inactive");
        }

        Ok(())
    }

    /// 批量导入
    ///
    /// 先校验整个文件和已有的活跃 code，全部通过后一次性写入。
    pub async fn bulk_import(
        &self,
        tenant: &TenantContext,
        upload: ImportUpload,
    ) -> Result<ImportResult> {
        let ImportUpload { file_name, content } = upload;
        let rows = import::parse_rows(&content, self.max_import_rows)?;
        drop(content);

        for row in &rows {
            if let Some(existing) = self
                .repo
                .find_by_code(tenant.tenant_id(), &row.request.code)
                .await?
            {
                if existing.is_active() {
                    tracing::warn!(
                        tenant = %tenant,
                        file = %file_name,
                        line = row.line,
                        code = %row.request.code,
                        "Import rejected: code already exists"
                    );
                    return Err(AppError::DuplicateCode(row.request.code.clone()));
                }
            }
        }

        let permissions: Vec<Permission> = rows
            .into_iter()
            .map(|row| Permission::new(tenant.tenant_id(), None, row.request))
            .collect();

        let imported = self.repo.insert_batch(permissions).await?.len();

        tracing::info!(tenant = %tenant, file = %file_name, imported, "Permissions imported");

        Ok(ImportResult {
            file_name,
            imported,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.repo.backend_name()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.repo.health_check().await
    }
}

fn check_managed_entity_code(code: Option<&str>) -> Result<()> {
    match code {
        Some(code) => validate_managed_entity_code(code).map_err(|e| {
            AppError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid managedEntityCode".to_string()),
            )
        }),
        None => Ok(()),
    }
}

/// 非法 id 与不存在的 id 一样按 404 处理
fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::not_found("Permission not found"))
}
