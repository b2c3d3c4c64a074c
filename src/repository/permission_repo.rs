//! Permission repository (权限数据访问, PostgreSQL)

use super::PermissionRepository;
use crate::{
    db,
    error::{AppError, Result},
    models::permission::{Permission, UpdatePermissionRequest},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgPermissionRepository {
    db: PgPool,
}

impl PgPermissionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// 部分唯一索引冲突映射为 DuplicateCode
fn map_insert_error(e: sqlx::Error, code: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateCode(code.to_string())
        }
        _ => AppError::Database(e),
    }
}

const INSERT_SQL: &str = r#"
    INSERT INTO permissions (
        id, tenant_id, managed_entity_code, code, name, description,
        valid_until, active, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING *
"#;

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn insert(&self, permission: Permission) -> Result<Permission> {
        let created = sqlx::query_as::<_, Permission>(INSERT_SQL)
            .bind(permission.id)
            .bind(&permission.tenant_id)
            .bind(&permission.managed_entity_code)
            .bind(&permission.code)
            .bind(&permission.name)
            .bind(&permission.description)
            .bind(&permission.valid_until)
            .bind(permission.is_active())
            .bind(permission.created_at)
            .bind(permission.updated_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_insert_error(e, &permission.code))?;

        Ok(created)
    }

    async fn insert_batch(&self, permissions: Vec<Permission>) -> Result<Vec<Permission>> {
        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(permissions.len());

        for permission in &permissions {
            let row = sqlx::query_as::<_, Permission>(INSERT_SQL)
                .bind(permission.id)
                .bind(&permission.tenant_id)
                .bind(&permission.managed_entity_code)
                .bind(&permission.code)
                .bind(&permission.name)
                .bind(&permission.description)
                .bind(&permission.valid_until)
                .bind(permission.is_active())
                .bind(permission.created_at)
                .bind(permission.updated_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_insert_error(e, &permission.code))?;
            created.push(row);
        }

        // 出错时 tx 被 drop，自动回滚
        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(permission)
    }

    async fn find_by_code(&self, tenant_id: &str, code: &str) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            SELECT *
            FROM permissions
            WHERE tenant_id = $1 AND code = $2
            ORDER BY active DESC, updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(code)
        .fetch_optional(&self.db)
        .await?;

        Ok(permission)
    }

    async fn list_active(&self, tenant_id: &str) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT *
            FROM permissions
            WHERE tenant_id = $1 AND active
            ORDER BY seq
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn update_details(
        &self,
        tenant_id: &str,
        id: Uuid,
        req: &UpdatePermissionRequest,
    ) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            UPDATE permissions
            SET
                name = $3,
                description = $4,
                valid_until = $5,
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.valid_until)
        .fetch_optional(&self.db)
        .await?;

        Ok(permission)
    }

    async fn deactivate(&self, tenant_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET
                updated_at = CASE WHEN active THEN NOW() ELSE updated_at END,
                active = FALSE
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<()> {
        db::record_pool_metrics(&self.db);

        match db::health_check(&self.db).await {
            db::HealthStatus::Healthy => Ok(()),
            db::HealthStatus::Unhealthy(msg) => Err(AppError::Internal(msg)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
