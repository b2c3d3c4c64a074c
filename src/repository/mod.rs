//! Permission repository layer
//!
//! 服务层只依赖 [`PermissionRepository`]，具体存储可以是进程内存或 PostgreSQL。

use crate::{
    error::Result,
    models::permission::{Permission, UpdatePermissionRequest},
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod permission_repo;

pub use memory::InMemoryPermissionRepository;
pub use permission_repo::PgPermissionRepository;

/// 权限存储
///
/// 所有查询都限定在 `tenant_id` 内。
/// 同一租户同一 code 的活跃记录最多一条，并发创建时先写入者成功，
/// 后写入者得到 `AppError::DuplicateCode`。
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// 插入新记录
    async fn insert(&self, permission: Permission) -> Result<Permission>;

    /// 原子地插入一批记录；任意一条冲突则全部不写入
    async fn insert_batch(&self, permissions: Vec<Permission>) -> Result<Vec<Permission>>;

    async fn find_by_id(&self, tenant_id: &str, id: Uuid) -> Result<Option<Permission>>;

    /// 按 code 查找：优先返回活跃记录，否则返回最近停用的记录
    async fn find_by_code(&self, tenant_id: &str, code: &str) -> Result<Option<Permission>>;

    /// 按插入顺序列出活跃记录
    async fn list_active(&self, tenant_id: &str) -> Result<Vec<Permission>>;

    /// 替换活跃记录的可变字段；记录不存在或已停用时返回 None
    async fn update_details(
        &self,
        tenant_id: &str,
        id: Uuid,
        req: &UpdatePermissionRequest,
    ) -> Result<Option<Permission>>;

    /// 软删除。记录不存在时返回 false，已停用的记录视为成功
    async fn deactivate(&self, tenant_id: &str, id: Uuid) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
