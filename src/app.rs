//! 应用装配
//! 根据配置选择存储后端并构建 AppState

use crate::{
    config::{AppConfig, StoreBackend},
    db,
    middleware::AppState,
    repository::{InMemoryPermissionRepository, PermissionRepository, PgPermissionRepository},
    services::PermissionService,
};
use std::sync::Arc;

/// 按配置创建存储
pub async fn build_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn PermissionRepository>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory permission store; data is lost on restart");
            Ok(Arc::new(InMemoryPermissionRepository::new()))
        }
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool).await?;
            tracing::info!("Database initialized");
            Ok(Arc::new(PgPermissionRepository::new(pool)))
        }
    }
}

/// 用给定的存储构建应用状态
pub fn build_state(config: AppConfig, repository: Arc<dyn PermissionRepository>) -> Arc<AppState> {
    let permission_service = Arc::new(PermissionService::new(repository, config.upload.max_rows));

    Arc::new(AppState {
        config,
        permission_service,
    })
}
