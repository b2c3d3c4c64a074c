//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload.max_bytes;

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 批量上传使用单独的请求体上限
    let upload_routes = Router::new()
        .route(
            "/permission/api/v1/managedEntity/permission",
            post(handlers::permission::upload_permissions),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    let permission_routes = Router::new()
        .route("/permission/api/v1", get(handlers::permission::list_permissions))
        .route(
            "/permission/api/v1/managedEntityCode/{entity_code}",
            post(handlers::permission::create_permission),
        )
        .route(
            "/permission/api/v1/managedEntityCode/{entity_code}/permissionCode/{code}",
            put(handlers::permission::update_permission),
        )
        .route(
            "/permission/api/v1/permissionId/{id}",
            get(handlers::permission::get_permission_by_id)
                .delete(handlers::permission::delete_permission_by_id),
        )
        .route(
            "/permission/api/v1/permissionCode/{code}",
            get(handlers::permission::get_permission_by_code)
                .delete(handlers::permission::delete_permission_by_code),
        );

    Router::new()
        .merge(public_routes)
        .merge(permission_routes)
        .merge(upload_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
