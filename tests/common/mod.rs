//! 测试公共模块
//! 提供测试辅助函数和测试工具
//!
//! 每个测试都构建自己的内存存储，测试之间不共享状态。

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rbac_permissions::{
    app,
    config::{
        AppConfig, DatabaseConfig, LoggingConfig, ServerConfig, StoreBackend, StoreConfig,
        TenancyConfig, UploadConfig,
    },
    models::permission::Permission,
    repository::InMemoryPermissionRepository,
    routes,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const TENANT_HEADER: &str = "powerpayTenantId";
pub const TENANT: &str = "permission_test";
pub const ENTITY: &str = "entityCode1";
pub const BOUNDARY: &str = "rbac-test-boundary";

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").ok().map(Secret::new),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        tenancy: TenancyConfig {
            header: TENANT_HEADER.to_string(),
            default_tenant: "default".to_string(),
        },
        upload: UploadConfig {
            max_bytes: 64 * 1024,
            max_rows: 100,
        },
    }
}

/// 基于全新内存存储的路由
pub fn test_app() -> Router {
    test_app_with_config(create_test_config())
}

pub fn test_app_with_config(config: AppConfig) -> Router {
    let state = app::build_state(config, Arc::new(InMemoryPermissionRepository::new()));
    routes::create_router(state)
}

/// 测试用的权限请求体
pub fn permission_body(code: &str, name: &str, description: &str, valid_until: &str) -> Value {
    json!({
        "code": code,
        "name": name,
        "description": description,
        "validUntil": valid_until,
    })
}

pub fn json_request(method: Method, uri: &str, tenant: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header(TENANT_HEADER, tenant);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, tenant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header(TENANT_HEADER, tenant);
    }
    builder.body(Body::empty()).unwrap()
}

/// 构造只含一个文件字段的 multipart 请求
pub fn multipart_request(file_name: &str, content: &str, tenant: Option<&str>) -> Request<Body> {
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {c}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
        f = file_name,
        c = content
    );

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/permission/api/v1/managedEntity/permission")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(tenant) = tenant {
        builder = builder.header(TENANT_HEADER, tenant);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// 创建权限并断言 201
pub async fn create_permission(app: &Router, body: &Value) -> Permission {
    let uri = format!("/permission/api/v1/managedEntityCode/{}", ENTITY);
    let response = send(app, json_request(Method::POST, &uri, Some(TENANT), body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(body_json(response).await).unwrap()
}

pub async fn get_by_id(app: &Router, id: &str) -> Response<Body> {
    let uri = format!("/permission/api/v1/permissionId/{}", id);
    send(app, empty_request(Method::GET, &uri, Some(TENANT))).await
}

pub async fn get_by_code(app: &Router, code: &str) -> Response<Body> {
    let uri = format!("/permission/api/v1/permissionCode/{}", code);
    send(app, empty_request(Method::GET, &uri, Some(TENANT))).await
}

pub async fn list_permissions(app: &Router, tenant: &str) -> Vec<Permission> {
    let response = send(app, empty_request(Method::GET, "/permission/api/v1", Some(tenant))).await;
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_value(body_json(response).await).unwrap()
}

/// 设置了 TEST_DATABASE_URL 时连接测试库并执行迁移，否则返回 None
pub async fn setup_test_pool() -> Option<sqlx::PgPool> {
    let config = create_test_config();
    config.database.url.as_ref()?;

    let pool = rbac_permissions::db::create_pool(&config.database)
        .await
        .expect("Failed to connect to test database");
    rbac_permissions::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// 每个数据库测试使用独立租户，避免互相影响
pub fn unique_tenant() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}
