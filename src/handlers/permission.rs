//! 权限管理的 HTTP 处理器
//! 只负责请求/响应转换，业务逻辑全部委托给 PermissionService

use crate::{
    error::AppError,
    extract::AppJson,
    middleware::AppState,
    models::permission::*,
    services::ImportUpload,
    tenant::{TenantContext, TenantOrDefault},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 创建权限
pub async fn create_permission(
    State(state): State<Arc<AppState>>,
    TenantOrDefault(tenant): TenantOrDefault,
    Path(entity_code): Path<String>,
    AppJson(req): AppJson<CreatePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state
        .permission_service
        .create(&tenant, Some(&entity_code), req)
        .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

/// 列出权限
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state.permission_service.list_all(&tenant).await?;

    Ok(Json(permissions))
}

/// 按 id 获取权限
pub async fn get_permission_by_id(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state.permission_service.get_by_id(&tenant, &id).await?;

    Ok(Json(permission))
}

/// 按 code 获取权限
pub async fn get_permission_by_code(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state.permission_service.get_by_code(&tenant, &code).await?;

    Ok(Json(permission))
}

/// 按 code 更新权限
pub async fn update_permission(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    Path((entity_code, code)): Path<(String, String)>,
    AppJson(req): AppJson<UpdatePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let permission = state
        .permission_service
        .update(&tenant, Some(&entity_code), &code, req)
        .await?;

    Ok(Json(permission))
}

/// 按 id 软删除
pub async fn delete_permission_by_id(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.delete_by_id(&tenant, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 按 code 软删除
pub async fn delete_permission_by_code(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.permission_service.delete_by_code(&tenant, &code).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// 批量上传，成功时响应体为原始文件名
pub async fn upload_permissions(
    State(state): State<Arc<AppState>>,
    TenantOrDefault(tenant): TenantOrDefault,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_upload(multipart).await?;
    let result = state.permission_service.bulk_import(&tenant, upload).await?;

    Ok((StatusCode::OK, result.file_name))
}

/// 读取唯一的文件字段；没有文件名的普通字段忽略
async fn read_upload(mut multipart: Multipart) -> Result<ImportUpload, AppError> {
    let mut upload: Option<ImportUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        if upload.is_some() {
            return Err(AppError::BadRequest(
                "Upload must contain exactly one file".to_string(),
            ));
        }

        let content = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read uploaded file", e))?;

        upload = Some(ImportUpload {
            file_name,
            content: content.to_vec(),
        });
    }

    upload.ok_or_else(|| AppError::BadRequest("Upload must contain a file part".to_string()))
}

/// 超出上传上限返回 413，其余按 400 处理
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    let message = format!("{}: {}", context, e.body_text());

    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(message)
    } else {
        AppError::BadRequest(message)
    }
}
