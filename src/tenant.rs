//! 租户上下文
//!
//! 租户从请求头中解析出来后，作为显式参数传给每一个服务调用。

use crate::{error::AppError, middleware::AppState};
use axum::{extract::FromRequestParts, http::HeaderMap};
use std::fmt;
use std::sync::Arc;

/// 租户标识最大长度
const MAX_TENANT_LEN: usize = 128;

/// 租户上下文
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantContext {
    tenant_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>) -> Result<Self, AppError> {
        let tenant_id = tenant_id.into().trim().to_string();

        if tenant_id.is_empty() {
            return Err(AppError::validation("Tenant id must not be empty"));
        }
        if tenant_id.len() > MAX_TENANT_LEN {
            return Err(AppError::validation("Tenant id is too long"));
        }

        Ok(Self { tenant_id })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tenant_id)
    }
}

/// 从请求头读取租户；头不存在时返回 None，头存在但非法时返回错误
pub fn tenant_from_headers(
    headers: &HeaderMap,
    header_name: &str,
) -> Result<Option<TenantContext>, AppError> {
    match headers.get(header_name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::validation("Tenant header is not valid text"))?;
            TenantContext::new(value).map(Some)
        }
    }
}

// 必须携带租户头
impl FromRequestParts<Arc<AppState>> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_name = &state.config.tenancy.header;

        tenant_from_headers(&parts.headers, header_name)?.ok_or_else(|| {
            AppError::Validation(format!("Missing required header: {}", header_name))
        })
    }
}

/// 租户头可选，缺省时回退到配置的默认租户
#[derive(Debug, Clone)]
pub struct TenantOrDefault(pub TenantContext);

impl FromRequestParts<Arc<AppState>> for TenantOrDefault {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let tenancy = &state.config.tenancy;

        let tenant = match tenant_from_headers(&parts.headers, &tenancy.header)? {
            Some(tenant) => tenant,
            None => TenantContext::new(tenancy.default_tenant.as_str())?,
        };

        Ok(TenantOrDefault(tenant))
    }
}
