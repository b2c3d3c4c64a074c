//! Permission domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// `validUntil` 的文本格式（dd-MM-yyyy）
pub const VALID_UNTIL_FORMAT: &str = "%d-%m-%Y";

/// 权限生命周期状态
///
/// 只允许 Active -> Inactive，软删除不可逆。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Active,
    Inactive,
}

impl PermissionStatus {
    pub fn is_active(self) -> bool {
        self == PermissionStatus::Active
    }

    /// 停用。返回状态是否发生了变化
    pub fn deactivate(&mut self) -> bool {
        let changed = self.is_active();
        *self = PermissionStatus::Inactive;
        changed
    }
}

impl From<bool> for PermissionStatus {
    fn from(active: bool) -> Self {
        if active {
            PermissionStatus::Active
        } else {
            PermissionStatus::Inactive
        }
    }
}

/// JSON 中状态以 `active` 布尔值表示
mod active_flag {
    use super::PermissionStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &PermissionStatus, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(status.is_active())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PermissionStatus, D::Error> {
        bool::deserialize(d).map(PermissionStatus::from)
    }
}

/// Permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub tenant_id: String,
    pub managed_entity_code: Option<String>,
    pub code: String,
    pub name: String,
    pub description: String,
    pub valid_until: String,
    #[serde(rename = "active", with = "active_flag")]
    #[sqlx(rename = "active", try_from = "bool")]
    pub status: PermissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// 新建活跃权限，分配新的 id
    pub fn new(
        tenant_id: &str,
        managed_entity_code: Option<&str>,
        req: CreatePermissionRequest,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            managed_entity_code: managed_entity_code.map(|s| s.to_string()),
            code: req.code,
            name: req.name,
            description: req.description,
            valid_until: req.valid_until,
            status: PermissionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// 用更新请求替换可变字段；id、code、租户和托管实体不变
    pub fn apply_update(&mut self, req: &UpdatePermissionRequest) {
        self.name = req.name.clone();
        self.description = req.description.clone();
        self.valid_until = req.valid_until.clone();
        self.updated_at = Utc::now();
    }

    /// 软删除
    pub fn deactivate(&mut self) {
        if self.status.deactivate() {
            self.updated_at = Utc::now();
        }
    }
}

/// Create permission request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    #[validate(length(min = 1, max = 64), custom(function = "validate_code"))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
    #[serde(alias = "valid_Until")]
    #[validate(custom(function = "validate_valid_until"))]
    pub valid_until: String,
}

/// Update permission request
///
/// `code` 可以出现在请求体中，但必须与路径中的 code 一致。
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
    #[serde(alias = "valid_Until")]
    #[validate(custom(function = "validate_valid_until"))]
    pub valid_until: String,
}

/// Bulk import result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub file_name: String,
    pub imported: usize,
}

/// code 会出现在 URL 路径中，只允许字母、数字和 `_ - . :`
fn validate_code(code: &str) -> Result<(), ValidationError> {
    let ok = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));

    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("code_charset")
            .with_message("code may only contain letters, digits, '_', '-', '.', ':'".into()))
    }
}

/// 托管实体 code 的最大长度，与数据库列一致
pub const MAX_MANAGED_ENTITY_CODE_LEN: usize = 128;

/// 托管实体 code 来自 URL 路径，字符集与权限 code 相同
pub fn validate_managed_entity_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > MAX_MANAGED_ENTITY_CODE_LEN {
        return Err(ValidationError::new("managed_entity_code_length").with_message(
            format!(
                "managedEntityCode must be 1 to {} characters",
                MAX_MANAGED_ENTITY_CODE_LEN
            )
            .into(),
        ));
    }

    validate_code(code).map_err(|_| {
        ValidationError::new("managed_entity_code_charset").with_message(
            "managedEntityCode may only contain letters, digits, '_', '-', '.', ':'".into(),
        )
    })
}

/// 严格校验 dd-MM-yyyy，且必须是真实存在的日期
pub fn validate_valid_until(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'-'
        && bytes[5] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());

    if shape_ok && NaiveDate::parse_from_str(value, VALID_UNTIL_FORMAT).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("valid_until_format")
            .with_message("validUntil must be a date formatted as dd-MM-yyyy".into()))
    }
}
