//! Business logic services layer

pub mod import;
pub mod permission_service;

pub use import::ImportUpload;
pub use permission_service::PermissionService;
