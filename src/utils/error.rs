use crate::core::error_store::ErrorStore;
use crate::domain::model::EntityId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Service '{name}' is not registered in the container")]
    ServiceNotFound { name: String },

    #[error("Entity store is unavailable")]
    StoreUnavailable,

    #[error("API resource '{name}' is not registered")]
    UnknownResource { name: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("{entity_class} entity with ID {id} not found")]
    NotFound { entity_class: String, id: EntityId },

    #[error("Expected a {expected} entity, got {found}")]
    EntityMismatch { expected: String, found: String },

    #[error("Validation failed: {errors}")]
    ValidationError { errors: ErrorStore },
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ApiError {
    pub fn not_found(entity_class: &str, id: EntityId) -> Self {
        ApiError::NotFound {
            entity_class: entity_class.to_string(),
            id,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ApiError::ConfigError {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    /// 錯誤嚴重程度，CLI 依此決定退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ApiError::ValidationError { .. }
            | ApiError::BadRequest { .. }
            | ApiError::NotFound { .. } => ErrorSeverity::Medium,
            ApiError::UnknownResource { .. }
            | ApiError::EntityMismatch { .. }
            | ApiError::SerializationError(_)
            | ApiError::UrlError(_) => ErrorSeverity::High,
            ApiError::IoError(_)
            | ApiError::ConfigError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::ConfigValidationError { .. }
            | ApiError::ServiceNotFound { .. }
            | ApiError::StoreUnavailable => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "Fix the reported fields and resend the request",
            ApiError::NotFound { .. } => "Check that the referenced resource exists",
            ApiError::BadRequest { .. } | ApiError::SerializationError(_) => {
                "Check the request document format"
            }
            ApiError::UnknownResource { .. } => "Register the resource under [api_resources]",
            ApiError::EntityMismatch { .. } => "Send the request to the matching resource",
            ApiError::ConfigError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::ConfigValidationError { .. }
            | ApiError::UrlError(_) => "Review the TOML configuration file",
            ApiError::ServiceNotFound { .. } | ApiError::StoreUnavailable => {
                "Make sure the service container is fully built"
            }
            ApiError::IoError(_) => "Check file paths and permissions",
        }
    }

    /// Field-level errors carried by a rejected request, if any.
    pub fn validation_errors(&self) -> Option<&ErrorStore> {
        match self {
            ApiError::ValidationError { errors } => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
