use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ServiceError::Unauthorized {
            message: message.into(),
        }
    }
}

/// Storage failures; callers only ever see a generic 500 for these
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage backend unreachable")]
    ConnectionFailed,

    #[error("Write rejected by storage: {message}")]
    ConstraintViolation { message: String },

    #[error("Stored record could not be decoded: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("DynamoDB request failed: {message}")]
    AwsSdk { message: String },

    #[error("Table {table_name} does not exist or is not accessible")]
    TableNotFound { table_name: String },

    #[error("Malformed storage query: {message}")]
    InvalidQuery { message: String },

    #[error("Batch write aborted: {message}")]
    TransactionFailed { message: String },

    #[error("Storage request timed out")]
    Timeout,

    #[error("Storage throughput exceeded")]
    RateLimitExceeded,
}

/// Request payload problems, reported to callers as 400 with the message below
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    RequiredField { field: String },

    #[error("{field} has invalid value '{value}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field} must be at most {max_length} characters, got {actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("{field} must be {expected}")]
    InvalidFormat { field: String, expected: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation {
            message: err.to_string(),
        }
    }
}

/// Errors raised by cache providers. Never surfaced to API callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache operation error: {0}")]
    Operation(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
