use crate::model::{ColumnType, TransactionId};
use thiserror::Error;
use vellum_core_types::{RequestId, TraceId};

/// Result type alias using VersioningError
pub type Result<T> = std::result::Result<T, VersioningError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable `ERR_*` code. Callers branch on the kind; the
/// code is what shows up in logs and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input / schema
    InvalidInput,
    UnknownEntityType,
    UnknownColumn,
    TypeMismatch,
    NullViolation,
    InvalidSchema,

    // History lookups
    NotFound,
    NoHistoricalState,
    AlreadyExists,

    // Write path
    /// Lost-update race on the entity's open version row. Retryable.
    Conflict,
    /// History was found but restoring it would break a structural invariant
    RevertRejected,
    /// A stored version chain disagrees with its own invariants
    InvariantViolation,

    // Integration/IO
    Persistence,
    Serialization,
    Io,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::UnknownEntityType => "ERR_UNKNOWN_ENTITY_TYPE",
            ExErrorKind::UnknownColumn => "ERR_UNKNOWN_COLUMN",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::NullViolation => "ERR_NULL_VIOLATION",
            ExErrorKind::InvalidSchema => "ERR_INVALID_SCHEMA",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::NoHistoricalState => "ERR_NO_HISTORICAL_STATE",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::RevertRejected => "ERR_REVERT_REJECTED",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields support programmatic handling; the context fields
/// (entity, transaction, request) are for debugging and log correlation.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_type: Option<String>,
    entity_id: Option<String>,
    transaction_id: Option<TransactionId>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_type: None,
            entity_id: None,
            transaction_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add transaction ID context
    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// True when the caller may re-fetch current state and try again
    pub fn is_retryable(&self) -> bool {
        self.kind == ExErrorKind::Conflict
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(transaction_id) = self.transaction_id {
            write!(f, " (transaction_id: {})", transaction_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by the pure versioning core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VersioningError {
    // ===== Schema =====
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    #[error("Unknown column '{column}' for entity type {entity_type}")]
    UnknownColumn { entity_type: String, column: String },

    #[error("Column '{column}' of {entity_type} expects {expected}, got {found}")]
    TypeMismatch {
        entity_type: String,
        column: String,
        expected: ColumnType,
        found: String,
    },

    #[error("Column '{column}' of {entity_type} is not nullable")]
    NullViolation { entity_type: String, column: String },

    #[error("Primary key '{primary_key}' missing or null for entity type {entity_type}")]
    MissingPrimaryKey {
        entity_type: String,
        primary_key: String,
    },

    #[error("Invalid schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("Invalid SQL identifier: {name}")]
    InvalidIdentifier { name: String },

    #[error("Invalid operation type code: {code}")]
    InvalidOperationCode { code: i64 },

    // ===== History =====
    #[error("No version history for {entity_type} {entity_id}")]
    HistoryNotFound {
        entity_type: String,
        entity_id: String,
    },

    #[error("No state of {entity_type} {entity_id} covers transaction {transaction_id}")]
    NoHistoricalState {
        entity_type: String,
        entity_id: String,
        transaction_id: TransactionId,
    },

    #[error("Version row references unknown transaction {transaction_id}")]
    MissingTransaction { transaction_id: TransactionId },

    // ===== Configuration / IO =====
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<VersioningError> for ExError {
    fn from(err: VersioningError) -> Self {
        let message = err.to_string();
        match err {
            VersioningError::UnknownEntityType { entity_type } => {
                ExError::new(ExErrorKind::UnknownEntityType).with_entity_type(entity_type)
            }
            VersioningError::UnknownColumn { entity_type, .. } => {
                ExError::new(ExErrorKind::UnknownColumn).with_entity_type(entity_type)
            }
            VersioningError::TypeMismatch { entity_type, .. } => {
                ExError::new(ExErrorKind::TypeMismatch).with_entity_type(entity_type)
            }
            VersioningError::NullViolation { entity_type, .. }
            | VersioningError::MissingPrimaryKey { entity_type, .. } => {
                ExError::new(ExErrorKind::NullViolation).with_entity_type(entity_type)
            }
            VersioningError::InvalidSchema { .. } | VersioningError::InvalidIdentifier { .. } => {
                ExError::new(ExErrorKind::InvalidSchema)
            }
            VersioningError::InvalidOperationCode { .. } => {
                ExError::new(ExErrorKind::InvariantViolation)
            }
            VersioningError::HistoryNotFound {
                entity_type,
                entity_id,
            } => ExError::new(ExErrorKind::NotFound)
                .with_entity_type(entity_type)
                .with_entity_id(entity_id),
            VersioningError::NoHistoricalState {
                entity_type,
                entity_id,
                transaction_id,
            } => ExError::new(ExErrorKind::NoHistoricalState)
                .with_entity_type(entity_type)
                .with_entity_id(entity_id)
                .with_transaction_id(transaction_id),
            VersioningError::MissingTransaction { transaction_id } => {
                ExError::new(ExErrorKind::InvariantViolation).with_transaction_id(transaction_id)
            }
            VersioningError::Config { .. } => ExError::new(ExErrorKind::Config),
            VersioningError::Serialization { .. } => ExError::new(ExErrorKind::Serialization),
        }
        .with_message(message)
    }
}

impl From<serde_json::Error> for VersioningError {
    fn from(err: serde_json::Error) -> Self {
        VersioningError::Serialization {
            message: err.to_string(),
        }
    }
}
