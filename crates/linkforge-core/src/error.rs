use crate::alias::AliasViolation;
use crate::shortcode::ShortCode;
use thiserror::Error;

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INTERNAL: u16 = 500;
pub const STATUS_UNAVAILABLE: u16 = 503;

pub const REASON_CONFLICT: &str = "ALIAS_CONFLICT";
pub const REASON_NOT_FOUND: &str = "NOT_FOUND";
pub const REASON_EXHAUSTED: &str = "GENERATOR_EXHAUSTED";
pub const REASON_STORAGE: &str = "STORAGE_FAILURE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Base62Error {
    #[error("cannot encode negative value {0}")]
    Negative(i64),
    #[error("cannot decode empty input")]
    Empty,
    #[error("invalid base62 symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("base62 value does not fit in i64: {0}")]
    Overflow(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("counter exhausted after {0}")]
    Exhausted(i64),
    #[error("failed to encode counter value: {0}")]
    Encoding(#[from] Base62Error),
}

/// Turns a `(status, message, reason)` triple into an opaque payload.
///
/// The core never interprets the output; it is carried inside [`MappingError`]
/// so a transport layer can forward it as-is.
pub trait ErrorMapper: Send + Sync + 'static {
    fn render(&self, status: u16, message: &str, reason: &str) -> String;
}

impl<F> ErrorMapper for F
where
    F: Fn(u16, &str, &str) -> String + Send + Sync + 'static,
{
    fn render(&self, status: u16, message: &str, reason: &str) -> String {
        self(status, message, reason)
    }
}

/// Renders failures as `"<status> <reason>: <message>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainErrorMapper;

impl ErrorMapper for PlainErrorMapper {
    fn render(&self, status: u16, message: &str, reason: &str) -> String {
        format!("{status} {reason}: {message}")
    }
}

/// Typed failure returned by mutating store operations.
///
/// Every variant carries the payload produced by the injected [`ErrorMapper`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("invalid alias: {violation}")]
    Validation {
        violation: AliasViolation,
        rendered: String,
    },
    #[error("alias already exists: {code}")]
    Conflict { code: ShortCode, rendered: String },
    #[error("short code not found: {code}")]
    NotFound { code: ShortCode, rendered: String },
    #[error("code generator exhausted: {source}")]
    Exhausted {
        source: GeneratorError,
        rendered: String,
    },
    #[error("storage error: {message}")]
    Storage { message: String, rendered: String },
}

impl MappingError {
    pub fn validation(violation: AliasViolation, mapper: &dyn ErrorMapper) -> Self {
        let rendered = mapper.render(
            STATUS_BAD_REQUEST,
            &violation.to_string(),
            violation.reason_code(),
        );
        Self::Validation {
            violation,
            rendered,
        }
    }

    pub fn conflict(code: ShortCode, mapper: &dyn ErrorMapper) -> Self {
        let message = format!("alias '{code}' is already in use");
        let rendered = mapper.render(STATUS_CONFLICT, &message, REASON_CONFLICT);
        Self::Conflict { code, rendered }
    }

    pub fn not_found(code: ShortCode, mapper: &dyn ErrorMapper) -> Self {
        let message = format!("no mapping for short code '{code}'");
        let rendered = mapper.render(STATUS_NOT_FOUND, &message, REASON_NOT_FOUND);
        Self::NotFound { code, rendered }
    }

    pub fn exhausted(source: GeneratorError, mapper: &dyn ErrorMapper) -> Self {
        let rendered = mapper.render(STATUS_UNAVAILABLE, &source.to_string(), REASON_EXHAUSTED);
        Self::Exhausted { source, rendered }
    }

    pub fn storage(message: impl Into<String>, mapper: &dyn ErrorMapper) -> Self {
        let message = message.into();
        let rendered = mapper.render(STATUS_INTERNAL, &message, REASON_STORAGE);
        Self::Storage { message, rendered }
    }

    /// Status-like code handed to the error mapper.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => STATUS_BAD_REQUEST,
            Self::Conflict { .. } => STATUS_CONFLICT,
            Self::NotFound { .. } => STATUS_NOT_FOUND,
            Self::Exhausted { .. } => STATUS_UNAVAILABLE,
            Self::Storage { .. } => STATUS_INTERNAL,
        }
    }

    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation { violation, .. } => violation.reason_code(),
            Self::Conflict { .. } => REASON_CONFLICT,
            Self::NotFound { .. } => REASON_NOT_FOUND,
            Self::Exhausted { .. } => REASON_EXHAUSTED,
            Self::Storage { .. } => REASON_STORAGE,
        }
    }

    /// The opaque payload produced by the error mapper.
    pub fn rendered(&self) -> &str {
        match self {
            Self::Validation { rendered, .. }
            | Self::Conflict { rendered, .. }
            | Self::NotFound { rendered, .. }
            | Self::Exhausted { rendered, .. }
            | Self::Storage { rendered, .. } => rendered,
        }
    }
}
