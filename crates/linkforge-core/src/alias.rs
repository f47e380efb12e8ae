use crate::shortcode::ShortCode;
use std::collections::HashSet;
use thiserror::Error;
use typed_builder::TypedBuilder;

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 32;

/// Words that can never be claimed as custom aliases.
pub const DEFAULT_RESERVED: &[&str] = &[
    "about", "admin", "api", "create", "delete", "edit", "health", "list", "login", "logout",
    "static",
];

/// Why a custom alias was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasViolation {
    #[error("alias must not be blank")]
    NullOrBlank,
    #[error("alias must be at least {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("alias must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("alias must contain only alphanumeric characters, hyphens, or underscores: '{0}'")]
    InvalidChars(String),
    #[error("alias '{0}' is reserved")]
    Reserved(String),
}

impl AliasViolation {
    /// Stable reason code for this violation.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NullOrBlank => "NULL_OR_BLANK",
            Self::TooShort { .. } => "TOO_SHORT",
            Self::TooLong { .. } => "TOO_LONG",
            Self::InvalidChars(_) => "INVALID_CHARS",
            Self::Reserved(_) => "RESERVED",
        }
    }
}

/// Validation rules for caller-chosen aliases.
///
/// Checks run in a fixed order and the first failure wins:
/// blank, too short, too long, invalid characters, reserved word.
#[derive(Debug, Clone, TypedBuilder)]
pub struct AliasPolicy {
    #[builder(default = MIN_LENGTH)]
    min_length: usize,
    #[builder(default = MAX_LENGTH)]
    max_length: usize,
    /// Matched case-insensitively.
    #[builder(default = default_reserved())]
    reserved: HashSet<String>,
}

fn default_reserved() -> HashSet<String> {
    DEFAULT_RESERVED.iter().map(|w| w.to_string()).collect()
}

impl Default for AliasPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AliasPolicy {
    pub fn validate(&self, alias: &str) -> Result<(), AliasViolation> {
        if alias.trim().is_empty() {
            return Err(AliasViolation::NullOrBlank);
        }

        let length = alias.chars().count();
        if length < self.min_length {
            return Err(AliasViolation::TooShort {
                min: self.min_length,
                actual: length,
            });
        }
        if length > self.max_length {
            return Err(AliasViolation::TooLong {
                max: self.max_length,
                actual: length,
            });
        }

        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AliasViolation::InvalidChars(alias.to_string()));
        }

        if self.is_reserved(alias) {
            return Err(AliasViolation::Reserved(alias.to_string()));
        }

        Ok(())
    }

    pub fn normalize(&self, alias: &str) -> ShortCode {
        ShortCode::normalize(alias)
    }

    /// Validates and normalizes in one step.
    pub fn parse(&self, alias: &str) -> Result<ShortCode, AliasViolation> {
        self.validate(alias)?;
        Ok(self.normalize(alias))
    }

    pub fn is_reserved(&self, alias: &str) -> bool {
        self.reserved.iter().any(|w| w.eq_ignore_ascii_case(alias))
    }
}
