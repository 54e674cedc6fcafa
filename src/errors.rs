//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with the workflow store.
    Db(String),
    /// Audit log append or read failure.
    Audit(String),
    /// HTTP transport failure.
    Http(String),
    /// Inbound request failed structural validation.
    Validation(String),
    /// Decision signal names an `action_id` with no workflow instance.
    UnknownReference(String),
    /// Decision signal targets a workflow already resolved.
    AlreadyResolved(String),
    /// Decision signal arrived after the workflow expired.
    Expired(String),
    /// Decision signal arrived before the workflow branched.
    NotAwaitingDecision(String),
    /// Reviewer is not authorized to resolve decisions.
    Unauthorized(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Audit(msg) => write!(f, "audit: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::UnknownReference(msg) => write!(f, "unknown reference: {msg}"),
            Self::AlreadyResolved(msg) => write!(f, "already resolved: {msg}"),
            Self::Expired(msg) => write!(f, "expired: {msg}"),
            Self::NotAwaitingDecision(msg) => write!(f, "not awaiting decision: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}
