//! Error types for Grimoire Core

use std::fmt;
use thiserror::Error;

/// Shape validation failure
///
/// Carries one message per offending field or record. Produced by
/// [`crate::schema::Schema`] implementations at every store boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    /// Create a validation error with a single issue
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }

    /// Create a validation error from a list of issues
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self { issues }
    }

    /// Prefix every issue with a location (e.g. `[3]` or `users.u1`)
    pub fn at(mut self, location: &str) -> Self {
        for issue in &mut self.issues {
            *issue = format!("{}: {}", location, issue);
        }
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.issues.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock for '{item_id}': requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Insufficient funds: balance {balance} galleons, price {price}")]
    InsufficientFunds { balance: u64, price: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// HTTP status an outer boundary should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::AccessDenied(_) => 403,
            StoreError::AlreadyExists(_) => 409,
            StoreError::Validation(_)
            | StoreError::InvalidInput(_)
            | StoreError::InsufficientStock { .. }
            | StoreError::InsufficientFunds { .. } => 400,
            StoreError::Io(_)
            | StoreError::Json(_)
            | StoreError::Yaml(_)
            | StoreError::Config(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
