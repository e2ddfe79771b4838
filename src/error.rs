//! Error types for the task engine.

use thiserror::Error;

/// Main error type for schema, pool, and task operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Configuration error (unknown dialect, missing fields, bad YAML values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dialect error (unsupported operation or type for the target dialect).
    #[error("Dialect error: {0}")]
    Dialect(String),

    /// Connection/pool acquisition error with context about where it occurred.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Scripted expression evaluation failed.
    #[error("Script error: {0}")]
    Script(String),

    /// A statement failed to execute; carries the offending SQL and bound
    /// parameters for diagnosis.
    #[error("Execution failed: {message}\n  sql: {sql}\n  params: {params}")]
    Execution {
        sql: String,
        params: String,
        message: String,
    },

    /// Task lifecycle error (launch failure, recovered worker panic).
    #[error("Task error: {0}")]
    Task(String),

    /// The operation was cancelled cooperatively.
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error (staging directories, export files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Archive creation error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl DbError {
    /// Create a Connection error with context about where it occurred.
    pub fn connection(message: impl Into<String>, context: impl Into<String>) -> Self {
        DbError::Connection {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create an Execution error from a failed statement.
    pub fn execution(sql: impl Into<String>, params: String, message: impl Into<String>) -> Self {
        DbError::Execution {
            sql: sql.into(),
            params,
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for task engine operations.
pub type Result<T> = std::result::Result<T, DbError>;
