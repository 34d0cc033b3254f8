// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The media tool could not read the file or reported no usable duration
    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    /// Missing or out-of-range filename, markers, count or reference list
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Asset or artifact reference could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// One batch item failed; never aborts its siblings
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// The concat step failed; fatal to the request
    #[error("Assemble failed: {0}")]
    AssembleFailed(String),

    /// An artifact name is already taken by different content
    #[error("Naming collision: {0}")]
    NamingCollision(String),

    /// Raw external process failure, before the caller classifies it
    #[error("{tool} failed: {detail}")]
    ToolFailed { tool: String, detail: String },

    /// File system operation failed
    #[error("File system error: {0}")]
    FsFail(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::ProbeFailed(_) => "probe_failed",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::NotFound(_) => "not_found",
            DomainError::JobFailed(_) => "job_failed",
            DomainError::AssembleFailed(_) => "assemble_failed",
            DomainError::NamingCollision(_) => "naming_collision",
            DomainError::ToolFailed { .. } => "tool_failed",
            DomainError::FsFail(_) => "fs_failed",
            DomainError::Config(_) => "config",
        }
    }

    /// Detail text without the kind prefix
    pub fn detail(&self) -> String {
        match self {
            DomainError::ProbeFailed(msg)
            | DomainError::InvalidInput(msg)
            | DomainError::NotFound(msg)
            | DomainError::JobFailed(msg)
            | DomainError::AssembleFailed(msg)
            | DomainError::NamingCollision(msg)
            | DomainError::FsFail(msg)
            | DomainError::Config(msg) => msg.clone(),
            DomainError::ToolFailed { tool, detail } => format!("{}: {}", tool, detail),
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFail(err.to_string())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = std::result::Result<T, DomainError>;
