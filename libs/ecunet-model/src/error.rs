//! Model Layer Error Types

use thiserror::Error;

/// Result type for ecunet-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model layer errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Structurally mismatched inputs (kind, array-ness or length differ)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Index, node ID or min/max condition out of bounds
    #[error("Range error: {0}")]
    Range(String),
}

// Helper methods
impl ModelError {
    pub fn config(msg: impl Into<String>) -> Self {
        ModelError::Config(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        ModelError::Range(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ModelError::Config(_))
    }

    pub fn is_range(&self) -> bool {
        matches!(self, ModelError::Range(_))
    }
}
