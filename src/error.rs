// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the idea board

use thiserror::Error;

/// Result type alias for idea board operations
pub type Result<T> = std::result::Result<T, IdeaBoardError>;

/// Idea board error types
#[derive(Error, Debug)]
pub enum IdeaBoardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Validation failed: {}", .0.join(". "))]
    Validation(Vec<String>),

    #[error("Please wait before submitting another idea")]
    RateLimited,

    #[error("Content rejected: {warning}")]
    ContentRejected { warning: String },

    #[error("Moderation service unavailable: {0}")]
    ModerationUnavailable(String),

    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_errors() {
        let err = IdeaBoardError::Validation(vec![
            "Title must be at least 3 characters long".to_string(),
            "Please select a valid category".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Title must be at least 3 characters long. Please select a valid category"
        );
    }
}
