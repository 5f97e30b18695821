//! Error types for simple-ip-blocker.

use thiserror::Error;

/// Rejection of a single address token.
///
/// Sanitization recovers from this locally by dropping the token, so it never
/// reaches the caller of [`crate::sanitize::sanitize`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid address or CIDR: {0:?}")]
    Invalid(String),
}

impl ParseError {
    pub(crate) fn invalid(token: impl Into<String>) -> Self {
        Self::Invalid(token.into())
    }
}

#[derive(Error, Debug)]
pub enum BlockerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_quotes_token() {
        let err = ParseError::invalid("1.2.3.4/99");
        assert_eq!(err.to_string(), "Invalid address or CIDR: \"1.2.3.4/99\"");
    }

    #[test]
    fn test_blocker_error_display() {
        let err = BlockerError::FileSystem("disk full".to_string());
        assert_eq!(err.to_string(), "File system error: disk full");
    }
}
