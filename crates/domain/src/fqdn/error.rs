use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FqdnError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid match pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("name too long: {length} bytes (max {max})")]
    NameTooLong { length: usize, max: usize },
}
