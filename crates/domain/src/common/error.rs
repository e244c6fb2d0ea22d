use thiserror::Error;

use crate::fqdn::error::FqdnError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

impl From<FqdnError> for DomainError {
    fn from(err: FqdnError) -> Self {
        match err {
            FqdnError::InvalidSelector { .. }
            | FqdnError::InvalidPattern { .. }
            | FqdnError::NameTooLong { .. } => Self::InvalidSelector(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_errors_map_to_invalid_selector() {
        let err: DomainError = FqdnError::InvalidPattern {
            pattern: "bad[".to_string(),
            reason: "invalid character '['".to_string(),
        }
        .into();
        assert!(matches!(err, DomainError::InvalidSelector(_)));
        assert_eq!(
            err.to_string(),
            "invalid selector: invalid match pattern 'bad[': invalid character '['"
        );
    }
}
