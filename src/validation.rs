//! Identifier validation for resource, rule, and column names.

use crate::errors::ConfigError;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Validate a configuration-supplied identifier.
///
/// Identifiers end up in log fields and metric labels, so control
/// characters and unbounded lengths are rejected at registration time.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidIdentifier {
            field,
            reason: "must not be empty".to_string(),
        });
    }

    if value.trim() != value {
        return Err(ConfigError::InvalidIdentifier {
            field,
            reason: "must not have leading or trailing whitespace".to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ConfigError::InvalidIdentifier {
            field,
            reason: format!("too long ({} bytes, max {})", value.len(), MAX_IDENTIFIER_LEN),
        });
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(ConfigError::InvalidIdentifier {
            field,
            reason: "contains control characters".to_string(),
        });
    }

    Ok(())
}
