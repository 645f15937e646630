use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// SQL identifier validator for table names
pub struct IdentifierValidator {
    pub field: &'static str,
    pub max_length: usize,
}

impl IdentifierValidator {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            max_length: 63,
        }
    }
}

impl ConfigValidator<str> for IdentifierValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        let pattern = regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| ConfigError::validation_failed(e.to_string()))?;

        if value.len() > self.max_length || !pattern.is_match(value) {
            return Err(ConfigError::invalid_value(
                self.field,
                value,
                format!(
                    "a SQL identifier (letters, digits, underscores; at most {} characters)",
                    self.max_length
                ),
            ));
        }
        Ok(())
    }
}

/// Enum-like string validator
pub struct OneOfValidator {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
}

impl ConfigValidator<str> for OneOfValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if !self.allowed.contains(&value.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                self.field,
                value,
                format!("one of: {}", self.allowed.join(", ")),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validator() {
        let validator = IdentifierValidator::new("migrations_table");
        assert!(validator.validate("migrations").is_ok());
        assert!(validator.validate("_schema_v2").is_ok());
        assert!(validator.validate("2fast").is_err());
        assert!(validator.validate("migrations; DROP TABLE users").is_err());
        assert!(validator.validate("").is_err());
        assert!(validator.validate(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_one_of_validator() {
        let validator = OneOfValidator {
            field: "log_level",
            allowed: &["info", "debug"],
        };
        assert!(validator.validate("INFO").is_ok());

        match validator.validate("loud") {
            Err(ConfigError::InvalidValue { field, expected, .. }) => {
                assert_eq!(field, "log_level");
                assert_eq!(expected, "one of: info, debug");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }
}
