//! Input validation and sanitization for prompt text

use tracing::{debug, warn};

/// Default maximum prompt length in characters
pub const DEFAULT_MAX_INPUT_CHARS: usize = 1000;

/// Input validator
pub struct InputValidator;

impl InputValidator {
    /// Validate the raw `userInput` field
    pub fn validate_user_input(input: Option<&str>) -> Result<&str, ValidationError> {
        let text = match input {
            Some(text) => text,
            None => {
                warn!("Validation failed: userInput missing or not a string");
                return Err(ValidationError::MissingInput);
            }
        };

        if text.trim().is_empty() {
            warn!("Validation failed: empty userInput");
            return Err(ValidationError::EmptyInput);
        }

        debug!("Input validation passed");
        Ok(text)
    }

    /// Strip control characters, trim, and truncate to `max_chars` characters
    pub fn sanitize_text(text: &str, max_chars: usize) -> String {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect();

        let trimmed = cleaned.trim();
        if trimmed.chars().count() <= max_chars {
            return trimmed.to_string();
        }

        debug!("Truncating input to {} characters", max_chars);
        trimmed.chars().take(max_chars).collect::<String>().trim_end().to_string()
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("userInput is required and must be a string")]
    MissingInput,

    #[error("userInput is empty")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_input_success() {
        assert_eq!(InputValidator::validate_user_input(Some("Hello")), Ok("Hello"));
    }

    #[test]
    fn test_validate_user_input_missing_or_empty() {
        assert_eq!(
            InputValidator::validate_user_input(None),
            Err(ValidationError::MissingInput)
        );
        assert_eq!(
            InputValidator::validate_user_input(Some("")),
            Err(ValidationError::EmptyInput)
        );
        assert_eq!(
            InputValidator::validate_user_input(Some("   ")),
            Err(ValidationError::EmptyInput)
        );
    }

    #[test]
    fn test_sanitize_trims_and_strips_control_characters() {
        let sanitized = InputValidator::sanitize_text("  Hello\x00World\x01!  ", 100);
        assert_eq!(sanitized, "HelloWorld!");
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundaries() {
        let long_text = "é".repeat(DEFAULT_MAX_INPUT_CHARS + 50);
        let sanitized = InputValidator::sanitize_text(&long_text, DEFAULT_MAX_INPUT_CHARS);
        assert_eq!(sanitized.chars().count(), DEFAULT_MAX_INPUT_CHARS);
    }
}
