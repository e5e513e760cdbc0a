//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_LANGUAGE_KEY_LEN: usize = 32;

/// Validates a language key: 1 to 32 characters of lowercase ASCII letters, digits or `_`.
///
/// Keys end up in share slugs and store document ids, so `-` and `:` are excluded.
///
/// # Examples
///
/// ```ignore
/// validate_language_key("typescript") // Ok
/// validate_language_key("TypeScript") // Err - uppercase
/// validate_language_key("c-sharp")    // Err - dash
/// ```
pub fn validate_language_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() || key.len() > MAX_LANGUAGE_KEY_LEN {
        let mut err = ValidationError::new("language_length");
        err.message = Some(
            format!(
                "Language key must be 1 to {MAX_LANGUAGE_KEY_LEN} characters (got {})",
                key.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        let mut err = ValidationError::new("language_format");
        err.message =
            Some("Language key must contain only lowercase letters, digits or `_`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_language_key_valid() {
        assert!(validate_language_key("typescript").is_ok());
        assert!(validate_language_key("python3").is_ok());
        assert!(validate_language_key("objective_c").is_ok());
    }

    #[test]
    fn test_validate_language_key_invalid_length() {
        assert!(validate_language_key("").is_err());
        assert!(validate_language_key(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_language_key_invalid_format() {
        assert!(validate_language_key("TypeScript").is_err()); // uppercase
        assert!(validate_language_key("c-sharp").is_err()); // dash
        assert!(validate_language_key("go lang").is_err()); // space
        assert!(validate_language_key("rust:1").is_err()); // colon
    }
}
