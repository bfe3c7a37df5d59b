//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted platform identifier.
const MAX_ID_LENGTH: usize = 64;

/// Validates an opaque platform identifier (guild, player): 1 to 64 printable,
/// non-whitespace ASCII characters.
///
/// # Examples
///
/// ```ignore
/// validate_opaque_id("80351110224678912") // Ok
/// validate_opaque_id("")                  // Err - empty
/// validate_opaque_id("80351 10224")       // Err - whitespace
/// ```
pub fn validate_opaque_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH {
        let mut err = ValidationError::new("id_length");
        err.message = Some(
            format!(
                "Identifier must be between 1 and {MAX_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_graphic()) {
        let mut err = ValidationError::new("id_format");
        err.message = Some("Identifier must contain only printable ASCII characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_opaque_id_valid() {
        assert!(validate_opaque_id("80351110224678912").is_ok());
        assert!(validate_opaque_id("player-1").is_ok());
        assert!(validate_opaque_id("a").is_ok());
    }

    #[test]
    fn test_validate_opaque_id_invalid_length() {
        assert!(validate_opaque_id("").is_err());
        assert!(validate_opaque_id(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_opaque_id_invalid_format() {
        assert!(validate_opaque_id("803 511").is_err()); // space
        assert!(validate_opaque_id("803\t511").is_err()); // tab
        assert!(validate_opaque_id("pläyer").is_err()); // non-ascii
    }
}
