//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of the code attendees type to join an event.
pub const JOIN_CODE_LEN: usize = 6;

/// Validates that a join code is exactly six uppercase alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("K4R40K") // Ok
/// validate_join_code("k4r40k") // Err - lowercase
/// validate_join_code("K4R40")  // Err - too short
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != JOIN_CODE_LEN {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LEN} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code must contain only A-Z and 0-9".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
