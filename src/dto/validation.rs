//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a display name (team or player) is not only whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Alice") // Ok
/// validate_display_name("   ")   // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Name must contain at least one visible character".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a host PIN: 4 to 20 characters without surrounding whitespace.
pub fn validate_host_pin(pin: &str) -> Result<(), ValidationError> {
    let len = pin.chars().count();
    if !(4..=20).contains(&len) {
        let mut err = ValidationError::new("host_pin_length");
        err.message = Some(format!("Host pin must be 4 to 20 characters (got {len})").into());
        return Err(err);
    }

    if pin.trim() != pin {
        let mut err = ValidationError::new("host_pin_whitespace");
        err.message = Some("Host pin must not start or end with whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Normalise a join code typed by a user: uppercase ASCII letters only.
pub fn normalize_join_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
