// Validation functions for formpilot
// Provides the per-rule checks used by field schemas and the builder

use regex::Regex;
use std::sync::LazyLock;

/// Shape of an email address: local part, `@`, dotted domain with a TLD
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";

/// Check that a string looks like an email address
///
/// Returns Ok(()) if valid, Err(message) if invalid
pub fn validate_email(value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.contains("..") || !EMAIL_SHAPE.is_match(value) {
        return Err(INVALID_EMAIL_MESSAGE.to_string());
    }
    Ok(())
}

/// Check character-count bounds on a non-empty string
pub fn validate_length(
    label: &str,
    value: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<(), String> {
    let length = value.chars().count();

    if let Some(min) = min_length {
        if length < min {
            return Err(format!("{} must be at least {} characters", label, min));
        }
    }
    if let Some(max) = max_length {
        if length > max {
            return Err(format!("{} must not exceed {} characters", label, max));
        }
    }

    Ok(())
}

/// Compile an author-supplied pattern so that it must match the whole value.
/// Returns None (and logs) when the pattern is not a valid regex.
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "ignoring unparsable field pattern");
            None
        }
    }
}

/// Check a value against a compiled field pattern
pub fn validate_pattern(
    label: &str,
    value: &str,
    pattern: &Regex,
    message: Option<&str>,
) -> Result<(), String> {
    if !pattern.is_match(value) {
        return Err(message
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} has invalid format", label)));
    }
    Ok(())
}

/// Check numeric bounds
pub fn validate_range(label: &str, value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
    if let Some(min) = min {
        if value < min {
            return Err(format!("{} must be at least {}", label, min));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(format!("{} must be at most {}", label, max));
        }
    }
    Ok(())
}

/// Validate a field name key (letters, numbers, underscores, not starting
/// with a digit). Dots are reserved as the path separator.
pub fn validate_field_name(field_name: &str) -> Result<(), String> {
    if field_name.is_empty() {
        return Err("Field name cannot be empty".to_string());
    }
    if field_name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid field name '{}': must not start with a digit", field_name));
    }
    if !field_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format!(
            "Invalid field name '{}': must contain only letters, numbers, and underscores",
            field_name
        ));
    }
    Ok(())
}
