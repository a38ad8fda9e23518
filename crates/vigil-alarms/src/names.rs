//! Argument validation for alarm registration.
//!
//! Valid alarm names are non-empty and contain no control characters.
//! Identifiers are non-negative.

use crate::error::{AlarmError, Result};

/// Validate an alarm name, returning `Ok(())` if valid.
///
/// ```
/// use vigil_alarms::names::validate_alarm_name;
///
/// assert!(validate_alarm_name("door-open").is_ok());
/// assert!(validate_alarm_name("").is_err());
/// ```
pub fn validate_alarm_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AlarmError::InvalidArgument {
            field: "name",
            reason: "alarm name must not be empty".into(),
        });
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(AlarmError::InvalidArgument {
            field: "name",
            reason: format!("contains control character: {ch:?}"),
        });
    }

    Ok(())
}

/// Validate an alarm identifier.
pub fn validate_alarm_id(id: i32) -> Result<()> {
    if id < 0 {
        return Err(AlarmError::InvalidArgument {
            field: "id",
            reason: format!("alarm id must be non-negative, got {id}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["a", "door", "zone 3/smoke", "pump.pressure_high"] {
            assert!(validate_alarm_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_names() {
        assert!(validate_alarm_name("").is_err());
        assert!(validate_alarm_name("bad\nname").is_err());
        assert!(validate_alarm_name("tab\there").is_err());
    }

    #[test]
    fn ids() {
        assert!(validate_alarm_id(0).is_ok());
        assert!(validate_alarm_id(i32::MAX).is_ok());
        match validate_alarm_id(-1) {
            Err(AlarmError::InvalidArgument { field, .. }) => assert_eq!(field, "id"),
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }
}
