//! # Shared Types Crate
//!
//! Payload shapes exchanged over the smart-home transport.
//!
//! ## Design Principles
//!
//! - **Parse, then validate**: every `parse` function returns a value that
//!   already passed [`Validate`].
//! - **One shape per kind**: requests whose payload depends on a kind tag
//!   are sum types, never a loosely typed value inspected later.

pub mod device;
pub mod errors;
pub mod media;

pub use device::{ConnectionState, SwitchState, SystemCommand};
pub use errors::ValidationError;
pub use media::*;

/// Validation of a parsed payload.
pub trait Validate {
    /// Check the invariants of the payload.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Decode a raw payload as UTF-8.
pub fn payload_str(payload: &[u8]) -> Result<&str, ValidationError> {
    std::str::from_utf8(payload).map_err(|_| ValidationError::NotUtf8)
}

/// Parse a boolean the way command-line style payloads spell it
/// (`1`, `t`, `true`, `0`, `f`, `false`, ... in the usual casings).
pub fn parse_bool(payload: &[u8]) -> Result<bool, ValidationError> {
    let raw = payload_str(payload)?;
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(ValidationError::InvalidBool(other.to_string())),
    }
}

/// Parse a decimal integer payload.
pub fn parse_int(payload: &[u8]) -> Result<i32, ValidationError> {
    let raw = payload_str(payload)?;
    raw.parse()
        .map_err(|_| ValidationError::InvalidInteger(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(raw.as_bytes()), Ok(true));
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw.as_bytes()), Ok(false));
        }
        assert!(matches!(
            parse_bool(b"yes"),
            Err(ValidationError::InvalidBool(_))
        ));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(b"-30"), Ok(-30));
        assert!(matches!(
            parse_int(b"fast"),
            Err(ValidationError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_payload_must_be_utf8() {
        assert_eq!(payload_str(&[0xff, 0xfe]), Err(ValidationError::NotUtf8));
    }
}
