//! # Error Types
//!
//! Rejections produced while parsing and validating payloads.

use thiserror::Error;

/// A payload failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Payload bytes are not UTF-8.
    #[error("Payload is not valid UTF-8")]
    NotUtf8,

    /// JSON payload could not be decoded.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("'{0}' is not a valid boolean")]
    InvalidBool(String),

    #[error("'{0}' is not a valid integer")]
    InvalidInteger(String),

    #[error("System state '{0}' is not valid")]
    InvalidSystemCommand(String),

    #[error("State '{0}' is not valid")]
    InvalidSwitchState(String),

    #[error("Connection state '{0}' is not valid")]
    InvalidConnectionState(String),

    #[error("Playback state '{0}' is not valid")]
    InvalidPlaybackCommand(String),

    #[error("Playback option '{0}' is not valid")]
    InvalidPlaybackOption(String),

    /// Volume outside of the advertised range.
    #[error("Volume is {volume}, but has to be between {min} and {max} (min, max)")]
    VolumeOutOfRange { volume: f64, min: f64, max: f64 },

    /// Play request with a kind that has no payload shape.
    #[error("Playing '{0}' is not valid")]
    UnknownPlayKind(String),

    /// Play request missing one of the fields its kind requires.
    #[error("Playing {what} requires {required}")]
    MissingFields {
        what: &'static str,
        required: &'static str,
    },

    #[error("Playback requires a source and state")]
    IncompletePlayback,
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
