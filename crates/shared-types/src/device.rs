//! # Device Payloads
//!
//! Simple command and state payloads for switchable devices and for the
//! bridge's own connection status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{payload_str, ValidationError};

/// Command addressed to a bridge's system topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemCommand {
    Connect,
    Disconnect,
}

impl SystemCommand {
    /// Parse a raw payload (`connect` or `disconnect`).
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        match payload_str(payload)? {
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(ValidationError::InvalidSystemCommand(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}

/// On/off state of a switchable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    /// Parse a raw payload (`on` or `off`).
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        match payload_str(payload)? {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(ValidationError::InvalidSwitchState(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status a bridge publishes on its `connected` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionState {
    /// Not connected to the transport (`"0"`).
    Disconnected,
    /// Connected to the transport, hardware unreachable (`"1"`).
    TransportOnly,
    /// Fully operational (`"2"`).
    Operational,
}

impl ConnectionState {
    /// Parse the wire form (`0`, `1` or `2`).
    pub fn parse(payload: &[u8]) -> Result<Self, ValidationError> {
        match payload_str(payload)? {
            "0" => Ok(Self::Disconnected),
            "1" => Ok(Self::TransportOnly),
            "2" => Ok(Self::Operational),
            other => Err(ValidationError::InvalidConnectionState(other.to_string())),
        }
    }

    /// Wire form of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "0",
            Self::TransportOnly => "1",
            Self::Operational => "2",
        }
    }

    /// State for a connected transport, given whether the hardware is reachable.
    #[must_use]
    pub fn connected(hardware_connected: bool) -> Self {
        if hardware_connected {
            Self::Operational
        } else {
            Self::TransportOnly
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_command() {
        assert_eq!(SystemCommand::parse(b"connect"), Ok(SystemCommand::Connect));
        assert_eq!(
            SystemCommand::parse(b"disconnect"),
            Ok(SystemCommand::Disconnect)
        );
        assert_eq!(
            SystemCommand::parse(b"reboot"),
            Err(ValidationError::InvalidSystemCommand("reboot".into()))
        );
        assert_eq!(SystemCommand::Connect.as_str(), "connect");
    }

    #[test]
    fn test_switch_state() {
        assert_eq!(SwitchState::parse(b"on"), Ok(SwitchState::On));
        assert_eq!(SwitchState::parse(b"off"), Ok(SwitchState::Off));
        // Case matters on the wire
        assert!(SwitchState::parse(b"ON").is_err());
        assert_eq!(SwitchState::Off.to_string(), "off");
    }

    #[test]
    fn test_connection_state_wire_form() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::TransportOnly,
            ConnectionState::Operational,
        ] {
            assert_eq!(ConnectionState::parse(state.as_str().as_bytes()), Ok(state));
        }
        assert!(ConnectionState::parse(b"3").is_err());
    }

    #[test]
    fn test_connection_state_from_hardware() {
        assert_eq!(ConnectionState::connected(true), ConnectionState::Operational);
        assert_eq!(
            ConnectionState::connected(false),
            ConnectionState::TransportOnly
        );
        assert!(ConnectionState::Disconnected < ConnectionState::Operational);
    }
}
