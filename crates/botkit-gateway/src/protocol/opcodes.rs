//! Gateway operation codes
//!
//! Op code numbering as used by gateway API v10.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// An event was dispatched (receive)
    Dispatch = 0,
    /// Keep the connection alive (send/receive)
    Heartbeat = 1,
    /// Start a new session (send)
    Identify = 2,
    /// Update the client's presence (send)
    PresenceUpdate = 3,
    /// Resume a previous session (send)
    Resume = 6,
    /// Reconnect and resume immediately (receive)
    Reconnect = 7,
    /// Request guild member chunks (send)
    RequestGuildMembers = 8,
    /// The session has been invalidated (receive)
    InvalidSession = 9,
    /// Sent immediately after connecting (receive)
    Hello = 10,
    /// Heartbeat acknowledged (receive)
    HeartbeatAck = 11,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the client may send this op code
    #[must_use]
    pub const fn is_send_op(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::Identify
                | Self::PresenceUpdate
                | Self::Resume
                | Self::RequestGuildMembers
        )
    }

    /// Check if the server may send this op code
    #[must_use]
    pub const fn is_receive_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::RequestGuildMembers => "RequestGuildMembers",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_table() {
        let table = [
            (0, OpCode::Dispatch),
            (1, OpCode::Heartbeat),
            (2, OpCode::Identify),
            (3, OpCode::PresenceUpdate),
            (6, OpCode::Resume),
            (7, OpCode::Reconnect),
            (8, OpCode::RequestGuildMembers),
            (9, OpCode::InvalidSession),
            (10, OpCode::Hello),
            (11, OpCode::HeartbeatAck),
        ];
        for (raw, op) in table {
            assert_eq!(OpCode::from_u8(raw), Some(op));
            assert_eq!(op.as_u8(), raw);
        }
        assert_eq!(OpCode::from_u8(4), None);
        assert_eq!(OpCode::from_u8(5), None);
    }

    #[test]
    fn test_direction() {
        assert!(OpCode::Identify.is_send_op());
        assert!(!OpCode::Identify.is_receive_op());
        assert!(OpCode::Heartbeat.is_send_op() && OpCode::Heartbeat.is_receive_op());
        assert!(OpCode::InvalidSession.is_receive_op());
        assert!(!OpCode::Dispatch.is_send_op());
    }

    #[test]
    fn test_serde_as_integer() {
        assert_eq!(serde_json::to_string(&OpCode::Resume).unwrap(), "6");
        assert_eq!(serde_json::from_str::<OpCode>("10").unwrap(), OpCode::Hello);
        assert!(serde_json::from_str::<OpCode>("12").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(OpCode::HeartbeatAck.to_string(), "HeartbeatAck (11)");
    }
}
