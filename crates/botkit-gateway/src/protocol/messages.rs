//! Gateway message format
//!
//! Every frame is parsed into the `GatewayMessage` envelope first; the
//! payload is only decoded once the op code says which shape it holds.

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresencePayload, RequestGuildMembersPayload,
    ResumePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event name (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default)]
    pub d: Option<Value>,
}

/// Decoded frame sent by the server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Hello(u64),
    HeartbeatAck,
    /// Server asks for an immediate heartbeat
    HeartbeatRequest,
    Reconnect,
    InvalidSession {
        resumable: bool,
    },
    Dispatch {
        event: String,
        sequence: Option<u64>,
        data: Value,
    },
}

/// Errors decoding a frame after the envelope parsed
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("dispatch frame without event name")]
    MissingEventName,

    #[error("op code {0} is never sent by the server")]
    UnexpectedOp(OpCode),

    #[error("hello with a zero heartbeat interval")]
    ZeroHeartbeatInterval,

    #[error("invalid {op} payload: {source}")]
    Payload {
        op: OpCode,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayMessage {
    fn outgoing(op: OpCode, d: Value) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d: Some(d),
        }
    }

    /// Create a Heartbeat message (op=1) carrying the last processed sequence
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::outgoing(
            OpCode::Heartbeat,
            last_sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    /// Create an Identify message (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(OpCode::Identify, serde_json::to_value(payload)?))
    }

    /// Create a Presence Update message (op=3)
    pub fn presence_update(payload: &PresencePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(
            OpCode::PresenceUpdate,
            serde_json::to_value(payload)?,
        ))
    }

    /// Create a Resume message (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(OpCode::Resume, serde_json::to_value(payload)?))
    }

    /// Create a Request Guild Members message (op=8)
    pub fn request_guild_members(
        payload: &RequestGuildMembersPayload,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::outgoing(
            OpCode::RequestGuildMembers,
            serde_json::to_value(payload)?,
        ))
    }

    /// Decode into the frame variant named by the op code
    pub fn into_frame(self) -> Result<ServerFrame, FrameError> {
        match self.op {
            OpCode::Hello => {
                let payload: HelloPayload =
                    serde_json::from_value(self.d.unwrap_or(Value::Null)).map_err(|source| {
                        FrameError::Payload {
                            op: OpCode::Hello,
                            source,
                        }
                    })?;
                if payload.heartbeat_interval == 0 {
                    return Err(FrameError::ZeroHeartbeatInterval);
                }
                Ok(ServerFrame::Hello(payload.heartbeat_interval))
            }
            OpCode::HeartbeatAck => Ok(ServerFrame::HeartbeatAck),
            OpCode::Heartbeat => Ok(ServerFrame::HeartbeatRequest),
            OpCode::Reconnect => Ok(ServerFrame::Reconnect),
            OpCode::InvalidSession => Ok(ServerFrame::InvalidSession {
                resumable: self.d.as_ref().and_then(Value::as_bool).unwrap_or(false),
            }),
            OpCode::Dispatch => Ok(ServerFrame::Dispatch {
                event: self.t.ok_or(FrameError::MissingEventName)?,
                sequence: self.s,
                data: self.d.unwrap_or(Value::Null),
            }),
            op => Err(FrameError::UnexpectedOp(op)),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
