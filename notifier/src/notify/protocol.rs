// Gateway protocol - shared structs for client <-> gateway communication
// Uses framed JSON messages over Unix sockets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol version exchanged during the handshake
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum size of a single framed message (request, response, or push event)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1MB

/// Category of backend row being watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A direct chat message addressed to the recipient
    ChatMessage,
    /// An IOU naming the recipient as a party (a "mention")
    Mention,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::ChatMessage => write!(f, "chat_message"),
            RecordKind::Mention => write!(f, "mention"),
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat_message" => Ok(RecordKind::ChatMessage),
            "mention" => Ok(RecordKind::Mention),
            _ => Err(format!("Unknown record kind: {}", s)),
        }
    }
}

/// An authenticated backend session for the current user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Backend user id the session belongs to
    pub user_id: String,
}

/// A user profile row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Unique username; rendered with an `@` prefix in UI contexts
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A chat message row inserted for the recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An IOU row naming the recipient, carrying a free-form narrative.
///
/// The narrative may carry a taxonomy prefix separated from the text by
/// the first `" | "`; the prefix is stripped before display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub creator_id: String,
    pub receiver_id: String,
    pub narrative: String,
    pub created_at: DateTime<Utc>,
}

/// A pushed row, tagged by record kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    ChatMessage(ChatMessage),
    Mention(Mention),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::ChatMessage(_) => RecordKind::ChatMessage,
            Record::Mention(_) => RecordKind::Mention,
        }
    }
}

// ============================================================================
// Client -> Gateway requests
// ============================================================================

/// Request message from the notifier to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Protocol handshake, sent first on every connection
    Handshake { client_version: u32 },
    /// Resolve the current authenticated session, if any
    GetSession,
    /// Fetch a profile row by user id
    GetProfile { user_id: String },
    /// Open a push channel for rows of `kind` where the recipient field
    /// equals `recipient_id`; the connection then carries insert events
    Subscribe {
        kind: RecordKind,
        recipient_id: String,
    },
    /// Ping to check the gateway is alive
    Ping,
}

// ============================================================================
// Gateway -> Client responses
// ============================================================================

/// Machine-readable error categories returned by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    GatewayUnavailable,
    InvalidRequest,
    VersionMismatch,
    Timeout,
    Internal,
}

/// Response message from the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayResponse {
    /// Handshake accepted
    Handshake { protocol_version: u32 },
    /// Current session, or `None` when unauthenticated
    Session {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<AuthSession>,
    },
    /// Profile lookup result, or `None` when the row does not exist
    Profile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile: Option<Profile>,
    },
    /// Push channel opened; insert events follow on this connection
    Subscribed {
        subscription_id: u64,
        kind: RecordKind,
    },
    /// Pong response
    Pong,
    /// Error response
    Error {
        code: GatewayErrorCode,
        message: String,
    },
}

// ============================================================================
// Gateway -> Client push events (subscription connections only)
// ============================================================================

/// Push frame delivered on an open subscription connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A row matching the subscription filter was inserted
    Insert {
        subscription_id: u64,
        record: Record,
    },
}

// ============================================================================
// Helpers for message framing
// ============================================================================

/// Serialize a message to JSON bytes with newline delimiter
pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Deserialize a message from JSON bytes (strips trailing newline)
pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, serde_json::Error> {
    let trimmed = if bytes.last() == Some(&b'\n') {
        &bytes[..bytes.len() - 1]
    } else {
        bytes
    };
    serde_json::from_slice(trimmed)
}
