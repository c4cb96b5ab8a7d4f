// Payload construction for inbound records
//
// Turns a pushed row plus the resolved sender profile into the normalized
// payload the renderer consumes: title, truncated body, and the action link.

use super::protocol::{ChatMessage, Mention, Profile, Record, RecordKind};
use thiserror::Error;

/// Maximum body length for chat message previews (chars, ellipsis included)
pub const CHAT_BODY_MAX: usize = 50;

/// Maximum body length for mention previews (chars, ellipsis included)
pub const MENTION_BODY_MAX: usize = 70;

/// Display name used when a message sender's profile cannot be resolved
const FALLBACK_SENDER: &str = "TinyOui User";

/// Display name used when an IOU creator's profile cannot be resolved
const FALLBACK_CREATOR: &str = "Anon";

/// A record that cannot be rendered; the notification is dropped
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("record {id} has an empty {field}")]
    EmptyBody { id: String, field: &'static str },
}

/// Action offered on a toast; the host opens `link` when activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    pub label: String,
    pub link: String,
}

/// Normalized notification payload, consumed immediately by the renderer
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub kind: RecordKind,
    pub title: String,
    pub body: String,
    /// Handle of the user the notification originates from; falls back to a
    /// display name when the profile lookup failed
    pub originating_handle: String,
    pub action: Option<ToastAction>,
}

/// Build a payload for a pushed record.
///
/// `sender` is the resolved profile of the row's sender/creator, when the
/// lookup succeeded; without it the title uses a fallback display name and
/// the action is omitted (there is no navigable target).
pub fn build_payload(
    record: &Record,
    sender: Option<&Profile>,
    app_origin: &str,
) -> Result<NotificationPayload, PayloadError> {
    match record {
        Record::ChatMessage(msg) => chat_payload(msg, sender, app_origin),
        Record::Mention(mention) => mention_payload(mention, sender, app_origin),
    }
}

fn chat_payload(
    msg: &ChatMessage,
    sender: Option<&Profile>,
    app_origin: &str,
) -> Result<NotificationPayload, PayloadError> {
    if msg.content.trim().is_empty() {
        return Err(PayloadError::EmptyBody {
            id: msg.id.clone(),
            field: "content",
        });
    }

    let handle = sender.map(|p| p.username.as_str());
    Ok(NotificationPayload {
        kind: RecordKind::ChatMessage,
        title: format!("Message from @{}", handle.unwrap_or(FALLBACK_SENDER)),
        body: truncate_body(&msg.content, CHAT_BODY_MAX),
        originating_handle: handle.unwrap_or(FALLBACK_SENDER).to_string(),
        action: handle.map(|h| ToastAction {
            label: "Reply".to_string(),
            link: format!("{}/chat.html?target={}", app_origin, h),
        }),
    })
}

fn mention_payload(
    mention: &Mention,
    creator: Option<&Profile>,
    app_origin: &str,
) -> Result<NotificationPayload, PayloadError> {
    let narrative = strip_taxonomy(&mention.narrative);
    if narrative.trim().is_empty() {
        return Err(PayloadError::EmptyBody {
            id: mention.id.clone(),
            field: "narrative",
        });
    }

    let handle = creator.map(|p| p.username.as_str());
    Ok(NotificationPayload {
        kind: RecordKind::Mention,
        title: format!("IOU from @{}", handle.unwrap_or(FALLBACK_CREATOR)),
        body: truncate_body(narrative, MENTION_BODY_MAX),
        originating_handle: handle.unwrap_or(FALLBACK_CREATOR).to_string(),
        action: handle.map(|h| ToastAction {
            label: "View IOU".to_string(),
            link: format!("{}/?u={}", app_origin, h),
        }),
    })
}

/// Strip the taxonomy prefix before the first `" | "` separator.
///
/// Trailing segments stay joined: `"a | b | c"` yields `"b | c"`.
fn strip_taxonomy(narrative: &str) -> &str {
    narrative
        .split_once(" | ")
        .map(|(_, rest)| rest)
        .unwrap_or(narrative)
}

/// Truncate to `max_chars`, ellipsis included, without splitting a code point
fn truncate_body(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
