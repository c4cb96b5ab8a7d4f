// In-app toast container
//
// Holds the visible toasts in arrival order. Toasts leave only through an
// explicit user action (dismiss or activate); there is no timer-based
// removal for the in-app stack. The container can be closed on teardown,
// after which pushes land as no-ops.

use super::payload::{NotificationPayload, ToastAction};
use super::protocol::RecordKind;
use chrono::{DateTime, Utc};

pub type ToastId = u64;

/// One visible notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: ToastId,
    pub kind: RecordKind,
    pub title: String,
    pub body: String,
    pub originating_handle: String,
    pub action: Option<ToastAction>,
    pub raised_at: DateTime<Utc>,
}

/// Container for visible toasts, owned by one notifier instance.
///
/// No stacking limit: toasts accumulate until the user acts on them.
#[derive(Debug, Default)]
pub struct ToastStack {
    toasts: Vec<Toast>,
    next_id: ToastId,
    closed: bool,
}

impl ToastStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a toast for `payload` in arrival order.
    ///
    /// Returns `None` once the container is closed; deliveries racing a
    /// teardown become no-ops rather than errors.
    pub fn push(&mut self, payload: NotificationPayload) -> Option<ToastId> {
        if self.closed {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            kind: payload.kind,
            title: payload.title,
            body: payload.body,
            originating_handle: payload.originating_handle,
            action: payload.action,
            raised_at: Utc::now(),
        });
        Some(id)
    }

    /// Remove a toast by id. Idempotent; returns whether anything was removed.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// Remove a toast and hand back its action link for the host to open.
    ///
    /// Returns `None` when the toast is gone or carried no action; the toast
    /// is removed either way, matching a click on its action button.
    pub fn activate(&mut self, id: ToastId) -> Option<String> {
        let index = self.toasts.iter().position(|t| t.id == id)?;
        let toast = self.toasts.remove(index);
        toast.action.map(|a| a.link)
    }

    /// Toasts in display order (arrival order)
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drop all toasts and refuse further pushes; used on teardown
    pub fn close(&mut self) {
        self.closed = true;
        self.toasts.clear();
    }
}
