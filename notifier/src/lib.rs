// Realtime notifications for TinyIOU
//
// Watches the gateway's change feeds for chat messages and IOU mentions
// addressed to the current user and raises in-app toasts, a chime, and
// desktop notifications. The hosting app constructs a Notifier instance
// explicitly and keeps it for lifecycle control; nothing here is a global.

pub mod notify;

pub use notify::config::Config;
pub use notify::payload::{NotificationPayload, ToastAction};
pub use notify::protocol::RecordKind;
pub use notify::toast::{Toast, ToastId, ToastStack};

#[cfg(unix)]
pub use notify::controller::{Notifier, NotifierState};
#[cfg(unix)]
pub use notify::session::Identity;
#[cfg(unix)]
pub use notify::subscriber::SubscriptionHandle;
