// Lifecycle controller for the notification pipeline
//
// Drives the startup order (session -> profile -> subscriptions ->
// permission probe), owns the subscription handles and the toast container,
// and runs the delivery pump that renders inbound records. Initialization
// failures never propagate to the caller: the notifier stays inert.

use super::alerts;
use super::config::Config;
use super::payload::build_payload;
use super::protocol::{Record, RecordKind};
use super::session::{self, Identity};
use super::subscriber::{self, SubscriptionHandle};
use super::toast::ToastStack;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Queue depth for records awaiting delivery
const EVENT_QUEUE_SIZE: usize = 200;

/// The record kinds every active notifier watches, one subscription each
const WATCHED_KINDS: [RecordKind; 2] = [RecordKind::ChatMessage, RecordKind::Mention];

/// Lifecycle state of a notifier instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    /// Not initialized, or initialization failed; the notifier is inert
    Uninitialized,
    /// Resolving the authenticated session
    SessionLoading,
    /// Resolving the profile for the session's user
    ProfileLoading,
    /// Opening push channels
    Subscribing,
    /// Subscriptions open, deliveries flowing
    Active,
    /// Explicitly torn down
    Stopped,
}

impl std::fmt::Display for NotifierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierState::Uninitialized => write!(f, "Uninitialized"),
            NotifierState::SessionLoading => write!(f, "SessionLoading"),
            NotifierState::ProfileLoading => write!(f, "ProfileLoading"),
            NotifierState::Subscribing => write!(f, "Subscribing"),
            NotifierState::Active => write!(f, "Active"),
            NotifierState::Stopped => write!(f, "Stopped"),
        }
    }
}

impl std::str::FromStr for NotifierState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Uninitialized" => Ok(NotifierState::Uninitialized),
            "SessionLoading" => Ok(NotifierState::SessionLoading),
            "ProfileLoading" => Ok(NotifierState::ProfileLoading),
            "Subscribing" => Ok(NotifierState::Subscribing),
            "Active" => Ok(NotifierState::Active),
            "Stopped" => Ok(NotifierState::Stopped),
            _ => Err(format!("Unknown notifier state: {}", s)),
        }
    }
}

/// One notification pipeline instance.
///
/// Construct with [`Notifier::start`]; there is no ambient singleton. The
/// hosting app keeps the instance for lifecycle control and reads toasts
/// through [`Notifier::toasts`].
pub struct Notifier {
    config: Config,
    state: NotifierState,
    identity: Option<Identity>,
    toasts: Arc<Mutex<ToastStack>>,
    subscriptions: Vec<SubscriptionHandle>,
}

impl Notifier {
    /// Initialize the pipeline. Never fails to the caller.
    ///
    /// Progression: SessionLoading -> ProfileLoading -> Subscribing ->
    /// Active. A failure at any stage logs, releases whatever was opened,
    /// and returns an inert instance in `Uninitialized`.
    pub fn start(config: Config) -> Notifier {
        let mut notifier = Notifier {
            config,
            state: NotifierState::Uninitialized,
            identity: None,
            toasts: Arc::new(Mutex::new(ToastStack::new())),
            subscriptions: Vec::new(),
        };

        notifier.state = NotifierState::SessionLoading;
        let auth = match session::load_session(&notifier.config) {
            Some(auth) => auth,
            None => return notifier.into_inert(),
        };

        notifier.state = NotifierState::ProfileLoading;
        let profile = match session::load_profile(&notifier.config, &auth.user_id) {
            Some(profile) => profile,
            None => {
                eprintln!("tinyoui-notify: no profile for current user");
                return notifier.into_inert();
            }
        };
        let identity = Identity {
            user_id: auth.user_id,
            handle: profile.username,
        };

        eprintln!(
            "tinyoui-notify: subscribing to notifications for @{}",
            identity.handle
        );
        notifier.state = NotifierState::Subscribing;
        let (events_tx, events_rx) = mpsc::channel::<Record>(EVENT_QUEUE_SIZE);
        for kind in WATCHED_KINDS {
            match subscriber::subscribe(
                &notifier.config,
                kind,
                &identity.user_id,
                events_tx.clone(),
            ) {
                Ok(handle) => notifier.subscriptions.push(handle),
                Err(e) => {
                    eprintln!("tinyoui-notify: failed to subscribe to {}: {}", kind, e);
                    return notifier.into_inert();
                }
            }
        }
        drop(events_tx);

        // Permission probe happens once, after subscriptions are up; denial
        // degrades to toast-only
        let desktop_alerts = alerts::desktop_alerts_available(&notifier.config);

        spawn_delivery_pump(
            events_rx,
            Arc::clone(&notifier.toasts),
            notifier.config.clone(),
            desktop_alerts,
        );

        notifier.identity = Some(identity);
        notifier.state = NotifierState::Active;
        eprintln!("tinyoui-notify: active");
        notifier
    }

    /// Release anything opened during a failed start and stay inert
    fn into_inert(mut self) -> Notifier {
        for handle in self.subscriptions.drain(..) {
            handle.close();
        }
        self.toasts.lock().unwrap().close();
        self.state = NotifierState::Uninitialized;
        self
    }

    /// Tear the pipeline down. Idempotent.
    ///
    /// Closes every subscription handle and removes the toast container.
    /// Deliveries already in flight land as no-ops on the closed container.
    pub fn stop(&mut self) {
        if self.state == NotifierState::Stopped {
            return;
        }
        let was_active = self.state == NotifierState::Active;
        for handle in self.subscriptions.drain(..) {
            handle.close();
        }
        self.toasts.lock().unwrap().close();
        self.state = NotifierState::Stopped;
        if was_active {
            eprintln!("tinyoui-notify: stopped");
        }
    }

    /// Discard this instance and construct a fresh one from the same config
    pub fn refresh(mut self) -> Notifier {
        let config = self.config.clone();
        self.stop();
        Notifier::start(config)
    }

    pub fn state(&self) -> NotifierState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == NotifierState::Active
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Shared handle to the toast container for the hosting app
    pub fn toasts(&self) -> Arc<Mutex<ToastStack>> {
        Arc::clone(&self.toasts)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the delivery pump draining the record channel in arrival order.
///
/// The pump exits once every subscription reader has hung up. Per-record
/// failures drop only that record.
fn spawn_delivery_pump(
    mut events_rx: mpsc::Receiver<Record>,
    toasts: Arc<Mutex<ToastStack>>,
    config: Config,
    desktop_alerts: bool,
) {
    std::thread::spawn(move || {
        let mut native_seq: u64 = 0;
        while let Some(record) = events_rx.blocking_recv() {
            native_seq += 1;
            deliver(&config, &toasts, record, native_seq, desktop_alerts);
        }
    });
}

/// Render one inbound record: toast, chime, desktop notification.
fn deliver(
    config: &Config,
    toasts: &Arc<Mutex<ToastStack>>,
    record: Record,
    native_id: u64,
    desktop_alerts: bool,
) {
    let sender_id = match &record {
        Record::ChatMessage(msg) => msg.sender_id.as_str(),
        Record::Mention(mention) => mention.creator_id.as_str(),
    };
    let sender = session::load_profile(config, sender_id);

    let payload = match build_payload(&record, sender.as_ref(), &config.app_origin) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("tinyoui-notify: dropped {} record: {}", record.kind(), e);
            return;
        }
    };

    let title = payload.title.clone();
    let body = payload.body.clone();

    // Container torn down while this record was in flight; nothing to show
    if toasts.lock().unwrap().push(payload).is_none() {
        return;
    }

    if config.sound_enabled {
        alerts::play_chime();
    }

    if desktop_alerts {
        alerts::emit_desktop_notification(native_id, &title, &body);
        std::thread::spawn(move || {
            std::thread::sleep(alerts::NATIVE_CLOSE_DELAY);
            alerts::emit_desktop_close(native_id);
        });
    }
}
