// In-process fake gateway for integration tests.
//
// Binds a Unix socket in a temp directory and speaks the notifier's framed
// JSON protocol: handshake, session/profile lookups, and subscriptions.
// Subscription connections stay open and receive insert events pushed by
// the test through `push_insert`, filtered by recipient the way the real
// gateway filters server-side.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use tinyoui_notify::notify::protocol::{
    deserialize_message, serialize_message, AuthSession, GatewayErrorCode, GatewayEvent,
    GatewayRequest, GatewayResponse, Profile, Record, RecordKind, PROTOCOL_VERSION,
};
use tinyoui_notify::Config;

const ACCEPT_POLL: Duration = Duration::from_millis(25);

struct Feed {
    kind: RecordKind,
    recipient_id: String,
    subscription_id: u64,
    stream: UnixStream,
}

struct GatewayState {
    session: Mutex<Option<AuthSession>>,
    profiles: Mutex<HashMap<String, Profile>>,
    subscribe_calls: Mutex<HashMap<RecordKind, usize>>,
    feeds: Mutex<Vec<Feed>>,
    next_subscription_id: AtomicU64,
    shutdown: AtomicBool,
}

/// RAII fake gateway; the socket dies with the guard's temp directory.
pub struct FakeGateway {
    state: Arc<GatewayState>,
    temp_dir: TempDir,
}

impl FakeGateway {
    /// Start a gateway that knows the given session and profiles.
    pub fn start(session: Option<AuthSession>, profiles: Vec<Profile>) -> Self {
        let temp_dir = TempDir::new().expect("temp dir for gateway socket");
        let socket_path = temp_dir.path().join("gateway.sock");
        let listener = UnixListener::bind(&socket_path).expect("bind gateway socket");
        listener
            .set_nonblocking(true)
            .expect("nonblocking gateway listener");

        let state = Arc::new(GatewayState {
            session: Mutex::new(session),
            profiles: Mutex::new(profiles.into_iter().map(|p| (p.id.clone(), p)).collect()),
            subscribe_calls: Mutex::new(HashMap::new()),
            feeds: Mutex::new(Vec::new()),
            next_subscription_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        });

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            while !accept_state.shutdown.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        // Accepted sockets must block; only the listener polls
                        let _ = stream.set_nonblocking(false);
                        let conn_state = Arc::clone(&accept_state);
                        thread::spawn(move || handle_connection(stream, conn_state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(ACCEPT_POLL);
                    }
                    Err(_) => break,
                }
            }
        });

        Self { state, temp_dir }
    }

    /// Notifier config pointing at this gateway, with the audible and
    /// desktop channels disabled for test runs.
    pub fn config(&self) -> Config {
        let mut config = Config::with_gateway_dir(self.temp_dir.path());
        config.app_origin = "https://tinyiou.test".to_string();
        config.sound_enabled = false;
        config.desktop_alerts_enabled = false;
        config
    }

    /// Push an insert event to every open feed matching the record's kind
    /// and recipient. Feeds whose client hung up are pruned.
    pub fn push_insert(&self, record: Record) {
        let kind = record.kind();
        let receiver_id = match &record {
            Record::ChatMessage(msg) => msg.receiver_id.clone(),
            Record::Mention(mention) => mention.receiver_id.clone(),
        };

        let mut feeds = self.state.feeds.lock().unwrap();
        feeds.retain_mut(|feed| {
            if feed.kind != kind {
                return true;
            }
            if feed.recipient_id != receiver_id {
                return true;
            }
            let event = GatewayEvent::Insert {
                subscription_id: feed.subscription_id,
                record: record.clone(),
            };
            let bytes = serialize_message(&event).expect("serialize insert event");
            feed.stream.write_all(&bytes).is_ok() && feed.stream.flush().is_ok()
        });
    }

    /// How many Subscribe requests this gateway has accepted for `kind`.
    pub fn subscribe_calls(&self, kind: RecordKind) -> usize {
        *self
            .state
            .subscribe_calls
            .lock()
            .unwrap()
            .get(&kind)
            .unwrap_or(&0)
    }

    /// Open feeds for `kind` still registered. Dead feeds are only pruned
    /// when a push touches them, so call `push_insert` first when asserting
    /// on leaks.
    pub fn active_feed_count(&self, kind: RecordKind) -> usize {
        self.state
            .feeds
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.kind == kind)
            .count()
    }
}

impl Drop for FakeGateway {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
    }
}

fn handle_connection(stream: UnixStream, state: Arc<GatewayState>) {
    let reader = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(_) => return,
    };
    let mut writer = stream;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: GatewayRequest = match deserialize_message(line.as_bytes()) {
            Ok(request) => request,
            Err(e) => {
                let _ = write_response(
                    &mut writer,
                    &GatewayResponse::Error {
                        code: GatewayErrorCode::InvalidRequest,
                        message: format!("unparseable request: {}", e),
                    },
                );
                continue;
            }
        };

        let keep_going = match request {
            GatewayRequest::Handshake { .. } => write_response(
                &mut writer,
                &GatewayResponse::Handshake {
                    protocol_version: PROTOCOL_VERSION,
                },
            ),
            GatewayRequest::GetSession => write_response(
                &mut writer,
                &GatewayResponse::Session {
                    session: state.session.lock().unwrap().clone(),
                },
            ),
            GatewayRequest::GetProfile { user_id } => write_response(
                &mut writer,
                &GatewayResponse::Profile {
                    profile: state.profiles.lock().unwrap().get(&user_id).cloned(),
                },
            ),
            GatewayRequest::Ping => write_response(&mut writer, &GatewayResponse::Pong),
            GatewayRequest::Subscribe { kind, recipient_id } => {
                let subscription_id = state.next_subscription_id.fetch_add(1, Ordering::SeqCst);
                *state
                    .subscribe_calls
                    .lock()
                    .unwrap()
                    .entry(kind)
                    .or_insert(0) += 1;

                // Register the feed before confirming, so a push right after
                // the client sees Subscribed cannot miss it
                match writer.try_clone() {
                    Ok(feed_stream) => {
                        state.feeds.lock().unwrap().push(Feed {
                            kind,
                            recipient_id,
                            subscription_id,
                            stream: feed_stream,
                        });
                        write_response(
                            &mut writer,
                            &GatewayResponse::Subscribed {
                                subscription_id,
                                kind,
                            },
                        )
                    }
                    Err(_) => false,
                }
            }
        };

        if !keep_going {
            break;
        }
    }
}

fn write_response(writer: &mut UnixStream, response: &GatewayResponse) -> bool {
    let bytes = match serialize_message(response) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    writer.write_all(&bytes).is_ok() && writer.flush().is_ok()
}
