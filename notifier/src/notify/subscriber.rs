// Subscription management for gateway push channels
//
// Each subscription owns a dedicated gateway connection: after the
// handshake and a Subscribe exchange, the connection carries insert events
// which a background reader thread forwards into the delivery channel in
// arrival order.

use super::config::Config;
use super::gateway;
use super::protocol::{
    deserialize_message, serialize_message, GatewayEvent, GatewayRequest, GatewayResponse, Record,
    RecordKind, MAX_FRAME_SIZE,
};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque reference to an open push channel.
///
/// Closing the connection is the unsubscribe; `close` is idempotent and
/// `Drop` closes.
pub struct SubscriptionHandle {
    kind: RecordKind,
    subscription_id: u64,
    /// Clone of the connection, kept for shutdown
    stream: UnixStream,
    /// Flag indicating the subscription is still open
    alive: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn subscription_id(&self) -> u64 {
        self.subscription_id
    }

    pub fn is_open(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Close the push channel. Idempotent.
    ///
    /// Shuts the socket down, which unblocks the reader thread; any event
    /// already handed to the delivery channel still drains.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open a push channel for `kind` rows addressed to `recipient_id`.
///
/// The gateway filters server-side; every insert event delivered on the
/// connection matches the recipient. Forwarded records preserve the order
/// the gateway pushed them in.
pub fn subscribe(
    config: &Config,
    kind: RecordKind,
    recipient_id: &str,
    events_tx: mpsc::Sender<Record>,
) -> Result<SubscriptionHandle> {
    let mut stream = gateway::connect(config)?;

    // Subscription connections block on pushes indefinitely
    stream
        .set_read_timeout(None)
        .context("Failed to clear read timeout on subscription stream")?;

    gateway::handshake(&mut stream)?;

    // One reader lives from here on; push frames arriving right behind the
    // subscribe confirmation stay buffered for the reader thread
    let mut reader = BufReader::new(
        stream
            .try_clone()
            .context("Failed to clone subscription stream for reading")?,
    );

    let request = GatewayRequest::Subscribe {
        kind,
        recipient_id: recipient_id.to_string(),
    };
    let bytes = serialize_message(&request).context("Failed to serialize subscribe request")?;
    stream
        .write_all(&bytes)
        .context("Failed to send subscribe request")?;
    stream.flush().context("Failed to flush subscribe request")?;

    let subscription_id = match gateway::read_response_from(&mut reader)? {
        GatewayResponse::Subscribed {
            subscription_id,
            kind: confirmed,
        } => {
            if confirmed != kind {
                return Err(anyhow::anyhow!(
                    "Gateway confirmed wrong record kind: asked {}, got {}",
                    kind,
                    confirmed
                ));
            }
            subscription_id
        }
        GatewayResponse::Error { message, .. } => {
            return Err(anyhow::anyhow!("Subscribe rejected: {}", message));
        }
        other => {
            return Err(anyhow::anyhow!(
                "Expected subscribed response, got: {:?}",
                other
            ));
        }
    };

    let alive = Arc::new(AtomicBool::new(true));
    spawn_reader_thread(reader, kind, Arc::clone(&alive), events_tx);

    Ok(SubscriptionHandle {
        kind,
        subscription_id,
        stream,
        alive,
    })
}

/// Spawn the reader thread that forwards pushed insert events.
///
/// Malformed or oversized frames are logged and dropped; the stream
/// continues. The thread exits on EOF, read error, shutdown, or when the
/// delivery channel is gone.
fn spawn_reader_thread(
    mut reader: BufReader<UnixStream>,
    kind: RecordKind,
    alive: Arc<AtomicBool>,
    events_tx: mpsc::Sender<Record>,
) {
    std::thread::spawn(move || {
        let mut line = String::new();

        loop {
            if !alive.load(Ordering::SeqCst) {
                break;
            }

            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    // EOF - gateway closed the channel
                    if alive.load(Ordering::SeqCst) {
                        eprintln!("tinyoui-notify: {} feed closed by gateway", kind);
                    }
                    break;
                }
                Ok(_) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if line.len() > MAX_FRAME_SIZE {
                        eprintln!(
                            "tinyoui-notify: dropped oversized {} event frame ({} bytes)",
                            kind,
                            line.len()
                        );
                        continue;
                    }
                    match deserialize_message::<GatewayEvent>(line.as_bytes()) {
                        Ok(GatewayEvent::Insert { record, .. }) => {
                            // Delivery pump gone; nothing left to notify
                            if events_tx.blocking_send(record).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            eprintln!("tinyoui-notify: dropped malformed {} event: {}", kind, e);
                        }
                    }
                }
                Err(e) => {
                    if alive.load(Ordering::SeqCst) {
                        eprintln!("tinyoui-notify: {} feed read error: {}", kind, e);
                    }
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::protocol::ChatMessage;
    use chrono::Utc;

    fn chat_record(id: &str, content: &str) -> Record {
        Record::ChatMessage(ChatMessage {
            id: id.to_string(),
            sender_id: "u-sender".to_string(),
            receiver_id: "u-receiver".to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        })
    }

    fn insert_frame(record: Record) -> Vec<u8> {
        serialize_message(&GatewayEvent::Insert {
            subscription_id: 1,
            record,
        })
        .unwrap()
    }

    #[test]
    fn reader_forwards_events_in_arrival_order() {
        let (reader_end, mut writer_end) = UnixStream::pair().unwrap();
        let (tx, mut rx) = mpsc::channel::<Record>(16);
        let alive = Arc::new(AtomicBool::new(true));

        spawn_reader_thread(BufReader::new(reader_end), RecordKind::ChatMessage, alive, tx);

        writer_end
            .write_all(&insert_frame(chat_record("m-1", "first")))
            .unwrap();
        writer_end
            .write_all(&insert_frame(chat_record("m-2", "second")))
            .unwrap();
        drop(writer_end);

        let first = rx.blocking_recv().expect("first record");
        let second = rx.blocking_recv().expect("second record");
        match (first, second) {
            (Record::ChatMessage(a), Record::ChatMessage(b)) => {
                assert_eq!(a.content, "first");
                assert_eq!(b.content, "second");
            }
            other => panic!("Expected chat messages, got {:?}", other),
        }

        // Writer closed, thread exits, channel drains to None
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn reader_drops_malformed_frames_and_continues() {
        let (reader_end, mut writer_end) = UnixStream::pair().unwrap();
        let (tx, mut rx) = mpsc::channel::<Record>(16);
        let alive = Arc::new(AtomicBool::new(true));

        spawn_reader_thread(BufReader::new(reader_end), RecordKind::ChatMessage, alive, tx);

        writer_end.write_all(b"{\"not\": \"an event\"}\n").unwrap();
        writer_end
            .write_all(&insert_frame(chat_record("m-3", "still delivered")))
            .unwrap();
        drop(writer_end);

        match rx.blocking_recv().expect("record after malformed frame") {
            Record::ChatMessage(msg) => assert_eq!(msg.content, "still delivered"),
            other => panic!("Expected chat message, got {:?}", other),
        }
    }

    #[test]
    fn reader_stops_once_alive_cleared() {
        let (reader_end, mut writer_end) = UnixStream::pair().unwrap();
        let (tx, mut rx) = mpsc::channel::<Record>(16);
        let alive = Arc::new(AtomicBool::new(true));

        spawn_reader_thread(
            BufReader::new(reader_end),
            RecordKind::Mention,
            Arc::clone(&alive),
            tx,
        );

        alive.store(false, Ordering::SeqCst);
        // Unblock the pending read; the thread observes the cleared flag
        let _ = writer_end.write_all(&insert_frame(chat_record("m-4", "late")));
        drop(writer_end);

        // Whether or not the in-flight frame squeaked through, the channel
        // closes once the thread exits
        while rx.blocking_recv().is_some() {}
    }
}
