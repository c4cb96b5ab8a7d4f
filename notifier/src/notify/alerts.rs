//! Chime playback and desktop notification escapes.
//!
//! Emits terminal escape codes (BEL, OSC 9, OSC 777, OSC 99) for the
//! desktop notification channel and synthesizes the notification chime
//! through rodio. Both channels are best-effort: failures log and degrade
//! to the in-app toast.

use super::config::Config;
use anyhow::{Context, Result};
use crossterm::tty::IsTty;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};
use std::io::{self, Write};
use std::time::Duration;

/// Chime oscillator frequency
const CHIME_FREQ_HZ: f32 = 800.0;

/// Chime gain; quiet enough not to be jarring
const CHIME_GAIN: f32 = 0.1;

/// Chime length, envelope decay included
const CHIME_DURATION: Duration = Duration::from_millis(500);

/// How long a desktop notification stays up before the close frame
pub const NATIVE_CLOSE_DELAY: Duration = Duration::from_secs(5);

/// Whether the desktop notification channel may be used.
///
/// The permission probe: the config toggle must be on and stdout must be a
/// terminal that can carry the escapes. Unavailability degrades silently to
/// toast-only.
pub fn desktop_alerts_available(config: &Config) -> bool {
    config.desktop_alerts_enabled && io::stdout().is_tty()
}

/// Play the notification chime on a detached thread.
///
/// A sine tone with a fade-out envelope. No audio device is non-fatal; the
/// failure is logged and the toast still renders.
pub fn play_chime() {
    std::thread::spawn(|| {
        if let Err(e) = play_chime_blocking() {
            eprintln!("tinyoui-notify: audio setup failed: {}", e);
        }
    });
}

fn play_chime_blocking() -> Result<()> {
    let (_stream, stream_handle) =
        OutputStream::try_default().context("No audio output device available")?;
    let sink = Sink::try_new(&stream_handle).context("Failed to create audio sink")?;

    let mut tone = SineWave::new(CHIME_FREQ_HZ).take_duration(CHIME_DURATION);
    tone.set_filter_fadeout();
    sink.append(tone.amplify(CHIME_GAIN));
    sink.sleep_until_end();
    Ok(())
}

/// Emit desktop notification escape codes to stdout.
///
/// Writes multiple sequences to support various terminal emulators:
/// - BEL (`\x07`) - Universal terminal bell
/// - OSC 9 (iTerm2) - Desktop notification
/// - OSC 777 (Konsole/VTE/Gnome Terminal) - Desktop notification
/// - OSC 99 (kitty) - Desktop notification, id-addressable for auto-close
pub fn emit_desktop_notification(id: u64, title: &str, body: &str) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(&render_notification_frames(id, title, body));
    let _ = stdout.flush();
}

/// Emit the close frame for a previously raised desktop notification.
///
/// Only OSC 99 terminals honor close-by-id; the other sequences have no
/// close protocol and are left to the terminal's own expiry.
pub fn emit_desktop_close(id: u64) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(&render_close_frame(id));
    let _ = stdout.flush();
}

fn render_notification_frames(id: u64, title: &str, body: &str) -> Vec<u8> {
    let mut frames = Vec::new();

    // BEL - universal terminal bell
    frames.extend_from_slice(b"\x07");

    // OSC 9 - iTerm2 notification
    // Format: ESC ] 9 ; message BEL
    frames.extend_from_slice(format!("\x1b]9;{}\x07", escape_osc(body)).as_bytes());

    // OSC 777 - Konsole/VTE/Gnome Terminal
    // Format: ESC ] 777 ; notify ; title ; message BEL
    frames.extend_from_slice(
        format!(
            "\x1b]777;notify;{};{}\x07",
            escape_osc(title),
            escape_osc(body)
        )
        .as_bytes(),
    );

    // OSC 99 - kitty notification
    // Format: ESC ] 99 ; i=<id>:d=0:p=payload ; message ST
    // d=0: no terminal sound (the chime is ours), p: payload type
    frames.extend_from_slice(
        format!(
            "\x1b]99;i={id}:d=0:p=title;{}\x1b\\\x1b]99;i={id}:d=0:p=body;{}\x1b\\",
            escape_osc(title),
            escape_osc(body)
        )
        .as_bytes(),
    );

    frames
}

fn render_close_frame(id: u64) -> Vec<u8> {
    format!("\x1b]99;i={id}:p=close;\x1b\\").into_bytes()
}

/// Escapes special characters for OSC sequences
fn escape_osc(s: &str) -> String {
    // OSC sequences are terminated by BEL or ST, so we need to escape those
    s.replace('\x07', "")
        .replace('\x1b', "")
        .replace('\n', " ")
        .replace('\r', "")
}
