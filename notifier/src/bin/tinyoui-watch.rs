// tinyoui-watch: Terminal companion for TinyIOU notifications
//
// Connects to the gateway, watches chat messages and IOU mentions for the
// current user, and prints toasts as they arrive. Runs until Ctrl-C.

use crossterm::style::Stylize;
use std::time::Duration;
use tinyoui_notify::{Config, Notifier, RecordKind, Toast, ToastId};

/// How often the toast stack is polled for new arrivals
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let mut notifier = Notifier::start(config);

    if !notifier.is_active() {
        eprintln!(
            "tinyoui-watch: notifier is inert (state: {}); check the gateway socket and your session",
            notifier.state()
        );
        return;
    }

    if let Some(identity) = notifier.identity() {
        println!(
            "{}",
            format!("Watching notifications for @{}", identity.handle).bold()
        );
    }

    let toasts = notifier.toasts();
    let mut next_unprinted: ToastId = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                let stack = toasts.lock().unwrap();
                let print_from = next_unprinted;
                for toast in stack.toasts().iter().filter(|t| t.id >= print_from) {
                    print_toast(toast);
                    next_unprinted = toast.id + 1;
                }
            }
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    eprintln!("tinyoui-watch: failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    notifier.stop();
    println!("{}", "Stopped.".dim());
}

fn print_toast(toast: &Toast) {
    let marker = match toast.kind {
        RecordKind::ChatMessage => "●".green(),
        RecordKind::Mention => "●".yellow(),
    };
    println!("{} {}", marker, toast.title.as_str().bold());
    println!("  {}", toast.body);
    if let Some(action) = &toast.action {
        println!("  {}", format!("[{}] {}", action.label, action.link).dim());
    }
}
