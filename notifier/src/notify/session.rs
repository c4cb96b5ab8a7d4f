// Session and profile loading
// Resolves the authenticated identity the subscriptions are scoped to

use super::config::Config;
use super::gateway::send_request;
use super::protocol::{AuthSession, GatewayRequest, GatewayResponse, Profile};

/// The current authenticated identity.
///
/// Immutable once loaded; a refresh discards the notifier and resolves a
/// fresh identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Unique username, rendered as `@handle` in UI contexts
    pub handle: String,
}

/// Load the current authenticated session, if any.
///
/// Fails silently: gateway errors and unauthenticated states both log to
/// stderr and yield `None`.
pub fn load_session(config: &Config) -> Option<AuthSession> {
    match send_request(config, GatewayRequest::GetSession) {
        Ok(GatewayResponse::Session { session }) => {
            if session.is_none() {
                eprintln!("tinyoui-notify: no session available");
            }
            session
        }
        Ok(GatewayResponse::Error { message, .. }) => {
            eprintln!("tinyoui-notify: session load error: {}", message);
            None
        }
        Ok(other) => {
            eprintln!("tinyoui-notify: unexpected session response: {:?}", other);
            None
        }
        Err(e) => {
            eprintln!("tinyoui-notify: session load error: {}", e);
            None
        }
    }
}

/// Load a profile row by user id; fails silently on lookup error.
pub fn load_profile(config: &Config, user_id: &str) -> Option<Profile> {
    match send_request(
        config,
        GatewayRequest::GetProfile {
            user_id: user_id.to_string(),
        },
    ) {
        Ok(GatewayResponse::Profile { profile }) => profile,
        Ok(GatewayResponse::Error { message, .. }) => {
            eprintln!("tinyoui-notify: profile load error: {}", message);
            None
        }
        Ok(other) => {
            eprintln!("tinyoui-notify: unexpected profile response: {:?}", other);
            None
        }
        Err(e) => {
            eprintln!("tinyoui-notify: profile fetch error: {}", e);
            None
        }
    }
}
