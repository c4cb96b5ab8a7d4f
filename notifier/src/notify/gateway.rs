// Gateway client for request/response calls
// Handles communication with the TinyIOU gateway over a Unix socket

use super::config::Config;
use super::protocol::{
    deserialize_message, serialize_message, GatewayErrorCode, GatewayEvent, GatewayRequest,
    GatewayResponse, MAX_FRAME_SIZE, PROTOCOL_VERSION,
};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

/// Read timeout for a single request/response exchange
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to the gateway socket.
///
/// The gateway is an external service; if the socket is missing the caller
/// degrades rather than attempting to start anything.
pub fn connect(config: &Config) -> Result<UnixStream> {
    UnixStream::connect(&config.socket_path).with_context(|| {
        format!(
            "Failed to connect to gateway at {}",
            config.socket_path.display()
        )
    })
}

/// Send a request to the gateway and receive a response.
///
/// Opens a fresh connection, performs the protocol handshake, then runs a
/// single request/response exchange. Push frames that arrive before the
/// response are skipped.
pub fn send_request(config: &Config, request: GatewayRequest) -> Result<GatewayResponse> {
    let mut stream = connect(config)?;

    stream
        .set_read_timeout(Some(REQUEST_TIMEOUT))
        .context("Failed to set read timeout")?;

    handshake(&mut stream)?;

    let request_bytes = serialize_message(&request).context("Failed to serialize request")?;
    stream
        .write_all(&request_bytes)
        .context("Failed to send request to gateway")?;
    stream.flush().context("Failed to flush stream")?;

    read_response(&mut stream)
}

/// Perform the protocol handshake on a fresh connection
pub(crate) fn handshake(stream: &mut UnixStream) -> Result<()> {
    let handshake = GatewayRequest::Handshake {
        client_version: PROTOCOL_VERSION,
    };
    let bytes = serialize_message(&handshake).context("Failed to serialize handshake")?;
    stream
        .write_all(&bytes)
        .context("Failed to send handshake")?;
    stream.flush().context("Failed to flush handshake")?;

    match read_response(stream)? {
        GatewayResponse::Handshake { protocol_version: _ } => Ok(()),
        GatewayResponse::Error { code, message } if code == GatewayErrorCode::VersionMismatch => {
            Err(anyhow::anyhow!("Protocol version mismatch: {}", message))
        }
        other => Err(anyhow::anyhow!(
            "Expected handshake response, got: {:?}",
            other
        )),
    }
}

/// Read a response from the gateway, enforcing frame size limits.
///
/// Push events interleaved before the response are skipped; request/response
/// connections have no subscription, so nothing is lost by ignoring them.
pub(crate) fn read_response(stream: &mut UnixStream) -> Result<GatewayResponse> {
    let mut reader = BufReader::new(stream);
    read_response_from(&mut reader)
}

/// Read a response through a caller-owned reader.
///
/// Subscription setup keeps its reader alive across this call so push
/// frames buffered behind the response are not discarded with a temporary.
pub(crate) fn read_response_from<R: BufRead>(reader: &mut R) -> Result<GatewayResponse> {
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                return Err(anyhow::anyhow!("Gateway closed connection unexpectedly"));
            }
            Ok(_) => {
                if line.len() > MAX_FRAME_SIZE {
                    return Err(anyhow::anyhow!(
                        "Response frame too large: {} bytes (max {})",
                        line.len(),
                        MAX_FRAME_SIZE
                    ));
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                return Err(anyhow::anyhow!("Gateway read timeout"));
            }
            Err(e) => return Err(e.into()),
        }

        if deserialize_message::<GatewayEvent>(line.as_bytes()).is_ok() {
            continue;
        }

        match deserialize_message::<GatewayResponse>(line.as_bytes()) {
            Ok(response) => return Ok(response),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to parse gateway response: {} (line: {})",
                    e,
                    line.trim()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_ping() {
        // This test requires a running gateway
        // Skip if the socket is not present
        let config = Config::from_env();
        if !config.socket_exists() {
            eprintln!("Skipping test: gateway not running");
            return;
        }

        let response = send_request(&config, GatewayRequest::Ping);
        match response {
            Ok(GatewayResponse::Pong) => {}
            Ok(other) => panic!("Expected Pong, got {:?}", other),
            Err(e) => panic!("Failed to ping gateway: {}", e),
        }
    }

    #[test]
    fn test_connect_fails_without_socket() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = Config::with_gateway_dir(temp_dir.path());
        assert!(connect(&config).is_err());
    }
}
