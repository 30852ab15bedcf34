//! HTTP upgrade handshake (RFC 6455 section 4.2).
//!
//! The acceptor calls [`prepare_upgrade`] on every inbound HTTP request.
//! Requests that are not WebSocket upgrades are answered with
//! `400 Bad Request`; valid ones get a `101 Switching Protocols` response
//! and the raw stream is then handed to
//! [`Connection::from_raw_socket`](crate::Connection::from_raw_socket).

use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use crate::error::{WsError, WsResult};

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
const SEC_WEBSOCKET_VERSION: &str = "sec-websocket-version";
const SEC_WEBSOCKET_ACCEPT: &str = "sec-websocket-accept";

/// Check if a request is a WebSocket upgrade request.
pub fn is_websocket_request<B>(request: &Request<B>) -> bool {
    validate_upgrade_request(request).is_ok()
}

fn header_str<'a, B>(request: &'a Request<B>, name: impl header::AsHeaderName) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Validate a WebSocket upgrade request.
///
/// Returns the `Sec-WebSocket-Accept` value on success.
#[instrument(level = "trace", skip(request))]
pub fn validate_upgrade_request<B>(request: &Request<B>) -> WsResult<String> {
    if request.method() != http::Method::GET {
        return Err(WsError::not_websocket("upgrade requires GET"));
    }

    let connection_upgrade = header_str(request, header::CONNECTION)
        .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("upgrade")));
    if !connection_upgrade {
        return Err(WsError::not_websocket("missing Connection: Upgrade header"));
    }

    let upgrade_websocket = header_str(request, header::UPGRADE)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
    if !upgrade_websocket {
        return Err(WsError::not_websocket("missing Upgrade: websocket header"));
    }

    let key = header_str(request, SEC_WEBSOCKET_KEY)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| WsError::not_websocket("missing Sec-WebSocket-Key header"))?;

    if header_str(request, SEC_WEBSOCKET_VERSION).map(str::trim) != Some("13") {
        return Err(WsError::not_websocket(
            "missing or invalid Sec-WebSocket-Version header (must be 13)",
        ));
    }

    Ok(compute_accept_key(key))
}

/// Compute the `Sec-WebSocket-Accept` value from a client key.
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Build the `101 Switching Protocols` response for an accepted upgrade.
pub fn switching_protocols(accept_key: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;

    let headers = response.headers_mut();
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    // Base64 output is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(accept_key) {
        headers.insert(SEC_WEBSOCKET_ACCEPT, value);
    }
    response
}

/// Build a plain-text rejection response.
pub fn reject(status: StatusCode, reason: impl Into<String>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(reason.into())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Outcome of inspecting an upgrade request.
#[derive(Debug)]
pub struct WebSocketUpgrade {
    /// The response to send to the client.
    pub response: Response<Full<Bytes>>,
    /// Whether the upgrade was accepted.
    pub success: bool,
}

/// Validate a request and build the response to send back.
///
/// When `success` is set the caller must complete the upgrade on the
/// underlying stream after the response has been written.
pub fn prepare_upgrade<B>(request: &Request<B>) -> WebSocketUpgrade {
    match validate_upgrade_request(request) {
        Ok(accept_key) => WebSocketUpgrade {
            response: switching_protocols(&accept_key),
            success: true,
        },
        Err(e) => {
            debug!(error = %e, "WebSocket upgrade rejected");
            WebSocketUpgrade {
                response: reject(StatusCode::BAD_REQUEST, e.to_string()),
                success: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ws_request() -> Request<()> {
        Request::builder()
            .header(header::CONNECTION, "keep-alive, Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_is_websocket_request_valid() {
        assert!(is_websocket_request(&make_ws_request()));
    }

    #[test]
    fn test_plain_http_request_is_not_websocket() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let err = validate_upgrade_request(&request).unwrap_err();
        assert!(err.to_string().contains("Connection"));
    }

    #[test]
    fn test_missing_key() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();
        assert!(!is_websocket_request(&request));
    }

    #[test]
    fn test_wrong_version() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "key")
            .header("Sec-WebSocket-Version", "8")
            .body(())
            .unwrap();
        let err = validate_upgrade_request(&request).unwrap_err();
        assert!(err.to_string().contains("Version"));
    }

    #[test]
    fn test_post_is_rejected() {
        let request = Request::builder()
            .method(http::Method::POST)
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();
        assert!(!is_websocket_request(&request));
    }

    #[test]
    fn test_compute_accept_key() {
        // RFC 6455 example
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_prepare_upgrade_success() {
        let upgrade = prepare_upgrade(&make_ws_request());
        assert!(upgrade.success);
        assert_eq!(upgrade.response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            upgrade.response.headers().get(SEC_WEBSOCKET_ACCEPT).unwrap(),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_prepare_upgrade_invalid_request() {
        let request = Request::builder().body(()).unwrap();
        let upgrade = prepare_upgrade(&request);
        assert!(!upgrade.success);
        assert_eq!(upgrade.response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_reject_status() {
        let response = reject(StatusCode::SERVICE_UNAVAILABLE, "too many connections");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
