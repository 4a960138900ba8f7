//! WebSocket upgrade handshake (RFC 6455).
//!
//! This module validates an in-flight HTTP upgrade request, derives the public
//! `ws://`/`wss://` URI for the endpoint, and produces the
//! `101 Switching Protocols` response on the live connection.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use http::header::{SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION};
use http::{HeaderMap, Method, Uri};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::message::CloseFrame;
use crate::protocol::Frame;
use crate::transport::Channel;

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wsgate::protocol::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Derive the externally visible WebSocket URI for an upgrade endpoint.
///
/// Resolves `path` against the server's public base address (RFC 3986 merge:
/// an absolute path replaces the base path, a relative path resolves against
/// the base directory) and swaps the scheme `http -> ws`, `https -> wss`.
///
/// # Errors
///
/// Returns [`Error::InvalidUpgradeUri`] if the base address has no authority,
/// carries an unsupported scheme, or the resolved path is not a valid URI.
/// This is a fatal configuration error, surfaced synchronously.
pub fn websocket_uri(public_address: &Uri, path: &str) -> Result<Uri> {
    let scheme = match public_address.scheme_str() {
        Some("http") | Some("ws") => "ws",
        Some("https") | Some("wss") => "wss",
        other => {
            return Err(Error::InvalidUpgradeUri(format!(
                "unsupported scheme in public address: {}",
                other.unwrap_or("(none)")
            )));
        }
    };

    let authority = public_address.authority().cloned().ok_or_else(|| {
        Error::InvalidUpgradeUri("public address has no host/authority".into())
    })?;

    let target = resolve_path(public_address.path(), path);

    Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(target)
        .build()
        .map_err(|e| Error::InvalidUpgradeUri(e.to_string()))
}

/// RFC 3986 Section 5.3 reference merge, restricted to path-and-query.
fn resolve_path(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return if base.is_empty() { "/".into() } else { base.into() };
    }
    if reference.starts_with('/') {
        return reference.to_string();
    }
    // Relative reference: replace everything after the base's last segment.
    let dir = match base.rfind('/') {
        Some(i) => &base[..=i],
        None => "/",
    };
    format!("{dir}{reference}")
}

/// The in-flight HTTP request being upgraded.
///
/// Only the pieces the handshake needs: method, request URI, and headers.
/// The surrounding HTTP framework owns the full request object.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    /// The HTTP method (must be GET for a valid upgrade).
    pub method: Method,
    /// The request URI as received.
    pub uri: Uri,
    /// The request headers.
    pub headers: HeaderMap,
}

impl UpgradeRequest {
    /// Create an upgrade request view from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Synthesize the minimal representation used for handshaking: same method
    /// and URI, carrying only the `Sec-WebSocket-Version` and
    /// `Sec-WebSocket-Key` headers.
    #[must_use]
    pub fn minimal(&self) -> UpgradeRequest {
        let mut headers = HeaderMap::new();
        if let Some(version) = self.headers.get(SEC_WEBSOCKET_VERSION) {
            headers.insert(SEC_WEBSOCKET_VERSION, version.clone());
        }
        if let Some(key) = self.headers.get(SEC_WEBSOCKET_KEY) {
            headers.insert(SEC_WEBSOCKET_KEY, key.clone());
        }
        UpgradeRequest {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers,
        }
    }
}

/// Server-side handshake responder for one upgrade endpoint.
///
/// Configured once per connection with the resolved WebSocket URI, the frame
/// length ceiling advertised to the codec, and the (empty) sub-protocol
/// selection.
#[derive(Debug, Clone)]
pub struct Handshaker {
    uri: Uri,
    max_frame_length: usize,
    allow_extensions: bool,
    subprotocol: Option<String>,
}

impl Handshaker {
    /// Create a handshaker for the given endpoint URI and frame length limit.
    ///
    /// Extensions are allowed by default; no sub-protocol is selected.
    #[must_use]
    pub fn new(uri: Uri, max_frame_length: usize) -> Self {
        Self {
            uri,
            max_frame_length,
            allow_extensions: true,
            subprotocol: None,
        }
    }

    /// Set whether negotiated extensions are allowed.
    #[must_use]
    pub fn with_allow_extensions(mut self, allow: bool) -> Self {
        self.allow_extensions = allow;
        self
    }

    /// Select a sub-protocol to echo in the response.
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }

    /// The resolved `ws://`/`wss://` URI this handshaker serves.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Maximum frame length advertised to the transport codec.
    #[must_use]
    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }

    /// Whether negotiated extensions are allowed on this connection.
    #[must_use]
    pub fn extensions_allowed(&self) -> bool {
        self.allow_extensions
    }

    /// Validate the upgrade request and build the `101` response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The method is not GET.
    /// - `Sec-WebSocket-Version` is missing, unparsable, or not 13.
    /// - `Sec-WebSocket-Key` is missing, not valid Base64, or not 16 bytes
    ///   when decoded.
    pub fn respond(&self, request: &UpgradeRequest) -> Result<HandshakeResponse> {
        if request.method != Method::GET {
            return Err(Error::InvalidHandshake(format!(
                "expected GET method, got {}",
                request.method
            )));
        }

        let version = request
            .headers
            .get(SEC_WEBSOCKET_VERSION)
            .ok_or_else(|| Error::InvalidHandshake("missing Sec-WebSocket-Version header".into()))?
            .to_str()
            .map_err(|_| Error::InvalidHandshake("unreadable Sec-WebSocket-Version".into()))?;
        let version: u8 = version.trim().parse().map_err(|_| {
            Error::InvalidHandshake(format!("invalid Sec-WebSocket-Version: {version}"))
        })?;
        if version != 13 {
            return Err(Error::InvalidHandshake(format!(
                "unsupported WebSocket version: {version} (expected 13)"
            )));
        }

        let key = request
            .headers
            .get(SEC_WEBSOCKET_KEY)
            .ok_or_else(|| Error::InvalidHandshake("missing Sec-WebSocket-Key header".into()))?
            .to_str()
            .map_err(|_| Error::InvalidHandshake("unreadable Sec-WebSocket-Key".into()))?;

        match BASE64.decode(key) {
            Ok(decoded) if decoded.len() == 16 => {}
            Ok(decoded) => {
                return Err(Error::InvalidHandshake(format!(
                    "Sec-WebSocket-Key must be 16 bytes, got {}",
                    decoded.len()
                )));
            }
            Err(_) => {
                return Err(Error::InvalidHandshake(
                    "invalid Sec-WebSocket-Key: not valid Base64".into(),
                ));
            }
        }

        Ok(HandshakeResponse {
            accept: compute_accept_key(key),
            protocol: self.subprotocol.clone(),
        })
    }

    /// Perform the handshake on the live connection.
    ///
    /// Validates the request and writes the `101 Switching Protocols` response
    /// through the channel. Completion is asynchronous: the connection is only
    /// upgraded once this resolves.
    pub async fn handshake<C: Channel>(
        &self,
        channel: &C,
        request: &UpgradeRequest,
    ) -> Result<HandshakeResponse> {
        let response = self.respond(request)?;
        channel.send_upgrade_response(response.clone()).await?;
        Ok(response)
    }

    /// Handshake-level close: write the close frame and tear the transport
    /// down. Resolves once the transport has finished closing.
    pub async fn close<C: Channel>(&self, channel: &C, frame: Option<CloseFrame>) -> Result<()> {
        let _ = channel.write_frame(Frame::Close(frame)).await;
        channel.shutdown().await
    }
}

/// The server's `101 Switching Protocols` handshake response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol (optional).
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    /// Write the HTTP response to a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderValue`] if the protocol contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());

        if let Some(ref proto) = self.protocol {
            validate_header_value("Sec-WebSocket-Protocol", proto)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {proto}\r\n").as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Validate that a header value does not contain CR or LF characters.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header_name.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}
