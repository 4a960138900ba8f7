//! Configuration for WebSocket upgrade endpoints.

/// Default maximum frame length advertised to the transport codec: 64 KB.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Configuration for one upgrade endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeConfig {
    /// The endpoint path, resolved against the server's public address to
    /// form the `ws://`/`wss://` URI.
    pub path: String,

    /// Maximum length of a single frame in bytes, enforced by the codec.
    ///
    /// Default: 64 KB.
    pub max_frame_length: usize,

    /// Whether negotiated extensions are allowed on the connection.
    ///
    /// Default: true.
    pub allow_extensions: bool,

    /// Sub-protocol to select in the handshake response.
    ///
    /// Default: none.
    pub subprotocol: Option<String>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            allow_extensions: true,
            subprotocol: None,
        }
    }
}

impl UpgradeConfig {
    /// Create a configuration for the given endpoint path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the maximum frame length.
    #[must_use]
    pub fn with_max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = length;
        self
    }

    /// Set whether negotiated extensions are allowed.
    #[must_use]
    pub fn with_allow_extensions(mut self, allow: bool) -> Self {
        self.allow_extensions = allow;
        self
    }

    /// Select a sub-protocol to echo in the handshake response.
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }
}
