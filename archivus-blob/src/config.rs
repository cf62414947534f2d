/// Configuration for blob operations
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Absolute max size allowed for a single blob (safety guard)
    pub max_blob_bytes: u64,

    /// When a range is requested but store can't do range:
    /// - if false: fall back to full content (HTTP 200 equivalent)
    /// - if true: return Unsupported
    pub require_range_support: bool,

    /// Optional: compute checksums during upload (streaming)
    pub checksum_alg: Option<String>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            max_blob_bytes: 5 * 1024 * 1024 * 1024, // 5GB
            require_range_support: false,
            checksum_alg: None,
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max blob size
    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    /// Require range support (no fallback to full content)
    pub fn require_range_support(mut self) -> Self {
        self.require_range_support = true;
        self
    }

    /// Enable checksum with algorithm
    pub fn with_checksum<S: Into<String>>(mut self, algorithm: S) -> Self {
        self.checksum_alg = Some(algorithm.into());
        self
    }
}
