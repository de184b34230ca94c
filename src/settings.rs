//! Read-only, per-provider configuration (specification §6, "Environment /
//! configuration"). Loading this from environment variables, files or a
//! secret store is the embedding application's job; this crate only defines
//! the shape it expects to receive.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration handed to a provider at construction time.
///
/// Deserializable with `serde` so an embedding application can load it from
/// whatever configuration format it already uses, the same way the teacher
/// crate's consumers configure `Server` at construction rather than the
/// library owning a config file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the backend's API, when applicable (object stores,
    /// id-based backends). Local backends ignore this.
    pub base_url: Option<String>,

    /// Byte size of each part in a chunked upload.
    pub chunk_size: u64,

    /// Threshold above which an upload switches from a single contiguous
    /// request to the chunked-upload state machine.
    pub contiguous_upload_size_limit: u64,

    /// Number of keys above which a folder delete switches from individual
    /// deletes to a backend-native batch delete call, where supported.
    pub batch_delete_threshold: usize,

    /// Maximum concurrent backend requests allowed within `throttle_interval`.
    pub throttle_concurrency: u32,

    /// The sliding window, in seconds, the throttle gate enforces
    /// `throttle_concurrency` over.
    pub throttle_interval: Duration,

    /// Secret used to HMAC-sign callback payloads (§6, "Callback channel").
    pub callback_hmac_secret: Option<String>,

    /// Which HMAC algorithm signs callback payloads.
    pub callback_hmac_algorithm: crate::callback::HmacAlgorithm,

    /// Whether server-side encryption should be requested on chunked
    /// uploads. When enabled, checksum verification by ETag comparison is
    /// skipped (ETag is not an MD5 of the plaintext under SSE).
    pub server_side_encryption: bool,

    /// How many folders/files may be processed concurrently within one
    /// depth of a recursive copy/move (open question (c), §9).
    pub folder_copy_concurrency: usize,

    /// Maximum number of abort-retries for a failed chunked upload (open
    /// question (b), §9).
    pub abort_retry_limit: u32,

    /// Delay between list-parts polls while aborting a chunked upload (open
    /// question (b), §9).
    pub abort_poll_interval: Duration,

    /// Default per-request timeout applied to every backend call.
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: None,
            chunk_size: 32 * 1024 * 1024,
            contiguous_upload_size_limit: 4 * 1024 * 1024,
            batch_delete_threshold: 1000,
            throttle_concurrency: 10,
            throttle_interval: Duration::from_secs(1),
            callback_hmac_secret: None,
            callback_hmac_algorithm: crate::callback::HmacAlgorithm::default(),
            server_side_encryption: false,
            folder_copy_concurrency: 5,
            abort_retry_limit: 5,
            abort_poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}
