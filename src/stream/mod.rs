//! The lazy, pull-based byte-stream pipeline (specification §5).
//!
//! Every stream in this module implements [`ByteStream`]: a `read(n)` that
//! pulls up to `n` bytes, an `at_eof()` check, and a nullable `size()` hint.
//! Wrapper streams compose by holding a `Box<dyn ByteStream>` inner stream
//! and transforming what `read` returns, the way `tokio_util::io::StreamReader`
//! wraps a `Stream<Item = io::Result<Bytes>>` without buffering the whole
//! body.

mod base64;
mod cutoff;
mod file;
mod hash_writer;
mod json;
mod multi;
mod request;
mod response;
mod string;
mod zip;

pub use self::base64::Base64EncodeStream;
pub use self::cutoff::CutoffStream;
pub use self::file::{FileStreamReader, PartialFileStreamReader};
pub use self::hash_writer::HashStreamWriter;
pub use self::json::{JsonField, JsonStream};
pub use self::multi::MultiStream;
pub use self::request::RequestStreamReader;
pub use self::response::ResponseStreamReader;
pub use self::string::{ByteStreamBuf, StringStream};
pub use self::zip::{ZipEntry, ZipStreamReader};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A lazily-pulled, possibly-unbounded stream of bytes.
///
/// Implementors must never read or buffer more than `read`'s caller asked
/// for — the whole point of this interface (specification §5, "never
/// materialize a whole file in memory") is that a multi-gigabyte object can
/// flow through a chain of these without ever existing in full in process
/// memory.
#[async_trait]
pub trait ByteStream: Send + Sync {
    /// Pulls up to `n` bytes. Returns an empty `Bytes` only at end-of-stream;
    /// otherwise returns at least one byte (this stream never "busy-polls"
    /// a zero-length read to signal more-data-later — a pending source
    /// backs off itself).
    async fn read(&mut self, n: usize) -> Result<Bytes>;

    /// Whether the stream is exhausted. Implementations that don't know in
    /// advance (e.g. a network response) may report `false` until a `read`
    /// call actually returns empty.
    fn at_eof(&self) -> bool;

    /// The total size in bytes, if known up front. `None` for streams whose
    /// length can only be discovered by exhausting them (for example a
    /// streaming zip archive).
    fn size(&self) -> Option<u64>;
}

#[async_trait]
impl ByteStream for Box<dyn ByteStream> {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        (**self).read(n).await
    }

    fn at_eof(&self) -> bool {
        (**self).at_eof()
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

/// Drains a [`ByteStream`] into a single in-memory buffer.
///
/// Intended for small, bounded payloads (config blobs, JSON request
/// bodies) — never for file content, which should be piped through the
/// stream chain instead of collected.
pub async fn collect(stream: &mut dyn ByteStream, read_chunk: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let chunk = stream.read(read_chunk).await?;
        if chunk.is_empty() {
            break;
        }
        out.extend_from_slice(&chunk);
        if stream.at_eof() {
            break;
        }
    }
    Ok(out)
}
