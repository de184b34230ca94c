//! Streaming readers backed by a local file handle, grounded on
//! `unftp-sbe-fs`'s use of `tokio::fs` for sandboxed, async file access.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use super::ByteStream;
use crate::error::Result;

/// A [`ByteStream`] over an entire local file, from offset zero to EOF.
pub struct FileStreamReader {
    file: File,
    size: Option<u64>,
    eof: bool,
}

impl FileStreamReader {
    /// Wraps an already-open file. `size`, if known (e.g. from a prior
    /// `metadata()` call), is reported via [`ByteStream::size`] without an
    /// extra syscall.
    pub fn new(file: File, size: Option<u64>) -> Self {
        FileStreamReader {
            file,
            size,
            eof: false,
        }
    }
}

#[async_trait]
impl ByteStream for FileStreamReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        let mut total = 0;
        while total < n {
            let read = self.file.read(&mut buf[total..]).await?;
            if read == 0 {
                self.eof = true;
                break;
            }
            total += read;
        }
        buf.truncate(total);
        Ok(buf.freeze())
    }

    fn at_eof(&self) -> bool {
        self.eof
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// A [`ByteStream`] over an inclusive byte range `[lo, hi]` of a local file
/// and its total size, used to serve partial/resumable downloads
/// (specification §6, `Range` request handling; §8: `size = hi − lo + 1`,
/// `partial = true`, `content_range = "bytes lo-hi/total"`).
pub struct PartialFileStreamReader {
    file: File,
    lo: u64,
    hi: u64,
    total: u64,
    remaining: u64,
    started: bool,
}

impl PartialFileStreamReader {
    /// Wraps an already-open file, seeking lazily to `lo` on first read.
    /// `total` is the file's full size, needed to render `content_range`.
    pub fn new(file: File, lo: u64, hi: u64, total: u64) -> Self {
        PartialFileStreamReader {
            file,
            lo,
            hi,
            total,
            remaining: hi - lo + 1,
            started: false,
        }
    }

    /// Always `true`: a [`PartialFileStreamReader`] only ever exists to
    /// serve a range request.
    pub fn partial(&self) -> bool {
        true
    }

    /// The outbound `Content-Range` header value for this range.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.lo, self.hi, self.total)
    }
}

#[async_trait]
impl ByteStream for PartialFileStreamReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        if !self.started {
            self.file.seek(SeekFrom::Start(self.lo)).await?;
            self.started = true;
        }
        if self.remaining == 0 {
            return Ok(Bytes::new());
        }
        let want = (n as u64).min(self.remaining) as usize;
        let mut buf = BytesMut::zeroed(want);
        let mut total = 0;
        while total < want {
            let read = self.file.read(&mut buf[total..]).await?;
            if read == 0 {
                break;
            }
            total += read;
        }
        buf.truncate(total);
        self.remaining -= total as u64;
        Ok(buf.freeze())
    }

    fn at_eof(&self) -> bool {
        self.remaining == 0 && self.started
    }

    fn size(&self) -> Option<u64> {
        Some(self.hi - self.lo + 1)
    }
}
