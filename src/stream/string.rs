//! The simplest concrete [`ByteStream`]: a fixed, already-resident buffer.
//! Grounds every other stream's base case (the leaf of a wrapper chain is
//! almost always one of these or a [`super::file::FileStreamReader`]).

use async_trait::async_trait;
use bytes::Bytes;

use super::ByteStream;
use crate::error::Result;

/// A [`ByteStream`] over an in-memory byte buffer.
///
/// Use only for content small enough to hold in memory already — a
/// generated JSON body, a string constant — never as a stand-in for file
/// content.
pub struct ByteStreamBuf {
    data: Bytes,
    position: usize,
}

impl ByteStreamBuf {
    /// Wraps an owned buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        ByteStreamBuf {
            data: data.into(),
            position: 0,
        }
    }
}

#[async_trait]
impl ByteStream for ByteStreamBuf {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let remaining = self.data.len() - self.position;
        let take = n.min(remaining);
        let chunk = self.data.slice(self.position..self.position + take);
        self.position += take;
        Ok(chunk)
    }

    fn at_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// A [`ByteStream`] over a `String`, encoded as UTF-8 on construction.
pub struct StringStream {
    inner: ByteStreamBuf,
}

impl StringStream {
    /// Wraps an owned string.
    pub fn new(data: impl Into<String>) -> Self {
        StringStream {
            inner: ByteStreamBuf::new(Bytes::from(data.into().into_bytes())),
        }
    }
}

#[async_trait]
impl ByteStream for StringStream {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        self.inner.read(n).await
    }

    fn at_eof(&self) -> bool {
        self.inner.at_eof()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn byte_stream_buf_reads_exactly_what_was_written() {
        let mut stream = ByteStreamBuf::new(Bytes::from_static(b"hello world"));
        let first = stream.read(5).await.unwrap();
        assert_eq!(&first[..], b"hello");
        assert!(!stream.at_eof());
        let rest = stream.read(100).await.unwrap();
        assert_eq!(&rest[..], b" world");
        assert!(stream.at_eof());
    }

    #[tokio::test]
    async fn string_stream_reports_its_utf8_byte_length_as_size() {
        let stream = StringStream::new("héllo");
        assert_eq!(stream.size(), Some("héllo".len() as u64));
    }
}
