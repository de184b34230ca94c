//! Caps an inner [`ByteStream`] at a byte limit without consuming what's
//! left behind it — used to slice a large upload into fixed-size parts for
//! the chunked-upload state machine (specification §7).

use async_trait::async_trait;
use bytes::Bytes;

use super::ByteStream;
use crate::error::Result;

/// Wraps an inner stream, yielding at most `limit` bytes from it before
/// reporting EOF, even if the inner stream has more to give.
///
/// The inner stream is borrowed, not owned, so the caller can build a new
/// `CutoffStream` over the same inner stream for the next part once this
/// one reports `at_eof`.
pub struct CutoffStream<'a> {
    inner: &'a mut dyn ByteStream,
    limit: u64,
    read_so_far: u64,
}

impl<'a> CutoffStream<'a> {
    /// Wraps `inner`, capping reads at `limit` bytes total.
    pub fn new(inner: &'a mut dyn ByteStream, limit: u64) -> Self {
        CutoffStream {
            inner,
            limit,
            read_so_far: 0,
        }
    }

    /// How many bytes this cutoff has yielded so far.
    pub fn read_so_far(&self) -> u64 {
        self.read_so_far
    }
}

#[async_trait]
impl ByteStream for CutoffStream<'_> {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let remaining = self.limit - self.read_so_far;
        if remaining == 0 {
            return Ok(Bytes::new());
        }
        let want = (n as u64).min(remaining) as usize;
        let chunk = self.inner.read(want).await?;
        self.read_so_far += chunk.len() as u64;
        Ok(chunk)
    }

    fn at_eof(&self) -> bool {
        self.read_so_far >= self.limit || self.inner.at_eof()
    }

    fn size(&self) -> Option<u64> {
        Some(self.limit.min(self.inner.size().unwrap_or(self.limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::string::ByteStreamBuf;
    use super::*;

    #[tokio::test]
    async fn cutoff_stops_at_the_limit_even_if_inner_has_more() {
        let mut inner = ByteStreamBuf::new(Bytes::from_static(b"0123456789"));
        let mut cutoff = CutoffStream::new(&mut inner, 4);
        let chunk = cutoff.read(100).await.unwrap();
        assert_eq!(&chunk[..], b"0123");
        assert!(cutoff.at_eof());
        assert_eq!(cutoff.read(100).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn a_second_cutoff_continues_where_the_first_left_off() {
        let mut inner = ByteStreamBuf::new(Bytes::from_static(b"0123456789"));
        {
            let mut first = CutoffStream::new(&mut inner, 4);
            first.read(100).await.unwrap();
        }
        let mut second = CutoffStream::new(&mut inner, 4);
        let chunk = second.read(100).await.unwrap();
        assert_eq!(&chunk[..], b"4567");
    }
}
