//! Concatenates several [`ByteStream`]s end-to-end into one, advancing to
//! the next only once the current one reports EOF. Grounds
//! [`super::zip::ZipStreamReader`], which is itself built from one
//! `MultiStream` per archive.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;

use super::ByteStream;
use crate::error::Result;

/// A [`ByteStream`] that reads each of its member streams to completion, in
/// order, before moving to the next.
pub struct MultiStream {
    streams: VecDeque<Box<dyn ByteStream>>,
}

impl MultiStream {
    /// Builds a multi-stream over `streams`, read in the given order.
    pub fn new(streams: Vec<Box<dyn ByteStream>>) -> Self {
        MultiStream {
            streams: streams.into(),
        }
    }
}

#[async_trait]
impl ByteStream for MultiStream {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        loop {
            let Some(front) = self.streams.front_mut() else {
                return Ok(Bytes::new());
            };
            let chunk = front.read(n).await?;
            if !chunk.is_empty() {
                return Ok(chunk);
            }
            if front.at_eof() {
                self.streams.pop_front();
                continue;
            }
            return Ok(chunk);
        }
    }

    fn at_eof(&self) -> bool {
        self.streams.is_empty()
    }

    fn size(&self) -> Option<u64> {
        self.streams
            .iter()
            .map(|s| s.size())
            .try_fold(0u64, |acc, s| s.map(|s| acc + s))
    }
}

#[cfg(test)]
mod tests {
    use super::super::string::ByteStreamBuf;
    use super::*;

    #[tokio::test]
    async fn concatenates_member_streams_in_order() {
        let a: Box<dyn ByteStream> = Box::new(ByteStreamBuf::new(Bytes::from_static(b"abc")));
        let b: Box<dyn ByteStream> = Box::new(ByteStreamBuf::new(Bytes::from_static(b"def")));
        let mut multi = MultiStream::new(vec![a, b]);
        let out = super::super::collect(&mut multi, 1024).await.unwrap();
        assert_eq!(&out[..], b"abcdef");
    }

    #[tokio::test]
    async fn total_size_is_the_sum_of_member_sizes() {
        let a: Box<dyn ByteStream> = Box::new(ByteStreamBuf::new(Bytes::from_static(b"abc")));
        let b: Box<dyn ByteStream> = Box::new(ByteStreamBuf::new(Bytes::from_static(b"de")));
        let multi = MultiStream::new(vec![a, b]);
        assert_eq!(multi.size(), Some(5));
    }
}
