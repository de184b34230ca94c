//! Streaming base64 encoding, grounded on `waterbutler.core.streams.Base64EncodeStream`:
//! the input is consumed in multiples of 3 bytes so each `read` produces a
//! clean, un-padded base64 chunk, with padding applied only on the final
//! read.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use super::ByteStream;
use crate::error::Result;

/// Wraps an inner [`ByteStream`], yielding its content base64-encoded.
pub struct Base64EncodeStream {
    inner: Box<dyn ByteStream>,
    leftover: Vec<u8>,
}

impl Base64EncodeStream {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn ByteStream>) -> Self {
        Base64EncodeStream {
            inner,
            leftover: Vec::new(),
        }
    }
}

#[async_trait]
impl ByteStream for Base64EncodeStream {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        // Encoding grows input by 4/3; pull roughly `n * 3 / 4` raw bytes
        // rounded down to a multiple of 3, plus whatever carried over.
        let want_raw = ((n * 3) / 4).max(3) / 3 * 3;
        let mut raw = std::mem::take(&mut self.leftover);
        while raw.len() < want_raw && !self.inner.at_eof() {
            let chunk = self.inner.read(want_raw - raw.len()).await?;
            if chunk.is_empty() {
                break;
            }
            raw.extend_from_slice(&chunk);
        }

        if raw.is_empty() {
            return Ok(Bytes::new());
        }

        let at_source_eof = self.inner.at_eof();
        let encodable_len = if at_source_eof {
            raw.len()
        } else {
            raw.len() - (raw.len() % 3)
        };

        self.leftover = raw[encodable_len..].to_vec();
        let encoded = STANDARD.encode(&raw[..encodable_len]);
        Ok(Bytes::from(encoded.into_bytes()))
    }

    fn at_eof(&self) -> bool {
        self.inner.at_eof() && self.leftover.is_empty()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size().map(|n| n.div_ceil(3) * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::super::string::ByteStreamBuf;
    use super::*;

    #[tokio::test]
    async fn encodes_the_full_content_across_multiple_reads() {
        let inner = Box::new(ByteStreamBuf::new(Bytes::from_static(b"hello world")));
        let mut stream = Base64EncodeStream::new(inner);
        let mut out = Vec::new();
        loop {
            let chunk = stream.read(4).await.unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
            if stream.at_eof() {
                break;
            }
        }
        assert_eq!(out, STANDARD.encode("hello world").into_bytes());
    }
}
