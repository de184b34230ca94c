//! Adapts a `reqwest::Response` body into a [`ByteStream`], the read side
//! of the request envelope's HTTP plumbing (specification §6, "Request
//! envelope").

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use super::ByteStream;
use crate::error::{Error, ErrorKind, Result};

/// A [`ByteStream`] pulling from a live `reqwest::Response` body.
pub struct ResponseStreamReader {
    response: Option<reqwest::Response>,
    buffer: BytesMut,
    size: Option<u64>,
    content_type: Option<String>,
    partial: bool,
    eof: bool,
}

impl ResponseStreamReader {
    /// Wraps `response`, reporting `Content-Length` (if present) as `size`,
    /// `Content-Type` (if present), and marking `partial` when the upstream
    /// status is 206 (specification §4.1, `ResponseStreamReader`).
    pub fn new(response: reqwest::Response) -> Self {
        let size = response.content_length();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let partial = response.status() == reqwest::StatusCode::PARTIAL_CONTENT;
        ResponseStreamReader {
            response: Some(response),
            buffer: BytesMut::new(),
            size,
            content_type,
            partial,
            eof: false,
        }
    }

    /// Overrides the reported `size`, for upstreams that report content
    /// length via a vendor header (e.g. `X-...-Size`) instead of the
    /// standard `Content-Length`.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// The upstream's `Content-Type`, if reported.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the upstream responded with HTTP 206 Partial Content.
    pub fn partial(&self) -> bool {
        self.partial
    }
}

#[async_trait]
impl ByteStream for ResponseStreamReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        while self.buffer.len() < n && !self.eof {
            let Some(response) = self.response.as_mut() else {
                self.eof = true;
                break;
            };
            match response.chunk().await {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                Ok(None) => {
                    self.eof = true;
                    self.response = None;
                }
                Err(err) => {
                    return Err(Error::new(ErrorKind::SessionClosed, "response stream closed early")
                        .with_source(err))
                }
            }
        }
        let take = n.min(self.buffer.len());
        Ok(self.buffer.split_to(take).freeze())
    }

    fn at_eof(&self) -> bool {
        self.eof && self.buffer.is_empty()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}
