//! Adapts an inbound request body into a `filegate::stream::ByteStream`, the
//! mirror image of the core crate's `ResponseStreamReader` (which adapts a
//! `reqwest::Response` the same way on the backend side).

use async_trait::async_trait;
use axum::body::{Body, BodyDataStream};
use bytes::{Bytes, BytesMut};
use filegate::error::{Error, ErrorKind, Result};
use filegate::stream::ByteStream;
use futures::StreamExt;

/// Adapts an Axum request body into a [`ByteStream`] so it can be handed
/// straight to [`filegate::Provider::upload`].
pub struct RequestBodyStream {
    inner: BodyDataStream,
    buffer: BytesMut,
    size: Option<u64>,
    eof: bool,
}

impl RequestBodyStream {
    /// Wraps `body`. `content_length` is reported back from
    /// [`ByteStream::size`] when the caller supplied a `Content-Length`
    /// header; backends that need to know the upload size up front (chunked
    /// uploads, single-PUT size limits) rely on it.
    pub fn new(body: Body, content_length: Option<u64>) -> Self {
        RequestBodyStream {
            inner: body.into_data_stream(),
            buffer: BytesMut::new(),
            size: content_length,
            eof: false,
        }
    }
}

#[async_trait]
impl ByteStream for RequestBodyStream {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        while self.buffer.len() < n && !self.eof {
            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    return Err(Error::new(ErrorKind::SessionClosed, "request body stream closed early")
                        .with_source(err))
                }
                None => self.eof = true,
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
