//! Adapts a [`ByteStream`] into the `futures::Stream` shape `reqwest`
//! expects for a streamed request body — the write side of the request
//! envelope's HTTP plumbing, the mirror image of [`super::response::ResponseStreamReader`].

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use super::ByteStream;

/// Wraps a [`ByteStream`] as a `futures::Stream<Item = std::io::Result<Bytes>>`,
/// suitable for `reqwest::Body::wrap_stream`.
///
/// `poll_next` can't drive the inner stream's `async fn read` directly
/// without an executor, so this holds an in-flight read as a boxed future
/// and polls that instead — the same shape `tokio_util::io::ReaderStream`
/// uses internally.
pub struct RequestStreamReader {
    inner: Option<Box<dyn ByteStream>>,
    read_size: usize,
    pending: Option<Pin<Box<dyn std::future::Future<Output = (Box<dyn ByteStream>, std::io::Result<Bytes>)> + Send>>>,
}

impl RequestStreamReader {
    /// Wraps `inner`, pulling `read_size`-byte chunks from it on each poll.
    pub fn new(inner: Box<dyn ByteStream>, read_size: usize) -> Self {
        RequestStreamReader {
            inner: Some(inner),
            read_size,
            pending: None,
        }
    }
}

impl Stream for RequestStreamReader {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.pending.is_none() {
            let Some(mut stream) = this.inner.take() else {
                return Poll::Ready(None);
            };
            let read_size = this.read_size;
            this.pending = Some(Box::pin(async move {
                let result = stream
                    .read(read_size)
                    .await
                    .map_err(|e| std::io::Error::other(e.to_string()));
                (stream, result)
            }));
        }

        let fut = this.pending.as_mut().unwrap();
        match fut.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready((stream, result)) => {
                this.pending = None;
                match result {
                    Ok(bytes) if bytes.is_empty() => Poll::Ready(None),
                    Ok(bytes) => {
                        this.inner = Some(stream);
                        Poll::Ready(Some(Ok(bytes)))
                    }
                    Err(err) => Poll::Ready(Some(Err(err))),
                }
            }
        }
    }
}
