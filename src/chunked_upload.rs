//! The chunked (S3-style multipart) upload state machine (specification
//! §7, "Chunked upload").
//!
//! `INIT` → `OPEN` (session created) → upload parts one at a time via a
//! [`crate::stream::CutoffStream`] slice of the source → `DONE` (completed)
//! or, on failure, `ABORTING` → `CLEAN`/`DIRTY` depending on whether the
//! backend confirms every part was actually removed within
//! [`crate::settings::Settings::abort_retry_limit`] polls.

use async_trait::async_trait;

use crate::error::{Error, ErrorKind, Result};
use crate::metadata::Metadata;
use crate::settings::Settings;
use crate::stream::{ByteStream, CutoffStream};

/// One completed part of a chunked upload: its 1-indexed part number and
/// the backend-reported identifier (typically an ETag) needed to reference
/// it in the completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-indexed part number, per the S3 multipart convention this state
    /// machine is modeled on.
    pub part_number: u32,
    /// Backend-reported identifier for this part (e.g. an ETag).
    pub identifier: String,
}

/// Backend operations a chunked upload drives. Implemented by backends
/// that support multipart/resumable uploads (the S3-compatible backend is
/// the primary exerciser — see `filegate-sbe-s3`).
#[async_trait]
pub trait ChunkedUploadBackend: Send + Sync {
    /// Opens a new upload session for `path`, returning an opaque session
    /// identifier.
    async fn create_session(&self, path: &str) -> Result<String>;

    /// Uploads one part of the session's content. Parts must be uploaded
    /// in increasing `part_number` order starting at 1 (the S3 multipart
    /// convention); backends that don't require strict ordering may relax
    /// this, but this state machine always calls it in order.
    async fn upload_part(
        &self,
        session: &str,
        part_number: u32,
        content: Box<dyn ByteStream + '_>,
    ) -> Result<CompletedPart>;

    /// Finalizes the session, assembling `parts` into the final object.
    async fn complete(&self, session: &str, parts: &[CompletedPart]) -> Result<Metadata>;

    /// Aborts the session, asking the backend to discard every uploaded
    /// part.
    async fn abort(&self, session: &str) -> Result<()>;

    /// Lists the parts the backend still has recorded for `session`, used
    /// to confirm an abort actually freed everything. An empty list means
    /// the abort is confirmed clean.
    async fn list_parts(&self, session: &str) -> Result<Vec<CompletedPart>>;
}

/// The current state of a chunked upload, mirroring specification §7's
/// state diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// No session opened yet.
    Init,
    /// Session is open; parts may still be uploaded.
    Open,
    /// The upload completed successfully.
    Done,
    /// A failure occurred; the session is being torn down.
    Aborting,
    /// Abort confirmed: the backend reports no parts remain.
    Clean,
    /// Abort retries were exhausted with parts still outstanding.
    Dirty,
}

/// Drives one chunked upload from `INIT` through to `DONE`, `CLEAN`, or
/// `DIRTY`.
pub struct ChunkedUpload<'b> {
    backend: &'b dyn ChunkedUploadBackend,
    session: Option<String>,
    parts: Vec<CompletedPart>,
    state: State,
    chunk_size: u64,
    abort_retry_limit: u32,
    abort_poll_interval: std::time::Duration,
}

impl<'b> ChunkedUpload<'b> {
    /// Builds a new, unopened chunked upload against `backend`.
    pub fn new(backend: &'b dyn ChunkedUploadBackend, settings: &Settings) -> Self {
        ChunkedUpload {
            backend,
            session: None,
            parts: Vec::new(),
            state: State::Init,
            chunk_size: settings.chunk_size,
            abort_retry_limit: settings.abort_retry_limit,
            abort_poll_interval: settings.abort_poll_interval,
        }
    }

    /// The state machine's current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Runs the whole upload to completion: opens a session, slices
    /// `source` into `chunk_size` parts via [`CutoffStream`], uploads each
    /// in order, and completes the session. Checksum verification against
    /// the backend's reported digest is a contiguous-upload concern (see
    /// [`crate::stream::HashStreamWriter`]), not a per-part one — S3-style
    /// backends are free to report whatever part identifier they like, an
    /// opaque ETag rather than a literal MD5. On any part or completion
    /// failure, aborts and returns the original error — the abort outcome
    /// is recorded in [`ChunkedUpload::state`] but does not replace the
    /// triggering error.
    pub async fn run(&mut self, path: &str, source: &mut dyn ByteStream) -> Result<Metadata> {
        if let Err(err) = self.open(path).await {
            return Err(err);
        }

        let mut part_number = 1u32;
        loop {
            let mut cutoff = CutoffStream::new(source, self.chunk_size);
            let first_probe = match cutoff.read(1).await {
                Ok(chunk) if chunk.is_empty() && cutoff.at_eof() => None,
                Ok(chunk) => Some(chunk),
                Err(err) => {
                    self.abort().await;
                    return Err(err);
                }
            };
            let Some(first_chunk) = first_probe else {
                break;
            };

            let part_stream = PrefixedStream::new(first_chunk, cutoff);

            match self.backend.upload_part(self.session_or_panic(), part_number, Box::new(part_stream)).await {
                Ok(part) => self.parts.push(part),
                Err(err) => {
                    self.abort().await;
                    return Err(err);
                }
            }
            part_number += 1;
        }

        match self.backend.complete(self.session_or_panic(), &self.parts).await {
            Ok(metadata) => {
                self.state = State::Done;
                Ok(metadata)
            }
            Err(err) => {
                self.abort().await;
                Err(err)
            }
        }
    }

    async fn open(&mut self, path: &str) -> Result<()> {
        let session = self.backend.create_session(path).await?;
        self.session = Some(session);
        self.state = State::Open;
        Ok(())
    }

    fn session_or_panic(&self) -> &str {
        self.session.as_deref().expect("open() always runs before parts are uploaded")
    }

    /// Transitions to `ABORTING`, asks the backend to discard the session,
    /// then polls [`ChunkedUploadBackend::list_parts`] up to
    /// `abort_retry_limit` times until it reports empty, settling on
    /// `CLEAN` or `DIRTY`.
    async fn abort(&mut self) {
        self.state = State::Aborting;
        let Some(session) = self.session.clone() else {
            self.state = State::Clean;
            return;
        };

        if self.backend.abort(&session).await.is_err() {
            // The abort call itself failing doesn't mean parts survive —
            // fall through to polling list_parts, which is authoritative.
        }

        for _ in 0..self.abort_retry_limit {
            match self.backend.list_parts(&session).await {
                Ok(parts) if parts.is_empty() => {
                    self.state = State::Clean;
                    crate::metrics::record_chunked_upload_abort("clean");
                    return;
                }
                Ok(_) => tokio::time::sleep(self.abort_poll_interval).await,
                Err(_) => tokio::time::sleep(self.abort_poll_interval).await,
            }
        }

        self.state = State::Dirty;
        crate::metrics::record_chunked_upload_abort("dirty");
    }
}

/// Re-attaches a byte already pulled off a stream (during end-of-stream
/// probing) to the front of the stream it came from.
struct PrefixedStream<'a> {
    prefix: Option<bytes::Bytes>,
    rest: CutoffStream<'a>,
}

impl<'a> PrefixedStream<'a> {
    fn new(prefix: bytes::Bytes, rest: CutoffStream<'a>) -> Self {
        PrefixedStream {
            prefix: Some(prefix),
            rest,
        }
    }
}

#[async_trait]
impl ByteStream for PrefixedStream<'_> {
    async fn read(&mut self, n: usize) -> Result<bytes::Bytes> {
        if let Some(prefix) = self.prefix.take() {
            if prefix.len() >= n {
                if prefix.len() > n {
                    self.prefix = Some(prefix.slice(n..));
                    return Ok(prefix.slice(..n));
                }
                return Ok(prefix);
            }
            let mut buf = bytes::BytesMut::from(&prefix[..]);
            let more = self.rest.read(n - prefix.len()).await?;
            buf.extend_from_slice(&more);
            return Ok(buf.freeze());
        }
        self.rest.read(n).await
    }

    fn at_eof(&self) -> bool {
        self.prefix.is_none() && self.rest.at_eof()
    }

    fn size(&self) -> Option<u64> {
        self.rest.size().map(|s| s + self.prefix.as_ref().map(|p| p.len() as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteStreamBuf;
    use md5::{Digest, Md5};
    use std::sync::Mutex;

    struct FlakyBackend {
        fail_part: Option<u32>,
        parts_on_backend: Mutex<Vec<CompletedPart>>,
        abort_called: Mutex<bool>,
    }

    #[async_trait]
    impl ChunkedUploadBackend for FlakyBackend {
        async fn create_session(&self, _path: &str) -> Result<String> {
            Ok("session-1".to_string())
        }

        async fn upload_part(
            &self,
            _session: &str,
            part_number: u32,
            mut content: Box<dyn ByteStream + '_>,
        ) -> Result<CompletedPart> {
            if self.fail_part == Some(part_number) {
                return Err(Error::new(ErrorKind::UnhandledUpload(500), "simulated part failure"));
            }
            let bytes = crate::stream::collect(content.as_mut(), 8192).await?;
            let digest = format!("{:x}", Md5::new_with_prefix(&bytes).finalize());
            let part = CompletedPart {
                part_number,
                identifier: digest,
            };
            self.parts_on_backend.lock().unwrap().push(part.clone());
            Ok(part)
        }

        async fn complete(&self, _session: &str, parts: &[CompletedPart]) -> Result<Metadata> {
            let path = crate::path::Path::split("/uploaded.bin");
            Ok(Metadata::File(crate::metadata::FileMetadata {
                common: crate::metadata::CommonMetadata::new(&path, "test".to_string()),
                size: None,
                extra_hashes: Default::default(),
                modified_utc: None,
                content_type: None,
                revision: Some(format!("{} parts", parts.len())),
            }))
        }

        async fn abort(&self, _session: &str) -> Result<()> {
            *self.abort_called.lock().unwrap() = true;
            self.parts_on_backend.lock().unwrap().clear();
            Ok(())
        }

        async fn list_parts(&self, _session: &str) -> Result<Vec<CompletedPart>> {
            Ok(self.parts_on_backend.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn happy_path_completes_with_one_part_per_chunk() {
        let backend = FlakyBackend {
            fail_part: None,
            parts_on_backend: Mutex::new(Vec::new()),
            abort_called: Mutex::new(false),
        };
        let mut settings = Settings::default();
        settings.chunk_size = 4;
        let mut upload = ChunkedUpload::new(&backend, &settings);
        let mut source = ByteStreamBuf::new(bytes::Bytes::from_static(b"0123456789"));
        let result = upload.run("/uploaded.bin", &mut source).await.unwrap();
        assert!(result.is_file());
        assert_eq!(upload.state(), &State::Done);
        assert_eq!(upload.parts.len(), 3); // 4 + 4 + 2 bytes
    }

    #[tokio::test]
    async fn a_failed_part_triggers_a_clean_abort() {
        let backend = FlakyBackend {
            fail_part: Some(2),
            parts_on_backend: Mutex::new(Vec::new()),
            abort_called: Mutex::new(false),
        };
        let mut settings = Settings::default();
        settings.chunk_size = 4;
        settings.abort_poll_interval = std::time::Duration::from_millis(1);
        let mut upload = ChunkedUpload::new(&backend, &settings);
        let mut source = ByteStreamBuf::new(bytes::Bytes::from_static(b"0123456789"));
        let err = upload.run("/uploaded.bin", &mut source).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnhandledUpload(500));
        assert_eq!(upload.state(), &State::Clean);
        assert!(*backend.abort_called.lock().unwrap());
    }
}
