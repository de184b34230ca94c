//! A hand-rolled, streaming ZIP writer.
//!
//! Unlike the sync `zip` crate (which needs a seekable sink to patch sizes
//! back into local headers), this emits the "streaming" ZIP shape: local
//! file headers carry the general-purpose bit 3 ("sizes unknown, see data
//! descriptor"), each entry's CRC-32 and size are computed on the fly as
//! its content streams through, and a trailing data descriptor carries the
//! real values once they're known. The central directory is assembled from
//! the (tiny) per-entry metadata only — member content is never buffered,
//! satisfying the same "never materialize a whole file" constraint as the
//! rest of this pipeline. Every entry uses the "stored" (method 0,
//! uncompressed) compression method; a streaming-deflate encoder is future
//! work, not a correctness requirement.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};

use super::ByteStream;
use crate::error::Result;

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;
const CENTRAL_DIRECTORY_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIG: u32 = 0x0605_4b50;
/// General-purpose flag bit 3: sizes and CRC-32 follow in a data descriptor.
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// One member of a streamed archive: an archive-relative path and the
/// content to stream for it.
pub struct ZipEntry {
    /// Path within the archive, using `/` separators regardless of host OS.
    pub name: String,
    /// The entry's content.
    pub stream: Box<dyn ByteStream>,
}

struct ResolvedEntry {
    name: String,
    offset: u64,
    crc32: u32,
    size: u64,
}

enum Phase {
    Header(usize),
    Content(usize),
    Descriptor(usize),
    CentralDirectory,
    Eof,
}

/// Streams a ZIP archive built from a DFS walk of a folder tree
/// (specification §4.6, "Zip") as a single [`ByteStream`]; the archive's
/// total size is unknown until every entry has been read, so [`ByteStream::size`]
/// always returns `None`.
pub struct ZipStreamReader {
    entries: Vec<ZipEntry>,
    resolved: Vec<ResolvedEntry>,
    phase: Phase,
    running_offset: u64,
    hasher: crc32fast::Hasher,
    current_size: u64,
    pending: BytesMut,
    central_directory_built: bool,
    current_entry_offset: u64,
}

impl ZipStreamReader {
    /// Builds a streaming archive from `entries`, written in the given order.
    pub fn new(entries: Vec<ZipEntry>) -> Self {
        ZipStreamReader {
            entries,
            resolved: Vec::new(),
            phase: Phase::Header(0),
            running_offset: 0,
            hasher: crc32fast::Hasher::new(),
            current_size: 0,
            pending: BytesMut::new(),
            central_directory_built: false,
            current_entry_offset: 0,
        }
    }

    fn local_header(&mut self, index: usize) -> Bytes {
        let name = self.entries[index].name.as_bytes();
        let mut buf = BytesMut::with_capacity(30 + name.len());
        buf.put_u32_le(LOCAL_HEADER_SIG);
        buf.put_u16_le(20); // version needed to extract
        buf.put_u16_le(FLAG_DATA_DESCRIPTOR);
        buf.put_u16_le(0); // compression method: stored
        buf.put_u16_le(0); // mod file time
        buf.put_u16_le(0); // mod file date
        buf.put_u32_le(0); // crc-32 (deferred)
        buf.put_u32_le(0); // compressed size (deferred)
        buf.put_u32_le(0); // uncompressed size (deferred)
        buf.put_u16_le(name.len() as u16);
        buf.put_u16_le(0); // extra field length
        buf.put_slice(name);
        buf.freeze()
    }

    fn data_descriptor(&self, crc32: u32, size: u64) -> Bytes {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_u32_le(DATA_DESCRIPTOR_SIG);
        buf.put_u32_le(crc32);
        buf.put_u32_le(size as u32);
        buf.put_u32_le(size as u32);
        buf.freeze()
    }

    fn central_directory_and_eocd(&self) -> Bytes {
        let mut cd = BytesMut::new();
        for entry in &self.resolved {
            let name = entry.name.as_bytes();
            cd.put_u32_le(CENTRAL_DIRECTORY_SIG);
            cd.put_u16_le(20); // version made by
            cd.put_u16_le(20); // version needed
            cd.put_u16_le(FLAG_DATA_DESCRIPTOR);
            cd.put_u16_le(0); // compression method
            cd.put_u16_le(0); // mod time
            cd.put_u16_le(0); // mod date
            cd.put_u32_le(entry.crc32);
            cd.put_u32_le(entry.size as u32);
            cd.put_u32_le(entry.size as u32);
            cd.put_u16_le(name.len() as u16);
            cd.put_u16_le(0); // extra length
            cd.put_u16_le(0); // comment length
            cd.put_u16_le(0); // disk number start
            cd.put_u16_le(0); // internal attributes
            cd.put_u32_le(0); // external attributes
            cd.put_u32_le(entry.offset as u32);
            cd.put_slice(name);
        }

        let cd_size = cd.len() as u32;
        let cd_offset = self.running_offset as u32;

        cd.put_u32_le(END_OF_CENTRAL_DIRECTORY_SIG);
        cd.put_u16_le(0); // disk number
        cd.put_u16_le(0); // disk with central directory
        cd.put_u16_le(self.resolved.len() as u16);
        cd.put_u16_le(self.resolved.len() as u16);
        cd.put_u32_le(cd_size);
        cd.put_u32_le(cd_offset);
        cd.put_u16_le(0); // comment length

        cd.freeze()
    }
}

#[async_trait]
impl ByteStream for ZipStreamReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        loop {
            if !self.pending.is_empty() {
                let take = n.min(self.pending.len());
                return Ok(self.pending.split_to(take).freeze());
            }

            match self.phase {
                Phase::Header(i) => {
                    if i >= self.entries.len() {
                        self.phase = Phase::CentralDirectory;
                        continue;
                    }
                    self.current_entry_offset = self.running_offset;
                    let header = self.local_header(i);
                    self.running_offset += header.len() as u64;
                    self.pending = BytesMut::from(&header[..]);
                    self.phase = Phase::Content(i);
                }
                Phase::Content(i) => {
                    let chunk = self.entries[i].stream.read(n).await?;
                    if chunk.is_empty() {
                        let crc32 = std::mem::replace(&mut self.hasher, crc32fast::Hasher::new()).finalize();
                        let size = std::mem::take(&mut self.current_size);
                        self.resolved.push(ResolvedEntry {
                            name: self.entries[i].name.clone(),
                            offset: self.current_entry_offset,
                            crc32,
                            size,
                        });
                        self.phase = Phase::Descriptor(i);
                        continue;
                    }
                    self.hasher.update(&chunk);
                    self.current_size += chunk.len() as u64;
                    self.running_offset += chunk.len() as u64;
                    return Ok(chunk);
                }
                Phase::Descriptor(i) => {
                    let resolved = self.resolved.last().expect("content phase always resolves an entry first");
                    let descriptor = self.data_descriptor(resolved.crc32, resolved.size);
                    self.running_offset += descriptor.len() as u64;
                    self.pending = BytesMut::from(&descriptor[..]);
                    self.phase = Phase::Header(i + 1);
                }
                Phase::CentralDirectory => {
                    if !self.central_directory_built {
                        let cd = self.central_directory_and_eocd();
                        self.pending = BytesMut::from(&cd[..]);
                        self.central_directory_built = true;
                    } else {
                        self.phase = Phase::Eof;
                    }
                }
                Phase::Eof => return Ok(Bytes::new()),
            }
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.phase, Phase::Eof)
    }

    fn size(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::string::ByteStreamBuf;
    use super::*;

    #[tokio::test]
    async fn streams_a_well_formed_archive_with_local_and_central_signatures() {
        let entries = vec![
            ZipEntry {
                name: "a.txt".to_string(),
                stream: Box::new(ByteStreamBuf::new(Bytes::from_static(b"hello"))),
            },
            ZipEntry {
                name: "folder/b.txt".to_string(),
                stream: Box::new(ByteStreamBuf::new(Bytes::from_static(b"world!"))),
            },
        ];
        let mut zip = ZipStreamReader::new(entries);
        let bytes = super::super::collect(&mut zip, 64).await.unwrap();

        assert_eq!(&bytes[0..4], &LOCAL_HEADER_SIG.to_le_bytes());
        assert!(bytes.windows(4).any(|w| w == CENTRAL_DIRECTORY_SIG.to_le_bytes()));
        assert!(bytes.windows(4).any(|w| w == END_OF_CENTRAL_DIRECTORY_SIG.to_le_bytes()));
        assert!(bytes.windows(4).any(|w| w == DATA_DESCRIPTOR_SIG.to_le_bytes()));
    }

    #[tokio::test]
    async fn empty_archive_still_has_a_valid_end_of_central_directory_record() {
        let mut zip = ZipStreamReader::new(vec![]);
        let bytes = super::super::collect(&mut zip, 64).await.unwrap();
        assert_eq!(&bytes[0..4], &END_OF_CENTRAL_DIRECTORY_SIG.to_le_bytes());
    }
}
