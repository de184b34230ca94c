//! Local-filesystem storage back-end for `filegate` (specification §4.8,
//! "Concrete backends").
//!
//! Grounded on `unftp-sbe-fs`'s `Filesystem`: every path is resolved
//! through a `cap_std::fs::Dir` handle opened once at construction, so a
//! caller can never escape the configured root via `..` segments or
//! symlinks — the same sandboxing guarantee libunftp's filesystem back-end
//! relies on, generalized here from an FTP session's `cwd` to a stateless,
//! per-request [`Path`]. Blocking `cap_std` calls are dispatched through
//! `spawn_blocking` the way `unftp-sbe-fs`'s `cap_fs` module does; once a
//! file handle is open, content is streamed through it via the existing
//! `FileStreamReader`/`PartialFileStreamReader` the same way any other
//! local-file-backed stream in this crate is.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::fs::Dir;
use filegate::error::{Error, ErrorKind, Result};
use filegate::metadata::{CommonMetadata, FileMetadata, FolderMetadata, Metadata, RevisionMetadata};
use filegate::path::Path;
use filegate::provider::{ConflictResolution, Provider};
use filegate::stream::{ByteStream, FileStreamReader, PartialFileStreamReader};
use tokio::task::spawn_blocking;

/// A [`Provider`] backed by a sandboxed directory on local disk.
#[derive(Clone)]
pub struct Filesystem {
    root: Arc<Dir>,
}

impl Filesystem {
    /// Opens `root` as the storage root. Every [`Path`] this provider
    /// resolves is relative to it.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let authority = cap_std::ambient_authority();
        let dir = Dir::open_ambient_dir(root.into(), authority)?;
        Ok(Filesystem { root: Arc::new(dir) })
    }
}

/// Strips the leading `/` from a materialized path and maps the root
/// itself to `.`, the relative path `cap_std::fs::Dir` expects.
fn relative(path: &Path) -> PathBuf {
    let materialized = path.materialized_path();
    let trimmed = materialized.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(trimmed)
    }
}

async fn asyncify<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Error::from(err)),
        Err(_) => Err(Error::new(ErrorKind::UnhandledMetadata(500), "background filesystem task panicked")),
    }
}

/// Derives a stable etag from a file's size and modification time, since
/// local files carry no native etag. Changed content almost always changes
/// at least one of the two.
fn synthetic_etag(len: u64, modified: Option<std::time::SystemTime>) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(len.to_le_bytes());
    if let Some(modified) = modified {
        if let Ok(since_epoch) = modified.duration_since(std::time::UNIX_EPOCH) {
            hasher.update(since_epoch.as_nanos().to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

fn content_type_for(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|m| m.essence_str().to_string())
}

fn meta_from_fs(path: &Path, provider: &str, fs_meta: &cap_std::fs::Metadata) -> Metadata {
    let modified = fs_meta.modified().ok().map(cap_std::time::SystemTime::into_std);
    if fs_meta.is_dir() {
        let common = CommonMetadata::new(path, provider).with_etag(synthetic_etag(0, modified));
        Metadata::Folder(FolderMetadata { common })
    } else {
        let len = fs_meta.len();
        let common = CommonMetadata::new(path, provider).with_etag(synthetic_etag(len, modified));
        Metadata::File(FileMetadata {
            common,
            size: Some(len),
            extra_hashes: Default::default(),
            modified_utc: modified.map(|m| chrono::DateTime::<chrono::Utc>::from(m).to_rfc3339()),
            content_type: content_type_for(path.name()),
            revision: None,
        })
    }
}

/// Creates every missing ancestor directory of `rel` (but not `rel`
/// itself), tolerating ones that already exist.
async fn ensure_parent_dirs(root: Arc<Dir>, rel: &std::path::Path) -> Result<()> {
    let Some(parent) = rel.parent() else { return Ok(()) };
    if parent.as_os_str().is_empty() || parent == std::path::Path::new(".") {
        return Ok(());
    }
    let mut built = PathBuf::new();
    for component in parent.components() {
        built.push(component);
        let root = root.clone();
        let built = built.clone();
        asyncify(move || match root.create_dir(&built) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err),
        })
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Provider for Filesystem {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn can_intra_copy(&self) -> bool {
        true
    }

    fn can_intra_move(&self) -> bool {
        true
    }

    async fn validate_path(&self, raw: &str) -> Result<Path> {
        Ok(Path::split(raw))
    }

    async fn metadata(&self, path: &Path) -> Result<Metadata> {
        let root = self.root.clone();
        let rel = relative(path);
        let fs_meta = asyncify(move || root.symlink_metadata(&rel)).await?;
        Ok(meta_from_fs(path, self.name(), &fs_meta))
    }

    async fn list_folder(&self, path: &Path) -> Result<Vec<Metadata>> {
        let root = self.root.clone();
        let rel = relative(path);
        let entries = asyncify(move || {
            let mut out = Vec::new();
            for entry in root.read_dir(&rel)? {
                let entry = entry?;
                let meta = entry.metadata()?;
                out.push((entry.file_name().to_string_lossy().into_owned(), meta));
            }
            Ok(out)
        })
        .await?;

        Ok(entries
            .into_iter()
            .map(|(name, fs_meta)| {
                let child = path.child(name, None, fs_meta.is_dir());
                meta_from_fs(&child, self.name(), &fs_meta)
            })
            .collect())
    }

    async fn download(
        &self,
        path: &Path,
        revision: Option<&str>,
        range: Option<(u64, u64)>,
    ) -> Result<Box<dyn ByteStream>> {
        if !RevisionMetadata::is_latest_sentinel(revision) {
            return Err(Error::not_found(format!(
                "{}: no version history beyond the latest revision",
                path.materialized_path()
            )));
        }
        let root = self.root.clone();
        let rel = relative(path);
        let (file, total_len) = asyncify(move || {
            let file = root.open(&rel)?;
            let len = file.metadata()?.len();
            Ok((file, len))
        })
        .await?;
        let file = tokio::fs::File::from_std(file.into_std());

        match range {
            Some((start, end)) => {
                let end = end.min(total_len);
                let hi = end.saturating_sub(1).max(start);
                Ok(Box::new(PartialFileStreamReader::new(file, start, hi, total_len)))
            }
            None => Ok(Box::new(FileStreamReader::new(file, Some(total_len)))),
        }
    }

    async fn upload(&self, path: &Path, mut content: Box<dyn ByteStream>) -> Result<Metadata> {
        use tokio::io::AsyncWriteExt;

        let rel = relative(path);
        ensure_parent_dirs(self.root.clone(), &rel).await?;

        let root = self.root.clone();
        let rel_for_open = rel.clone();
        let file = asyncify(move || {
            let mut options = cap_std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            root.open_with(&rel_for_open, &options)
        })
        .await?;
        let mut file = tokio::fs::File::from_std(file.into_std());

        loop {
            let chunk = content.read(64 * 1024).await?;
            if chunk.is_empty() {
                break;
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        self.metadata(path).await
    }

    async fn delete(&self, path: &Path, confirm_delete: bool) -> Result<()> {
        if path.is_root() {
            if !confirm_delete {
                return Err(Error::new(ErrorKind::InvalidParameters, "deleting the storage root requires confirm_delete"));
            }
            for child in self.list_folder(path).await? {
                if let Some(child_path) = child.path() {
                    let child = self.validate_path(child_path).await?;
                    Box::pin(self.delete(&child, false)).await?;
                }
            }
            return Ok(());
        }

        let meta = self.metadata(path).await?;
        let root = self.root.clone();
        let rel = relative(path);
        if meta.is_folder() {
            for child in self.list_folder(path).await? {
                if let Some(child_path) = child.path() {
                    let child = self.validate_path(child_path).await?;
                    Box::pin(self.delete(&child, false)).await?;
                }
            }
            asyncify(move || root.remove_dir(&rel)).await
        } else {
            asyncify(move || root.remove_file(&rel)).await
        }
    }

    async fn create_folder(&self, path: &Path, conflict: ConflictResolution) -> Result<Metadata> {
        let resolved = self.handle_name_conflict(path, conflict).await?;
        let rel = relative(&resolved);
        ensure_parent_dirs(self.root.clone(), &rel).await?;
        let root = self.root.clone();
        let rel_for_create = rel.clone();
        asyncify(move || match root.create_dir(&rel_for_create) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err),
        })
        .await?;
        self.metadata(&resolved).await
    }

    async fn revisions(&self, path: &Path) -> Result<Vec<RevisionMetadata>> {
        // No real version history on a local filesystem; synthesize a
        // single "latest" revision from current content, the sentinel
        // convention backends with no native versioning use (specification
        // open question (a)).
        let meta = self.metadata(path).await?;
        let Metadata::File(file) = meta else {
            return Ok(Vec::new());
        };
        let etag = file.common.etag.clone().unwrap_or_default();
        Ok(vec![RevisionMetadata {
            version_identifier: format!("{etag}{}", RevisionMetadata::LATEST_SENTINEL_SUFFIX),
            modified_utc: file.modified_utc,
            size: file.size,
            extra_hashes: file.extra_hashes,
        }])
    }

    async fn copy_within(&self, src: &Path, dest: &Path) -> Result<Metadata> {
        let root = self.root.clone();
        let src_rel = relative(src);
        let dest_rel = relative(dest);
        ensure_parent_dirs(self.root.clone(), &dest_rel).await?;
        asyncify(move || {
            use std::io::{Read, Write};
            let mut source = root.open(&src_rel)?;
            let mut options = cap_std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            let mut dest_file = root.open_with(&dest_rel, &options)?;
            let mut buf = [0u8; 64 * 1024];
            loop {
                let read = source.read(&mut buf)?;
                if read == 0 {
                    break;
                }
                dest_file.write_all(&buf[..read])?;
            }
            Ok(())
        })
        .await?;
        self.metadata(dest).await
    }

    async fn move_within(&self, src: &Path, dest: &Path) -> Result<Metadata> {
        let root = self.root.clone();
        let src_rel = relative(src);
        let dest_rel = relative(dest);
        ensure_parent_dirs(self.root.clone(), &dest_rel).await?;
        let root_for_rename = root.clone();
        asyncify(move || root_for_rename.rename(&src_rel, &root, &dest_rel)).await?;
        self.metadata(dest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filegate::stream::StringStream;

    fn fixture() -> (tempfile::TempDir, Filesystem) {
        let dir = tempfile::tempdir().unwrap();
        let fs = Filesystem::new(dir.path()).unwrap();
        (dir, fs)
    }

    #[tokio::test]
    async fn uploads_then_downloads_the_same_content() {
        let (_dir, fs) = fixture();
        let path = fs.validate_path("/hello.txt").await.unwrap();
        fs.upload(&path, Box::new(StringStream::new("hello world"))).await.unwrap();

        let mut stream = fs.download(&path, None, None).await.unwrap();
        let bytes = filegate::stream::collect(stream.as_mut(), 1024).await.unwrap();
        assert_eq!(bytes.as_slice(), b"hello world");
    }

    #[tokio::test]
    async fn range_download_returns_only_the_requested_bytes() {
        let (_dir, fs) = fixture();
        let path = fs.validate_path("/data.bin").await.unwrap();
        fs.upload(&path, Box::new(StringStream::new("0123456789"))).await.unwrap();

        let mut stream = fs.download(&path, None, Some((2, 6))).await.unwrap();
        let bytes = filegate::stream::collect(stream.as_mut(), 1024).await.unwrap();
        assert_eq!(bytes.as_slice(), b"2345");
    }

    #[tokio::test]
    async fn create_folder_then_list_finds_it_empty() {
        let (_dir, fs) = fixture();
        let path = fs.validate_path("/reports/").await.unwrap();
        fs.create_folder(&path, ConflictResolution::Warn).await.unwrap();

        let listing = fs.list_folder(&path).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn deleting_a_folder_removes_its_contents() {
        let (_dir, fs) = fixture();
        let folder = fs.validate_path("/sub/").await.unwrap();
        fs.create_folder(&folder, ConflictResolution::Warn).await.unwrap();
        let file = fs.validate_path("/sub/a.txt").await.unwrap();
        fs.upload(&file, Box::new(StringStream::new("x"))).await.unwrap();

        fs.delete(&folder, false).await.unwrap();
        let err = fs.metadata(&folder).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn deleting_the_root_requires_confirm_delete() {
        let (_dir, fs) = fixture();
        let root = Path::root();
        let err = fs.delete(&root, false).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidParameters);
    }

    #[tokio::test]
    async fn intra_copy_duplicates_content_without_removing_the_source() {
        let (_dir, fs) = fixture();
        let src = fs.validate_path("/a.txt").await.unwrap();
        fs.upload(&src, Box::new(StringStream::new("payload"))).await.unwrap();
        let dest = fs.validate_path("/b.txt").await.unwrap();

        fs.copy_within(&src, &dest).await.unwrap();

        let mut a = fs.download(&src, None, None).await.unwrap();
        let mut b = fs.download(&dest, None, None).await.unwrap();
        assert_eq!(
            filegate::stream::collect(a.as_mut(), 1024).await.unwrap(),
            filegate::stream::collect(b.as_mut(), 1024).await.unwrap()
        );
    }

    #[tokio::test]
    async fn revisions_synthesizes_a_single_latest_sentinel() {
        let (_dir, fs) = fixture();
        let path = fs.validate_path("/versioned.txt").await.unwrap();
        fs.upload(&path, Box::new(StringStream::new("v1"))).await.unwrap();

        let revisions = fs.revisions(&path).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert!(revisions[0].version_identifier.ends_with(RevisionMetadata::LATEST_SENTINEL_SUFFIX));
    }
}
