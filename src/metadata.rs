//! The tagged-variant metadata model returned by every provider verb
//! (specification §4.3 "Metadata").

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::path::Path;

/// Metadata describing a single entity: a file, a folder, or a historical
/// revision of a file.
///
/// Serializes in a JSON-API-flavored envelope via [`Metadata::json_api_serialized`]
/// rather than deriving `Serialize` directly, since the wire shape
/// (`{data: {id, type, attributes, links}}`) doesn't match the natural Rust
/// enum layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    /// A regular file.
    File(FileMetadata),
    /// A folder / container.
    Folder(FolderMetadata),
    /// A single historical revision of a file.
    Revision(RevisionMetadata),
}

/// Fields common to both files and folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonMetadata {
    /// The backend-relative materialized path.
    pub path: String,
    /// The display name (last path segment).
    pub name: String,
    /// The backend this entity lives in, e.g. `"s3"`, `"osfstorage"`.
    pub provider: String,
    /// The backend's raw etag for this entity, before the
    /// `hash(provider_name || ":" || raw_etag)` transform
    /// [`Metadata::json_api_serialized`] applies to it on the wire.
    /// `None` only where the backend genuinely cannot supply one (folders
    /// on backends with no folder-level etag).
    pub etag: Option<String>,
}

impl CommonMetadata {
    /// Builds a [`CommonMetadata`] from a resolved [`Path`], with no etag.
    /// Backends that can supply one should follow with
    /// [`CommonMetadata::with_etag`].
    pub fn new(path: &Path, provider: impl Into<String>) -> Self {
        CommonMetadata {
            path: path.materialized_path(),
            name: path.name().to_string(),
            provider: provider.into(),
            etag: None,
        }
    }

    /// Returns a copy with the raw (backend-native) etag set.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Metadata specific to a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Fields shared with folders.
    #[serde(flatten)]
    pub common: CommonMetadata,
    /// Size in bytes, when known.
    pub size: Option<u64>,
    /// Content hashes the backend reports, keyed by algorithm name
    /// (`"md5"`, `"sha256"`, an ETag under `"etag"`, ...).
    pub extra_hashes: std::collections::BTreeMap<String, String>,
    /// Last-modified timestamp, RFC 3339, UTC.
    pub modified_utc: Option<String>,
    /// MIME type, when known or inferable.
    pub content_type: Option<String>,
    /// Opaque identifier for the current revision, if the backend
    /// versions objects.
    pub revision: Option<String>,
}

/// Metadata specific to a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderMetadata {
    /// Fields shared with files.
    #[serde(flatten)]
    pub common: CommonMetadata,
}

/// Metadata describing one historical revision of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    /// Opaque revision identifier.
    pub version_identifier: String,
    /// Last-modified timestamp of this revision, RFC 3339, UTC.
    pub modified_utc: Option<String>,
    /// Size of this revision in bytes, when known.
    pub size: Option<u64>,
    /// Content hashes specific to this revision.
    pub extra_hashes: std::collections::BTreeMap<String, String>,
}

impl RevisionMetadata {
    /// Suffix a backend with no native version history appends to its etag
    /// to synthesize the single "latest" revision it can offer
    /// (specification §9(a)). A `download`/`revisions` request carrying a
    /// `version_identifier` ending in this suffix means "current content",
    /// not a specific historical version — exposed as a named constant
    /// rather than left as a string backends and callers must agree on by
    /// convention.
    pub const LATEST_SENTINEL_SUFFIX: &'static str = ":latest";

    /// Whether `revision` names the synthesized "latest" sentinel (or is
    /// absent, which means the same thing: no specific revision pinned).
    pub fn is_latest_sentinel(revision: Option<&str>) -> bool {
        match revision {
            None => true,
            Some(r) => r.ends_with(Self::LATEST_SENTINEL_SUFFIX),
        }
    }
}

impl Metadata {
    /// Builds a [`FileMetadata`] variant from a resolved [`Path`].
    pub fn file(path: &Path, provider: impl Into<String>) -> FileMetadata {
        FileMetadata {
            common: CommonMetadata::new(path, provider),
            size: None,
            extra_hashes: Default::default(),
            modified_utc: None,
            content_type: None,
            revision: None,
        }
    }

    /// Builds a [`FolderMetadata`] variant from a resolved [`Path`].
    pub fn folder(path: &Path, provider: impl Into<String>) -> FolderMetadata {
        FolderMetadata {
            common: CommonMetadata::new(path, provider),
        }
    }

    /// Derives the wire-facing etag: `hash(provider_name || ":" || raw_etag)`
    /// (specification §3, "Metadata entity"), or `None` when the backend
    /// supplied no raw etag at all.
    ///
    /// Mirrors `waterbutler.core.metadata.BaseMetadata.etag`, which hashes
    /// the provider-qualified raw etag so callers never see (and can't
    /// forge) a backend's native etag format directly.
    fn hashed_etag(&self) -> Option<String> {
        use sha2::{Digest, Sha256};

        let (provider, raw) = match self {
            Metadata::File(f) => (&f.common.provider, f.common.etag.as_deref()?),
            Metadata::Folder(d) => (&d.common.provider, d.common.etag.as_deref()?),
            Metadata::Revision(_) => return None,
        };
        let mut hasher = Sha256::new();
        hasher.update(provider.as_bytes());
        hasher.update(b":");
        hasher.update(raw.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }

    /// The entity-scoped verbs this metadata's `links` block enumerates
    /// (specification §3: `move`, `delete`, plus `upload` for folders,
    /// `download` for files, `new_folder` for folders).
    fn links(&self, resource: &str, id: &str) -> Value {
        let mut links = json!({
            "move": format!("/resources/{resource}/providers/{id}"),
            "delete": format!("/resources/{resource}/providers/{id}"),
        });
        match self {
            Metadata::File(_) => {
                links["download"] = json!(format!("/resources/{resource}/providers/{id}"));
            }
            Metadata::Folder(_) => {
                links["upload"] = json!(format!("/resources/{resource}/providers/{id}"));
                links["new_folder"] = json!(format!("/resources/{resource}/providers/{id}?kind=folder"));
            }
            Metadata::Revision(_) => {}
        }
        links
    }

    /// The JSON-API-style serialized representation used on the wire
    /// (specification §4.3: `id = provider_name + path`, `type = "files"`,
    /// `attributes = serialized()` plus `resource` set to `resource_id`).
    ///
    /// Mirrors `waterbutler.core.metadata.BaseMetadata.json_api_serialized`.
    pub fn json_api_serialized(&self, resource: &str) -> Value {
        let etag = self.hashed_etag();
        let (id, attributes) = match self {
            Metadata::File(f) => (
                format!("{}{}", f.common.provider, f.common.path),
                json!({
                    "name": f.common.name,
                    "path": f.common.path,
                    "provider": f.common.provider,
                    "size": f.size,
                    "modified_utc": f.modified_utc,
                    "contentType": f.content_type,
                    "extra": f.extra_hashes,
                    "currentVersion": f.revision,
                    "etag": etag,
                    "resource": resource,
                }),
            ),
            Metadata::Folder(d) => (
                format!("{}{}", d.common.provider, d.common.path),
                json!({
                    "name": d.common.name,
                    "path": d.common.path,
                    "provider": d.common.provider,
                    "etag": etag,
                    "resource": resource,
                }),
            ),
            Metadata::Revision(r) => (
                r.version_identifier.clone(),
                json!({
                    "version": r.version_identifier,
                    "modified_utc": r.modified_utc,
                    "size": r.size,
                    "extra": r.extra_hashes,
                    "resource": resource,
                }),
            ),
        };

        json!({
            "data": {
                "id": id,
                "type": "files",
                "attributes": attributes,
                "links": self.links(resource, &id),
            }
        })
    }

    /// The materialized path for any variant, or `None` for a [`Metadata::Revision`]
    /// (revisions are addressed by version identifier, not path).
    pub fn path(&self) -> Option<&str> {
        match self {
            Metadata::File(f) => Some(&f.common.path),
            Metadata::Folder(d) => Some(&d.common.path),
            Metadata::Revision(_) => None,
        }
    }

    /// Whether this is a [`Metadata::Folder`].
    pub fn is_folder(&self) -> bool {
        matches!(self, Metadata::Folder(_))
    }

    /// Whether this is a [`Metadata::File`].
    pub fn is_file(&self) -> bool {
        matches!(self, Metadata::File(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_metadata_serializes_with_a_file_type_tag() {
        let path = Path::split("/foo.txt");
        let meta = Metadata::File(Metadata::file(&path, "s3"));
        let json = meta.json_api_serialized("abc123");
        assert_eq!(json["data"]["type"], "files");
        assert_eq!(json["data"]["id"], "s3/foo.txt");
        assert_eq!(json["data"]["attributes"]["name"], "foo.txt");
        assert_eq!(json["data"]["attributes"]["resource"], "abc123");
        assert!(json["data"]["links"]["download"].is_string());
    }

    #[test]
    fn folder_metadata_serializes_with_the_files_type_tag() {
        let path = Path::split("/foo/");
        let meta = Metadata::Folder(Metadata::folder(&path, "s3"));
        let json = meta.json_api_serialized("abc123");
        assert_eq!(json["data"]["type"], "files");
        assert!(json["data"]["links"]["new_folder"].is_string());
    }

    #[test]
    fn etag_is_a_hex_hash_of_provider_and_raw_etag_when_present() {
        let path = Path::split("/foo.txt");
        let mut file = Metadata::file(&path, "s3");
        file.common = file.common.with_etag("raw-etag-value");
        let json = Metadata::File(file).json_api_serialized("abc123");
        let etag = json["data"]["attributes"]["etag"].as_str().unwrap();
        assert_eq!(etag.len(), 64);
        assert!(etag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn equal_metadata_produces_equal_serializations() {
        let path = Path::split("/foo.txt");
        let mut a = Metadata::file(&path, "s3");
        a.common = a.common.with_etag("v1");
        let mut b = Metadata::file(&path, "s3");
        b.common = b.common.with_etag("v1");
        assert_eq!(a, b);
        assert_eq!(
            Metadata::File(a).json_api_serialized("r"),
            Metadata::File(b).json_api_serialized("r")
        );
    }

    #[test]
    fn folders_may_have_no_etag() {
        let path = Path::split("/foo/");
        let meta = Metadata::Folder(Metadata::folder(&path, "s3"));
        let json = meta.json_api_serialized("abc123");
        assert!(json["data"]["attributes"]["etag"].is_null());
    }

    #[test]
    fn revision_metadata_is_keyed_by_version_identifier_not_path() {
        let revision = RevisionMetadata {
            version_identifier: "v2".to_string(),
            modified_utc: None,
            size: Some(128),
            extra_hashes: Default::default(),
        };
        let meta = Metadata::Revision(revision);
        assert_eq!(meta.path(), None);
        let json = meta.json_api_serialized("abc123");
        assert_eq!(json["data"]["id"], "v2");
    }
}
