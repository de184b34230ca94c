#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! FileGate is a storage-agnostic file-operation gateway.
//!
//! It receives authenticated requests to list, read, write, move, copy,
//! delete, revision and archive files and executes them against one of many
//! heterogeneous backend storage systems (S3-compatible object stores,
//! OneDrive-style id-based APIs, the local filesystem, and others). Callers
//! see one resource model and one set of verbs; this crate hides the
//! backend idiosyncrasies behind the [`provider::Provider`] trait.
//!
//! Concrete backends live in their own crates (`filegate-sbe-fs`,
//! `filegate-sbe-s3`, `filegate-sbe-onedrive`, ...) the same way libunftp's
//! storage back-ends do, and implement [`provider::Provider`] from this
//! crate.
//!
//! # Quick start
//!
//! ```no_run
//! use filegate::provider::Provider;
//!
//! # async fn example(provider: impl Provider) -> filegate::error::Result<()> {
//! let path = provider.validate_path("/reports/").await?;
//! let listing = provider.metadata(&path).await?;
//! # let _ = listing;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod chunked_upload;
pub mod content_disposition;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod path;
pub mod provider;
pub mod registry;
pub mod request;
pub mod settings;
pub mod stream;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::path::{Path, PathPart};
pub use crate::provider::Provider;
pub use crate::settings::Settings;

/// A boxed, thread-safe error used internally to carry opaque source errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
