//! Typed error taxonomy for the backup engine.
//!
//! Every fallible core operation returns [`Result<T>`]. The `pbu` binary
//! wraps these in `anyhow::Context` to attach operation-level narration, but
//! the variants here already carry the offending path so a bare `Display`
//! is useful on its own.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PbuError>;

#[derive(Error, Debug)]
pub enum PbuError {
	#[error("permission denied reading {path}")]
	PermissionDenied { path: Utf8PathBuf },

	#[error("I/O error on {path}: {source}")]
	Io {
		path: Utf8PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("manifest at {path} is malformed: {detail}")]
	ManifestMalformed { path: Utf8PathBuf, detail: String },

	#[error(
		"refusing to create version '{new_version}' for folder '{folder}': \
		 it is not greater than the latest existing version '{latest_version}'"
	)]
	VersionDecreasing {
		folder: String,
		new_version: String,
		latest_version: String,
	},

	#[error("folder '{folder}' needs review before it can be backed up")]
	NeedsReview { folder: Utf8PathBuf },

	#[error("internal invariant violated: {detail}")]
	InternalInvariant { detail: String },
}

impl PbuError {
	/// Wraps a `std::io::Error`, classifying permission failures into their
	/// own variant instead of a generic I/O error.
	pub fn from_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
		let path = path.into();
		if source.kind() == std::io::ErrorKind::PermissionDenied {
			PbuError::PermissionDenied { path }
		} else {
			PbuError::Io { path, source }
		}
	}
}

/// Small extension trait to attach a path to an `io::Result` tersely at call sites.
pub(crate) trait IoResultExt<T> {
	fn pbu_ctx(self, path: impl Into<Utf8PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
	fn pbu_ctx(self, path: impl Into<Utf8PathBuf>) -> Result<T> {
		self.map_err(|e| PbuError::from_io(path, e))
	}
}
