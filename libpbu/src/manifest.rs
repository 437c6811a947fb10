//! Component B: the manifest codec.
//!
//! A manifest line is a fixed-column text record:
//!
//! ```text
//! 00000000000006 20240101.000000 f572d396fae9206628714fb2ce00f72e94f2258f foo.txt
//! |<-- size -->| |<---mtime--->| |<------------ hash ------------------>| path...
//! 0            14 15           30 31                                   71 72
//! ```
//!
//! Entries within a manifest are unique by `path` and sorted by
//! `(size, hash, path)` — deliberately excluding `mtime`, so that timestamp
//! drift alone never reorders the file.

use crate::error::{PbuError, Result};
use camino::Utf8PathBuf;
use std::collections::HashSet;
use std::fmt;

const SIZE_START: usize = 0;
const SIZE_END: usize = 14;
const MTIME_START: usize = 15;
const MTIME_END: usize = 30;
const HASH_START: usize = 31;
const HASH_END: usize = 71;
const PATH_START: usize = 72;

/// The control files that implicitly never appear inside a manifest.
pub const SIDECAR_NAMES: &[&str] = &[
	".pbu",
	".pbu-new",
	".pbu-diff",
	".pbu-old",
	".pbu-new-asv",
	".pbu-new-asv-writing",
	"pbu-norehash",
];

pub const MANIFEST_FILE: &str = ".pbu";
pub const MANIFEST_NEW_FILE: &str = ".pbu-new";
pub const MANIFEST_DIFF_FILE: &str = ".pbu-diff";
pub const MANIFEST_OLD_FILE: &str = ".pbu-old";
pub const AUTO_SAVE_FILE: &str = ".pbu-new-asv";
pub const AUTO_SAVE_WRITING_FILE: &str = ".pbu-new-asv-writing";
pub const NOREHASH_MARKER: &str = "pbu-norehash";

/// A single file record within a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
	pub size: u64,
	/// `YYYYMMDD.HHMMSS`, local time, truncated to seconds.
	pub mtime: String,
	/// Lowercase 40-character hex SHA-1.
	pub hash: String,
	/// Forward-slash separated, relative to the folder root, no leading `./`.
	pub path: String,
}

impl ManifestEntry {
	/// `(size, hash, path)` — the manifest's canonical sort order.
	pub fn sort_key(&self) -> (u64, &str, &str) {
		(self.size, &self.hash, &self.path)
	}

	/// `(size, hash)` — content identity, used to match files across snapshots.
	pub fn identity_key(&self) -> (u64, &str) {
		(self.size, &self.hash)
	}
}

impl fmt::Display for ManifestEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", format_entry(self))
	}
}

/// Renders an entry as a fixed-column manifest line (no trailing newline).
pub fn format_entry(e: &ManifestEntry) -> String {
	format!("{:014} {} {} {}", e.size, e.mtime, e.hash, e.path)
}

/// Parses a single fixed-column manifest line.
pub fn parse_line(line: &str) -> Result<ManifestEntry> {
	let malformed = |detail: &str| PbuError::ManifestMalformed {
		path: Utf8PathBuf::new(),
		detail: format!("{detail} (line: {line:?})"),
	};

	if line.chars().count() < PATH_START + 1 {
		return Err(malformed("line too short for the fixed-column layout"));
	}
	// the fixed columns are ASCII-only by construction (hex hash, digits, a
	// local timestamp) so byte indexing is safe once the length check passes.
	if !line.is_ascii() {
		return Err(malformed("non-ASCII content in fixed columns"));
	}

	let bytes = line.as_bytes();
	if bytes[SIZE_END] != b' ' || bytes[MTIME_END] != b' ' || bytes[HASH_END] != b' ' {
		return Err(malformed("missing column separator"));
	}

	let size_str = &line[SIZE_START..SIZE_END];
	let size: u64 = size_str
		.parse()
		.map_err(|_| malformed("size column is not a zero-padded decimal number"))?;

	let mtime = &line[MTIME_START..MTIME_END];
	if mtime.as_bytes()[8] != b'.' {
		return Err(malformed("mtime column is not in YYYYMMDD.HHMMSS form"));
	}

	let hash = &line[HASH_START..HASH_END];
	if hash.len() != 40 || !hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
		return Err(malformed("hash column is not 40 lowercase hex characters"));
	}

	let path = &line[PATH_START..];
	if path.is_empty() {
		return Err(malformed("path column is empty"));
	}

	Ok(ManifestEntry {
		size,
		mtime: mtime.to_string(),
		hash: hash.to_string(),
		path: path.to_string(),
	})
}

/// An ordered collection of manifest entries, optionally tied to a path on disk.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
	pub entries: Vec<ManifestEntry>,
}

impl Manifest {
	pub fn new(entries: Vec<ManifestEntry>) -> Self {
		Self { entries }
	}

	/// Sorts in place by the canonical `(size, hash, path)` key.
	pub fn sort(&mut self) {
		self.entries
			.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
	}

	/// Checks the invariant that every path in the manifest is unique.
	pub fn check_unique_paths(&self, path: &camino::Utf8Path) -> Result<()> {
		let mut seen = HashSet::with_capacity(self.entries.len());
		for e in &self.entries {
			if !seen.insert(e.path.as_str()) {
				return Err(PbuError::ManifestMalformed {
					path: path.to_path_buf(),
					detail: format!("duplicate path in manifest: {}", e.path),
				});
			}
		}
		Ok(())
	}

	/// Parses a manifest from its on-disk text form. Trailing empty lines
	/// (including the mandatory final newline) are dropped silently.
	pub fn parse(text: &str, path: &camino::Utf8Path) -> Result<Self> {
		let entries = text
			.split('\n')
			.filter(|l| !l.is_empty())
			.map(|l| {
				parse_line(l).map_err(|e| match e {
					PbuError::ManifestMalformed { detail, .. } => PbuError::ManifestMalformed {
						path: path.to_path_buf(),
						detail,
					},
					other => other,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		let manifest = Manifest::new(entries);
		manifest.check_unique_paths(path)?;
		Ok(manifest)
	}

	/// Serializes to the on-disk text form: one line per entry, newline-terminated.
	pub fn to_text(&self) -> String {
		let mut out = String::new();
		for e in &self.entries {
			out.push_str(&format_entry(e));
			out.push('\n');
		}
		out
	}

	pub fn read_file(path: &camino::Utf8Path) -> Result<Self> {
		use crate::error::IoResultExt;
		let text = std::fs::read_to_string(path).pbu_ctx(path)?;
		Self::parse(&text, path)
	}

	pub fn write_file(&self, path: &camino::Utf8Path) -> Result<()> {
		use crate::error::IoResultExt;
		std::fs::write(path, self.to_text()).pbu_ctx(path)
	}
}
