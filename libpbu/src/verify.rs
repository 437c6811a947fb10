//! Read-only manifest verification: a relative of the folder validator that
//! rehashes every entry in a folder's manifest and reports mismatches
//! without rewriting anything. Backs the `pbu verify` subcommand.

use crate::error::{IoResultExt, PbuError, Result};
use crate::hash;
use crate::manifest::{Manifest, MANIFEST_FILE};
use camino::Utf8Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
	Missing { path: String },
	SizeMismatch { path: String, expected: u64, actual: u64 },
	HashMismatch { path: String, expected: String, actual: String },
}

impl std::fmt::Display for Mismatch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Mismatch::Missing { path } => write!(f, "{path}: missing"),
			Mismatch::SizeMismatch { path, expected, actual } => {
				write!(f, "{path}: size mismatch (expected {expected}, found {actual})")
			}
			Mismatch::HashMismatch { path, expected, actual } => {
				write!(f, "{path}: hash mismatch (expected {expected}, found {actual})")
			}
		}
	}
}

/// Rehashes every entry in `folder`'s `.pbu` manifest and returns any file
/// whose size or content no longer matches. Neither the manifest nor any
/// sidecar file is touched.
pub fn verify(folder: &Utf8Path) -> Result<Vec<Mismatch>> {
	let manifest = Manifest::read_file(&folder.join(MANIFEST_FILE))?;
	let mut mismatches = Vec::new();

	for entry in &manifest.entries {
		let abs = folder.join(&entry.path);
		let meta = match std::fs::metadata(&abs) {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				mismatches.push(Mismatch::Missing { path: entry.path.clone() });
				continue;
			}
			Err(e) => return Err(PbuError::from_io(abs, e)),
		};

		if meta.len() != entry.size {
			mismatches.push(Mismatch::SizeMismatch {
				path: entry.path.clone(),
				expected: entry.size,
				actual: meta.len(),
			});
			continue;
		}

		let actual = hash::hash_file(&abs)?;
		if actual != entry.hash {
			mismatches.push(Mismatch::HashMismatch {
				path: entry.path.clone(),
				expected: entry.hash.clone(),
				actual,
			});
		}
	}

	Ok(mismatches)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::manifest::ManifestEntry;
	use std::fs;

	fn write_manifest(folder: &Utf8Path, entries: Vec<ManifestEntry>) {
		let mut m = Manifest::new(entries);
		m.sort();
		m.write_file(&folder.join(MANIFEST_FILE)).unwrap();
	}

	#[test]
	fn clean_folder_has_no_mismatches() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();
		write_manifest(
			root,
			vec![ManifestEntry {
				size: 6,
				mtime: "20240101.000000".to_string(),
				hash: "f572d396fae9206628714fb2ce00f72e94f2258f".to_string(),
				path: "foo.txt".to_string(),
			}],
		);

		assert!(verify(root).unwrap().is_empty());
	}

	#[test]
	fn missing_file_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		write_manifest(
			root,
			vec![ManifestEntry {
				size: 6,
				mtime: "20240101.000000".to_string(),
				hash: "f572d396fae9206628714fb2ce00f72e94f2258f".to_string(),
				path: "foo.txt".to_string(),
			}],
		);

		let mismatches = verify(root).unwrap();
		assert_eq!(mismatches, vec![Mismatch::Missing { path: "foo.txt".to_string() }]);
	}

	#[test]
	fn changed_content_is_reported_as_hash_mismatch() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();
		write_manifest(
			root,
			vec![ManifestEntry {
				size: 6,
				mtime: "20240101.000000".to_string(),
				hash: "f572d396fae9206628714fb2ce00f72e94f2258f".to_string(),
				path: "foo.txt".to_string(),
			}],
		);
		fs::write(root.join("foo.txt"), b"hello!\n").unwrap();

		let mismatches = verify(root).unwrap();
		assert!(matches!(&mismatches[0], Mismatch::SizeMismatch { .. }));
	}
}
