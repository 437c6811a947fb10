//! Component A: file hashing.
//!
//! Below [`STREAM_THRESHOLD`] bytes a file is read in one shot; above it, a
//! 1 MiB buffer is used to stream through [`sha1::Sha1`] so large files don't
//! need to be held in memory twice.

use crate::error::{IoResultExt, Result};
use camino::Utf8Path;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;

/// Files at or below this size are hashed with a single `read_to_end`.
pub const STREAM_THRESHOLD: u64 = 1024 * 1024;
const STREAM_BUFFER: usize = 1024 * 1024;

/// Hashes a file's contents and returns the lowercase hex SHA-1 digest.
pub fn hash_file(path: &Utf8Path) -> Result<String> {
	let mut f = File::open(path).pbu_ctx(path)?;
	let len = f.metadata().pbu_ctx(path)?.len();

	let digest = if len <= STREAM_THRESHOLD {
		let mut data = Vec::with_capacity(len as usize);
		f.read_to_end(&mut data).pbu_ctx(path)?;
		Sha1::digest(&data)
	} else {
		let mut hasher = Sha1::new();
		let mut buf = vec![0u8; STREAM_BUFFER];
		loop {
			let n = f.read(&mut buf).pbu_ctx(path)?;
			if n == 0 {
				break;
			}
			hasher.update(&buf[..n]);
		}
		hasher.finalize()
	};

	Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn hash_bytes(data: &[u8]) -> String {
		let mut f = NamedTempFile::new().unwrap();
		f.write_all(data).unwrap();
		f.flush().unwrap();
		hash_file(Utf8Path::from_path(f.path()).unwrap()).unwrap()
	}

	#[test]
	fn known_vector() {
		// sha1("hello\n"), reused as a fixture value throughout this crate's tests
		assert_eq!(hash_bytes(b"hello\n"), "f572d396fae9206628714fb2ce00f72e94f2258f");
	}

	#[test]
	fn single_read_and_streaming_branches_agree_with_reference() {
		let at_threshold = vec![0x42u8; STREAM_THRESHOLD as usize];
		let over_threshold = vec![0x42u8; STREAM_THRESHOLD as usize + 1];

		let h1 = hash_bytes(&at_threshold);
		let h2 = hash_bytes(&over_threshold);

		let mut hasher = Sha1::new();
		hasher.update(&at_threshold);
		assert_eq!(h1, hex::encode(hasher.finalize()));

		let mut hasher = Sha1::new();
		hasher.update(&over_threshold);
		assert_eq!(h2, hex::encode(hasher.finalize()));
	}

	#[test]
	fn empty_file_hashes() {
		assert_eq!(hash_bytes(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
	}
}
