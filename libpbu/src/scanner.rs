//! Component C: the folder scanner.
//!
//! Walks a folder root and yields the relative path of every regular file,
//! skipping symlinks (with a single warning per scan), ignored filenames,
//! ignored extensions, and ignored directory names. Yield order is
//! unspecified — [`crate::builder`] sorts after hashing.

use crate::config::BackupConfig;
use crate::error::{IoResultExt, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Recursively scans `root`, returning every regular file's path relative to it.
pub fn scan_folder(root: &Utf8Path, cfg: &BackupConfig) -> Result<Vec<Utf8PathBuf>> {
	let mut out = Vec::new();
	let mut warned_symlink = false;
	scan_into(root, Utf8Path::new(""), cfg, &mut out, &mut warned_symlink)?;
	Ok(out)
}

fn scan_into(
	root: &Utf8Path,
	rel: &Utf8Path,
	cfg: &BackupConfig,
	out: &mut Vec<Utf8PathBuf>,
	warned_symlink: &mut bool,
) -> Result<()> {
	let dir = root.join(rel);
	let entries = std::fs::read_dir(&dir).pbu_ctx(&dir)?;

	for entry in entries {
		let entry = entry.pbu_ctx(&dir)?;
		let name = entry.file_name();
		let Some(name) = name.to_str() else {
			// non-UTF-8 names can't be represented in a manifest path; skip.
			continue;
		};

		let file_type = entry.file_type().pbu_ctx(&dir)?;
		let rel_child = rel.join(name);

		if file_type.is_symlink() {
			if !*warned_symlink {
				log::warn!("symlink at {rel_child} is not supported and was skipped");
				*warned_symlink = true;
			}
			continue;
		}

		if file_type.is_dir() {
			if cfg.is_ignored_folder(name) {
				continue;
			}
			scan_into(root, &rel_child, cfg, out, warned_symlink)?;
			continue;
		}

		if cfg.is_ignored_filename(name) || cfg.is_ignored_extension(name) {
			continue;
		}

		out.push(rel_child);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn yields_files_and_skips_ignored() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();

		fs::write(root.join("keep.txt"), b"a").unwrap();
		fs::write(root.join("Thumbs.db"), b"b").unwrap();
		fs::write(root.join("note.tmp"), b"c").unwrap();
		fs::create_dir(root.join("sub")).unwrap();
		fs::write(root.join("sub/keep2.txt"), b"d").unwrap();
		fs::create_dir(root.join("@eaDir")).unwrap();
		fs::write(root.join("@eaDir/junk"), b"e").unwrap();

		let mut cfg = BackupConfig::default();
		cfg.ignore_filenames.insert("Thumbs.db".to_string());
		cfg.ignore_extensions.insert(".tmp".to_string());
		cfg.ignore_folders.insert("@eaDir".to_string());

		let mut files: Vec<_> = scan_folder(root, &cfg).unwrap().into_iter().map(|p| p.to_string()).collect();
		files.sort();

		assert_eq!(files, vec!["keep.txt".to_string(), "sub/keep2.txt".to_string()]);
	}

	#[test]
	fn sidecar_files_never_appear() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join(".pbu"), b"x").unwrap();
		fs::write(root.join("pbu-norehash"), b"x").unwrap();
		fs::write(root.join("real.txt"), b"x").unwrap();

		let cfg = BackupConfig::default();
		let files: Vec<_> = scan_folder(root, &cfg).unwrap();
		assert_eq!(files, vec![Utf8PathBuf::from("real.txt")]);
	}

	#[cfg(unix)]
	#[test]
	fn symlinks_are_skipped() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("real.txt"), b"x").unwrap();
		std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();

		let cfg = BackupConfig::default();
		let files = scan_folder(root, &cfg).unwrap();
		assert_eq!(files, vec![Utf8PathBuf::from("real.txt")]);
	}
}
