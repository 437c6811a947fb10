//! Component D: the manifest builder.
//!
//! Scans a folder, reuses hashes from a prior manifest (and any pending
//! auto-save checkpoint) when lazy mode is enabled and `(size, mtime, path)`
//! match, hashes everything else, and periodically checkpoints progress so a
//! killed multi-hour rebuild can resume without re-hashing what it already
//! covered.

use crate::config::BackupConfig;
use crate::error::{IoResultExt, Result};
use crate::fs_util;
use crate::hash;
use crate::manifest::{Manifest, ManifestEntry, AUTO_SAVE_FILE, AUTO_SAVE_WRITING_FILE};
use crate::scanner::scan_folder;
use camino::Utf8Path;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::time::{Instant, SystemTime};

/// Formats a modification time as the manifest's `YYYYMMDD.HHMMSS` local-time
/// column, truncated to whole seconds.
pub fn format_mtime(t: SystemTime) -> String {
	let local: DateTime<Local> = t.into();
	local.format("%Y%m%d.%H%M%S").to_string()
}

type LazyKey = (u64, String, String);

/// Builds a manifest for `folder`. `prior`, if given, seeds the lazy-mode
/// hash-reuse table together with any pending auto-save checkpoint found in
/// `folder`. If `target` is given, the finished (sorted) manifest is written
/// there.
pub fn build(
	folder: &Utf8Path,
	prior: Option<&Manifest>,
	cfg: &BackupConfig,
	target: Option<&Utf8Path>,
) -> Result<Manifest> {
	let files = scan_folder(folder, cfg)?;
	let lazy = lazy_lookup(folder, prior, cfg)?;

	let mut entries = Vec::with_capacity(files.len());
	let mut last_save = Instant::now();
	let period = std::time::Duration::from_secs(cfg.auto_save_period_seconds);

	for rel in files {
		let abs = folder.join(&rel);
		let meta = match std::fs::metadata(&abs) {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
			Err(e) => return Err(crate::error::PbuError::from_io(abs, e)),
		};

		let size = meta.len();
		let mtime = format_mtime(meta.modified().pbu_ctx(&abs)?);
		let path = rel.as_str().to_string();

		let key = (size, mtime.clone(), path.clone());
		let hash = match lazy.get(&key) {
			Some(h) => h.clone(),
			None => hash::hash_file(&abs)?,
		};

		entries.push(ManifestEntry { size, mtime, hash, path });

		if last_save.elapsed() >= period {
			write_auto_save(folder, &entries)?;
			last_save = Instant::now();
		}
	}

	let mut manifest = Manifest::new(entries);
	manifest.sort();

	if let Some(target) = target {
		manifest.write_file(target)?;
	}

	Ok(manifest)
}

fn lazy_lookup(
	folder: &Utf8Path,
	prior: Option<&Manifest>,
	cfg: &BackupConfig,
) -> Result<HashMap<LazyKey, String>> {
	let mut lazy = HashMap::new();
	if !cfg.lazy_mode {
		return Ok(lazy);
	}

	if let Some(prior) = prior {
		for e in &prior.entries {
			lazy.insert((e.size, e.mtime.clone(), e.path.clone()), e.hash.clone());
		}
	}

	let asv_path = folder.join(AUTO_SAVE_FILE);
	if asv_path.is_file() {
		let asv = Manifest::read_file(&asv_path)?;
		for e in asv.entries {
			lazy.entry((e.size, e.mtime.clone(), e.path.clone())).or_insert(e.hash);
		}
	}

	Ok(lazy)
}

fn write_auto_save(folder: &Utf8Path, entries: &[ManifestEntry]) -> Result<()> {
	let mut text = String::new();
	for e in entries {
		text.push_str(&crate::manifest::format_entry(e));
		text.push('\n');
	}
	let writing_path = folder.join(AUTO_SAVE_WRITING_FILE);
	let final_path = folder.join(AUTO_SAVE_FILE);
	fs_util::write_atomic(&final_path, &writing_path, &text)
}

/// Removes both auto-save checkpoint files, if present. The folder validator
/// calls this once a rebuild's result has been consumed.
pub fn clear_auto_save(folder: &Utf8Path) -> Result<()> {
	for name in [AUTO_SAVE_FILE, AUTO_SAVE_WRITING_FILE] {
		let p = folder.join(name);
		if p.exists() {
			std::fs::remove_file(&p).pbu_ctx(&p)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::manifest::MANIFEST_FILE;
	use std::fs;

	fn cfg() -> BackupConfig {
		BackupConfig::default()
	}

	#[test]
	fn builds_manifest_for_simple_folder() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();

		let m = build(root, None, &cfg(), None).unwrap();
		assert_eq!(m.entries.len(), 1);
		assert_eq!(m.entries[0].path, "foo.txt");
		assert_eq!(m.entries[0].hash, "f572d396fae9206628714fb2ce00f72e94f2258f");
		assert_eq!(m.entries[0].size, 6);
	}

	#[test]
	fn writes_to_target_when_given() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();

		let target = root.join(MANIFEST_FILE);
		build(root, None, &cfg(), Some(&target)).unwrap();
		assert!(target.is_file());
		let reread = Manifest::read_file(&target).unwrap();
		assert_eq!(reread.entries.len(), 1);
	}

	#[test]
	fn lazy_mode_reuses_hash_on_identity_match() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();

		let meta = fs::metadata(root.join("foo.txt")).unwrap();
		let mtime = format_mtime(meta.modified().unwrap());

		// a deliberately wrong hash: if the builder recomputed it, the output
		// would not match this sentinel value.
		let sentinel = "0000000000000000000000000000000000000f";
		let prior = Manifest::new(vec![ManifestEntry {
			size: 6,
			mtime,
			hash: sentinel.to_string(),
			path: "foo.txt".to_string(),
		}]);

		let m = build(root, Some(&prior), &cfg(), None).unwrap();
		assert_eq!(m.entries[0].hash, sentinel);
	}

	#[test]
	fn mismatched_identity_forces_rehash() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();

		let prior = Manifest::new(vec![ManifestEntry {
			size: 999,
			mtime: "19700101.000000".to_string(),
			hash: "0000000000000000000000000000000000000f".to_string(),
			path: "foo.txt".to_string(),
		}]);

		let m = build(root, Some(&prior), &cfg(), None).unwrap();
		assert_eq!(m.entries[0].hash, "f572d396fae9206628714fb2ce00f72e94f2258f");
	}

	#[test]
	fn consumes_pending_auto_save_checkpoint() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("foo.txt"), b"hello\n").unwrap();

		let meta = fs::metadata(root.join("foo.txt")).unwrap();
		let mtime = format_mtime(meta.modified().unwrap());
		let sentinel = "0000000000000000000000000000000000000f";

		let asv = Manifest::new(vec![ManifestEntry {
			size: 6,
			mtime,
			hash: sentinel.to_string(),
			path: "foo.txt".to_string(),
		}]);
		asv.write_file(&root.join(AUTO_SAVE_FILE)).unwrap();

		let m = build(root, None, &cfg(), None).unwrap();
		assert_eq!(m.entries[0].hash, sentinel);
	}

	#[test]
	fn auto_save_checkpoint_is_written_with_zero_period() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join("a.txt"), b"a").unwrap();
		fs::write(root.join("b.txt"), b"b").unwrap();

		let mut c = cfg();
		c.auto_save_period_seconds = 0;
		build(root, None, &c, None).unwrap();

		assert!(root.join(AUTO_SAVE_FILE).is_file());
	}

	#[test]
	fn clear_auto_save_removes_checkpoint_files() {
		let dir = tempfile::tempdir().unwrap();
		let root = Utf8Path::from_path(dir.path()).unwrap();
		fs::write(root.join(AUTO_SAVE_FILE), b"stale").unwrap();
		fs::write(root.join(AUTO_SAVE_WRITING_FILE), b"stale").unwrap();

		clear_auto_save(root).unwrap();

		assert!(!root.join(AUTO_SAVE_FILE).exists());
		assert!(!root.join(AUTO_SAVE_WRITING_FILE).exists());
	}
}
