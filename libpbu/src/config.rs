//! Component I: the ambient, explicitly-threaded configuration record.
//!
//! `BackupConfig` holds every backup-run option. It carries no behavior
//! beyond small derived accessors — nothing here reads from a global or
//! thread-local, callers always pass `&BackupConfig` explicitly into the
//! builder, validator, and planner.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_auto_save_period() -> u64 {
	120
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
	/// Directory containing source folders.
	pub base_path: Utf8PathBuf,
	/// Directory containing `<folder>.pbu` snapshot trees.
	pub dest: Utf8PathBuf,
	/// Version label appended as `.v<version>`. Empty means "generate from
	/// the current local time" (`YYYYMMDD.HHMMSS`) at run start.
	pub version: String,
	/// Explicit list of source folders. Empty means "every subfolder of
	/// `base_path` that already contains a `.pbu`".
	pub folders: Vec<String>,
	/// Skip source folders until this name is reached.
	pub start: Option<String>,
	/// Source folders to skip outright.
	pub ignore_folders: HashSet<String>,
	/// Filenames excluded from manifests.
	pub ignore_filenames: HashSet<String>,
	/// Filename suffixes excluded from manifests.
	pub ignore_extensions: HashSet<String>,
	/// Reuse a prior hash when (size, mtime, path) match.
	pub lazy_mode: bool,
	/// Auto-promote `.pbu-new` to `.pbu` when a diff has no deletes and no changes.
	pub lazy_check: bool,
	/// Retain `pbu-norehash` markers; revalidate `dstPrev` after incremental transfer.
	pub debug_mode: bool,
	/// Checkpoint interval, in seconds, during manifest build.
	#[serde(default = "default_auto_save_period")]
	pub auto_save_period_seconds: u64,
}

impl Default for BackupConfig {
	fn default() -> Self {
		Self {
			base_path: Utf8PathBuf::new(),
			dest: Utf8PathBuf::new(),
			version: String::new(),
			folders: Vec::new(),
			start: None,
			ignore_folders: HashSet::new(),
			ignore_filenames: HashSet::new(),
			ignore_extensions: HashSet::new(),
			lazy_mode: true,
			lazy_check: true,
			debug_mode: false,
			auto_save_period_seconds: default_auto_save_period(),
		}
	}
}

impl BackupConfig {
	/// Resolves `version`, generating a `YYYYMMDD.HHMMSS` local-time label
	/// if none was configured.
	pub fn effective_version(&self) -> String {
		if self.version.is_empty() {
			chrono::Local::now().format("%Y%m%d.%H%M%S").to_string()
		} else {
			self.version.clone()
		}
	}

	/// `true` if `name` (a bare filename) should be excluded from manifests,
	/// either because the user configured it or because it is one of the
	/// engine's own sidecar files.
	pub fn is_ignored_filename(&self, name: &str) -> bool {
		crate::manifest::SIDECAR_NAMES.contains(&name) || self.ignore_filenames.contains(name)
	}

	/// `true` if `name` ends with a configured ignored extension.
	pub fn is_ignored_extension(&self, name: &str) -> bool {
		self.ignore_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
	}

	/// `true` if a source folder named `name` should be skipped outright.
	pub fn is_ignored_folder(&self, name: &str) -> bool {
		self.ignore_folders.contains(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_toml() {
		let mut cfg = BackupConfig::default();
		cfg.base_path = "/mnt/data".into();
		cfg.dest = "/mnt/backup".into();
		cfg.folders = vec!["photos".to_string(), "docs".to_string()];
		cfg.ignore_folders.insert("@eaDir".to_string());
		cfg.ignore_extensions.insert(".tmp".to_string());

		let text = toml::to_string(&cfg).unwrap();
		let back: BackupConfig = toml::from_str(&text).unwrap();

		assert_eq!(back.base_path, cfg.base_path);
		assert_eq!(back.dest, cfg.dest);
		assert_eq!(back.folders, cfg.folders);
		assert_eq!(back.ignore_folders, cfg.ignore_folders);
		assert_eq!(back.ignore_extensions, cfg.ignore_extensions);
		assert_eq!(back.lazy_mode, cfg.lazy_mode);
		assert_eq!(back.auto_save_period_seconds, cfg.auto_save_period_seconds);
	}

	#[test]
	fn empty_version_is_generated() {
		let cfg = BackupConfig::default();
		let v = cfg.effective_version();
		assert_eq!(v.len(), 15);
		assert!(v.as_bytes()[8] == b'.');
	}

	#[test]
	fn explicit_version_is_kept_verbatim() {
		let mut cfg = BackupConfig::default();
		cfg.version = "7".to_string();
		assert_eq!(cfg.effective_version(), "7");
	}

	#[test]
	fn sidecar_files_are_always_ignored() {
		let cfg = BackupConfig::default();
		assert!(cfg.is_ignored_filename(".pbu"));
		assert!(cfg.is_ignored_filename("pbu-norehash"));
		assert!(!cfg.is_ignored_filename("photo.jpg"));
	}
}
