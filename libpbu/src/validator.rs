//! Component F: the folder validator.
//!
//! `check(folder, cfg)` decides whether a folder on disk still matches its
//! manifest, handling the pending-review fast path, the missing-manifest
//! cases (fresh source vs. broken snapshot), the trust-marker fast path, and
//! full revalidation with optional lazy-check auto-promotion.

use crate::builder;
use crate::compare::{diff, equal_mod_time, DiffCounts, DiffEvent};
use crate::config::BackupConfig;
use crate::error::{IoResultExt, PbuError, Result};
use crate::fs_util;
use crate::manifest::{
	Manifest, MANIFEST_DIFF_FILE, MANIFEST_FILE, MANIFEST_NEW_FILE, MANIFEST_OLD_FILE,
	NOREHASH_MARKER,
};
use camino::Utf8Path;

/// Runs the validator's decision tree against `folder`. Returns `true` if
/// the folder needs human review before it can participate in a backup.
pub fn check(folder: &Utf8Path, cfg: &BackupConfig) -> Result<bool> {
	if folder.join(MANIFEST_NEW_FILE).is_file() {
		return Ok(true);
	}

	let manifest_path = folder.join(MANIFEST_FILE);
	if !manifest_path.is_file() {
		return check_missing_manifest(folder, cfg);
	}

	let meta = std::fs::metadata(&manifest_path).pbu_ctx(&manifest_path)?;
	if meta.len() == 0 {
		builder::build(folder, None, cfg, Some(&manifest_path))?;
		return Ok(false);
	}

	let norehash_path = folder.join(NOREHASH_MARKER);
	if norehash_path.is_file() {
		if !cfg.debug_mode {
			std::fs::remove_file(&norehash_path).pbu_ctx(&norehash_path)?;
		}
		return Ok(false);
	}

	revalidate(folder, &manifest_path, cfg)
}

fn check_missing_manifest(folder: &Utf8Path, cfg: &BackupConfig) -> Result<bool> {
	let looks_like_snapshot = folder
		.parent()
		.and_then(|p| p.file_name())
		.map(|name| name.ends_with(".pbu"))
		.unwrap_or(false);

	if !looks_like_snapshot {
		let manifest_path = folder.join(MANIFEST_FILE);
		builder::build(folder, None, cfg, Some(&manifest_path))?;
		return Ok(false);
	}

	let parent = folder.parent().expect("checked above");
	let name = folder.file_name().ok_or_else(|| PbuError::InternalInvariant {
		detail: format!("folder {folder} has no file name component"),
	})?;
	let broken_name = format!("{name}.broken");
	let broken = fs_util::rename_sibling(parent, name, &broken_name)?;
	builder::build(&broken, None, cfg, Some(&broken.join(MANIFEST_NEW_FILE)))?;
	Ok(true)
}

fn revalidate(folder: &Utf8Path, manifest_path: &Utf8Path, cfg: &BackupConfig) -> Result<bool> {
	let prior = Manifest::read_file(manifest_path)?;
	let rebuilt = builder::build(folder, Some(&prior), cfg, None)?;
	builder::clear_auto_save(folder)?;

	if equal_mod_time(&prior, &rebuilt) {
		rebuilt.write_file(manifest_path)?;
		return Ok(false);
	}

	let new_path = folder.join(MANIFEST_NEW_FILE);
	rebuilt.write_file(&new_path)?;

	let (events, counts) = diff(&prior, &rebuilt);
	let diff_path = folder.join(MANIFEST_DIFF_FILE);
	std::fs::write(&diff_path, render_diff(&events, &counts)).pbu_ctx(&diff_path)?;
	log::info!(
		"{folder}: {} deleted, {} changed, {} new, {} moved",
		counts.deleted,
		counts.changed,
		counts.new,
		counts.moved
	);

	if cfg.lazy_check && counts.deleted == 0 && counts.changed == 0 {
		promote_new_manifest(folder)?;
	}

	Ok(true)
}

fn promote_new_manifest(folder: &Utf8Path) -> Result<()> {
	let old_path = folder.join(MANIFEST_OLD_FILE);
	if old_path.exists() {
		std::fs::remove_file(&old_path).pbu_ctx(&old_path)?;
	}
	fs_util::rename_sibling(folder, MANIFEST_FILE, MANIFEST_OLD_FILE)?;
	fs_util::rename_sibling(folder, MANIFEST_NEW_FILE, MANIFEST_FILE)?;
	Ok(())
}

fn render_diff(events: &[DiffEvent], counts: &DiffCounts) -> String {
	let mut out = format!(
		"{} deleted, {} changed, {} new, {} moved\n",
		counts.deleted, counts.changed, counts.new, counts.moved
	);
	for event in events {
		out.push_str(&event.to_string());
		out.push('\n');
	}
	out
}
