//! Component G: the snapshot planner & executor.
//!
//! `backup_one` runs the per-folder pipeline described in the design notes:
//! validate source and any existing snapshots, then choose among initial
//! copy, identity (already up to date), promotion (source is additive-only
//! over the previous snapshot), or incremental transfer by content identity.

use crate::builder;
use crate::compare::{add_only, equal_mod_time};
use crate::config::BackupConfig;
use crate::error::{IoResultExt, PbuError, Result};
use crate::fs_util;
use crate::manifest::{Manifest, ManifestEntry, MANIFEST_FILE, MANIFEST_OLD_FILE};
use crate::reporting::{FolderOutcome, Reporter};
use crate::validator;
use crate::version::{latest_version, natural_cmp};
use camino::Utf8Path;
use std::cmp::Ordering;

/// Runs the full per-folder backup pipeline for the source folder named
/// `folder_name` (resolved under `cfg.base_path`).
pub fn backup_one(folder_name: &str, cfg: &BackupConfig, reporter: &dyn Reporter) -> Result<FolderOutcome> {
	let src = cfg.base_path.join(folder_name);
	reporter.folder_started(&src);

	let pbu_tree = cfg.dest.join(format!("{folder_name}.pbu"));
	let cur_version = cfg.effective_version();
	let dst_cur = pbu_tree.join(format!("{folder_name}.v{cur_version}"));

	let existing = existing_snapshot_dirs(&pbu_tree)?;
	let prev = latest_version(folder_name, existing.iter().map(String::as_str))
		.map(|(dir, ver)| (pbu_tree.join(dir), ver.to_string()));

	if let Some((_, prev_ver)) = &prev {
		if natural_cmp(&cur_version, prev_ver) == Ordering::Less {
			return Err(PbuError::VersionDecreasing {
				folder: folder_name.to_string(),
				new_version: cur_version,
				latest_version: prev_ver.clone(),
			});
		}
	}

	let outcome = run_pipeline(&src, &dst_cur, prev.as_ref().map(|(dir, _)| dir.as_path()), cfg)?;
	reporter.folder_done(&src, &outcome);
	Ok(outcome)
}

fn run_pipeline(
	src: &Utf8Path,
	dst_cur: &Utf8Path,
	dst_prev: Option<&Utf8Path>,
	cfg: &BackupConfig,
) -> Result<FolderOutcome> {
	// 1. Validate source.
	if validator::check(src, cfg)? {
		return Ok(FolderOutcome::NeedsReview);
	}

	// 2. Current snapshot already exists.
	if dst_cur.is_dir() {
		if validator::check(dst_cur, cfg)? {
			return Ok(FolderOutcome::NeedsReview);
		}
		let src_manifest = Manifest::read_file(&src.join(MANIFEST_FILE))?;
		let cur_manifest = Manifest::read_file(&dst_cur.join(MANIFEST_FILE))?;
		if equal_mod_time(&src_manifest, &cur_manifest) {
			return Ok(FolderOutcome::UpToDate);
		}
		return Err(PbuError::InternalInvariant {
			detail: format!(
				"{dst_cur}: destination snapshot diverges from source while sharing its version; use a new version"
			),
		});
	}

	let Some(dst_prev) = dst_prev else {
		// 3. No previous snapshot: initial copy.
		fs_util::copy_tree(src, dst_cur)?;
		return Ok(FolderOutcome::InitialCopy);
	};

	// 4. Previous snapshot exists, current does not.
	if validator::check(dst_prev, cfg)? {
		return Ok(FolderOutcome::NeedsReview);
	}

	let src_manifest = Manifest::read_file(&src.join(MANIFEST_FILE))?;
	let prev_manifest = Manifest::read_file(&dst_prev.join(MANIFEST_FILE))?;

	if let Some(added) = add_only(&prev_manifest, &src_manifest) {
		promote(dst_prev, dst_cur, src, &src_manifest, &added)
	} else {
		incremental_transfer(dst_prev, dst_cur, src, &src_manifest, &prev_manifest, cfg)
	}
}

fn existing_snapshot_dirs(pbu_tree: &Utf8Path) -> Result<Vec<String>> {
	if !pbu_tree.is_dir() {
		return Ok(Vec::new());
	}

	let mut out = Vec::new();
	for entry in std::fs::read_dir(pbu_tree).pbu_ctx(pbu_tree)? {
		let entry = entry.pbu_ctx(pbu_tree)?;
		if entry.file_type().pbu_ctx(pbu_tree)?.is_dir() {
			if let Some(name) = entry.file_name().to_str() {
				out.push(name.to_string());
			}
		}
	}
	Ok(out)
}

/// 4a. Source is additive-only over the previous snapshot: rename the whole
/// previous snapshot tree into place and copy in the handful of new files.
fn promote(
	dst_prev: &Utf8Path,
	dst_cur: &Utf8Path,
	src: &Utf8Path,
	src_manifest: &Manifest,
	added: &[usize],
) -> Result<FolderOutcome> {
	fs_util::rename_or_copy(dst_prev, dst_cur)?;

	let mut manifest = Manifest::read_file(&dst_cur.join(MANIFEST_FILE))?;
	for &idx in added {
		let entry = &src_manifest.entries[idx];
		fs_util::copy_file_preserving(&src.join(&entry.path), &dst_cur.join(&entry.path))?;
		manifest.entries.push(entry.clone());
	}
	manifest.sort();
	manifest.write_file(&dst_cur.join(MANIFEST_FILE))?;

	Ok(FolderOutcome::Promoted { added: added.len() })
}

/// 4b. Migrates files between snapshots by content identity, one pass over
/// both sorted manifests.
fn incremental_transfer(
	dst_prev: &Utf8Path,
	dst_cur: &Utf8Path,
	src: &Utf8Path,
	src_manifest: &Manifest,
	prev_manifest: &Manifest,
	cfg: &BackupConfig,
) -> Result<FolderOutcome> {
	let mut residual: Vec<Option<ManifestEntry>> =
		prev_manifest.entries.iter().cloned().map(Some).collect();
	let mut cur_entries = Vec::with_capacity(src_manifest.entries.len());
	let mut j = 0;
	let mut matched = 0;
	let mut copied = 0;

	for src_entry in &src_manifest.entries {
		let id = src_entry.identity_key();
		while j < residual.len()
			&& residual[j]
				.as_ref()
				.map(|e| e.identity_key() < id)
				.unwrap_or(true)
		{
			j += 1;
		}

		let matched_here = j < residual.len()
			&& residual[j].as_ref().map(|e| e.identity_key() == id).unwrap_or(false);

		if matched_here {
			let prev_entry = residual[j].take().expect("just checked Some");
			fs_util::rename_or_copy(&dst_prev.join(&prev_entry.path), &dst_cur.join(&src_entry.path))?;
			let mut new_entry = src_entry.clone();
			new_entry.mtime = prev_entry.mtime;
			cur_entries.push(new_entry);
			matched += 1;
		} else {
			fs_util::copy_file_preserving(&src.join(&src_entry.path), &dst_cur.join(&src_entry.path))?;
			cur_entries.push(src_entry.clone());
			copied += 1;
		}
	}

	let mut cur_manifest = Manifest::new(cur_entries);
	cur_manifest.sort();
	cur_manifest.write_file(&dst_cur.join(MANIFEST_FILE))?;

	let residual_entries: Vec<_> = residual.into_iter().flatten().collect();
	if residual_entries.is_empty() {
		log::warn!(
			"{dst_prev}: incremental transfer consumed every prior entry; an add-only promotion should have been available"
		);
	}

	fs_util::rename_sibling(dst_prev, MANIFEST_FILE, MANIFEST_OLD_FILE)?;
	let mut residual_manifest = Manifest::new(residual_entries);
	residual_manifest.sort();
	residual_manifest.write_file(&dst_prev.join(MANIFEST_FILE))?;

	fs_util::remove_empty_dirs(dst_prev, true)?;

	if cfg.debug_mode && validator::check(dst_prev, cfg)? {
		return Ok(FolderOutcome::NeedsReview);
	}

	Ok(FolderOutcome::IncrementalTransfer { matched, copied })
}
