//! Small filesystem helpers shared by the builder, validator, and planner.
//!
//! None of this is part of the core's conceptual model (§1 excludes tree
//! walk libraries and the like from "the core"); it's plumbing the other
//! components lean on.

use crate::error::{IoResultExt, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Ensures `path`'s parent directory exists.
pub fn ensure_parent(path: &Utf8Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).pbu_ctx(parent)?;
	}
	Ok(())
}

/// Copies a single file from `src` to `dst`, preserving mtime, creating
/// `dst`'s parent directories as needed.
pub fn copy_file_preserving(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
	ensure_parent(dst)?;
	fs::copy(src, dst).pbu_ctx(src)?;
	let mtime = fs::metadata(src).pbu_ctx(src)?.modified().pbu_ctx(src)?;
	filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime)).pbu_ctx(dst)?;
	Ok(())
}

/// Recursively copies `src` to `dst`, preserving metadata. Symlinks are
/// skipped rather than followed or copied, with a single warning per call,
/// matching the scanner's treatment of the same non-goal.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
	let mut warned_symlink = false;
	copy_tree_inner(src, dst, &mut warned_symlink)
}

fn copy_tree_inner(src: &Utf8Path, dst: &Utf8Path, warned_symlink: &mut bool) -> Result<()> {
	let meta = fs::symlink_metadata(src).pbu_ctx(src)?;
	if meta.is_symlink() {
		if !*warned_symlink {
			log::warn!("symlink at {src} is not supported and was skipped");
			*warned_symlink = true;
		}
		return Ok(());
	}

	if meta.is_dir() {
		fs::create_dir_all(dst).pbu_ctx(dst)?;
		for entry in fs::read_dir(src).pbu_ctx(src)? {
			let entry = entry.pbu_ctx(src)?;
			let name = entry.file_name();
			let Some(name) = name.to_str() else { continue };
			copy_tree_inner(&src.join(name), &dst.join(name), warned_symlink)?;
		}
		Ok(())
	} else {
		copy_file_preserving(src, dst)
	}
}

/// Renames `src` to `dst`, falling back to copy-then-remove when the two
/// paths live on different filesystems (`EXDEV`), per the cross-device note
/// in the design notes.
pub fn rename_or_copy(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
	ensure_parent(dst)?;
	match fs::rename(src, dst) {
		Ok(()) => Ok(()),
		Err(e) if is_cross_device(&e) => {
			log::warn!("cross-device rename from {src} to {dst}, falling back to copy");
			if fs::metadata(src).pbu_ctx(src)?.is_dir() {
				copy_tree(src, dst)?;
				fs::remove_dir_all(src).pbu_ctx(src)?;
			} else {
				copy_file_preserving(src, dst)?;
				fs::remove_file(src).pbu_ctx(src)?;
			}
			Ok(())
		}
		Err(e) => Err(crate::error::PbuError::from_io(src, e)),
	}
}

fn is_cross_device(e: &std::io::Error) -> bool {
	e.raw_os_error() == Some(libc_exdev())
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
	18 // EXDEV on Linux, macOS, and *BSD
}

#[cfg(not(unix))]
fn libc_exdev() -> i32 {
	17 // ERROR_NOT_SAME_DEVICE-adjacent placeholder; Windows rarely hits this path
}

/// Removes `dir` and any directories under it that end up empty, without
/// removing `dir` itself if `keep_root` is set.
pub fn remove_empty_dirs(dir: &Utf8Path, keep_root: bool) -> Result<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	let mut any_left = false;
	for entry in fs::read_dir(dir).pbu_ctx(dir)? {
		let entry = entry.pbu_ctx(dir)?;
		let name = entry.file_name();
		let Some(name) = name.to_str() else {
			any_left = true;
			continue;
		};
		let child = dir.join(name);
		if entry.file_type().pbu_ctx(dir)?.is_dir() {
			remove_empty_dirs(&child, false)?;
			if child.is_dir() {
				any_left = true;
			}
		} else {
			any_left = true;
		}
	}

	if !any_left && !keep_root {
		fs::remove_dir(dir).pbu_ctx(dir)?;
	}

	Ok(())
}

/// Atomically writes `contents` to `path` by writing to `tmp_path` first and
/// renaming over it.
pub fn write_atomic(path: &Utf8Path, tmp_path: &Utf8Path, contents: &str) -> Result<()> {
	fs::write(tmp_path, contents).pbu_ctx(tmp_path)?;
	fs::rename(tmp_path, path).pbu_ctx(path)?;
	Ok(())
}

/// Renames `old_name` to `new_name`, both siblings of `parent`.
pub fn rename_sibling(parent: &Utf8Path, old_name: &str, new_name: &str) -> Result<Utf8PathBuf> {
	let old = parent.join(old_name);
	let new = parent.join(new_name);
	fs::rename(&old, &new).pbu_ctx(&old)?;
	Ok(new)
}
