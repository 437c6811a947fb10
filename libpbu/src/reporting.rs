//! Decouples the planner from any concrete progress-rendering backend,
//! separating the core's diff/apply logic from an `indicatif`-backed
//! display, with a much smaller surface than a byte-level progress
//! tracker since this engine reports per-folder outcomes rather than
//! per-file tick counts.

use camino::Utf8Path;

/// What happened to a single folder during a backup run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderOutcome {
	/// The current snapshot already matches the source; nothing to do.
	UpToDate,
	/// No previous snapshot existed; the whole source tree was copied.
	InitialCopy,
	/// The previous snapshot was promoted in place (source was additive-only over it).
	Promoted { added: usize },
	/// Files were migrated between snapshots by content identity.
	IncrementalTransfer { matched: usize, copied: usize },
	/// The folder needs human review before it can participate in backup.
	NeedsReview,
}

/// The core calls this to announce folder-level status; nothing here is
/// tied to a rendering backend. The CLI crate supplies the concrete
/// implementation that draws progress bars.
pub trait Reporter {
	fn folder_started(&self, folder: &Utf8Path);
	fn status(&self, message: &str);
	fn folder_done(&self, folder: &Utf8Path, outcome: &FolderOutcome);
}

/// Discards everything. Used by the core's own tests and any caller
/// indifferent to progress.
pub struct NullReporter;

impl Reporter for NullReporter {
	fn folder_started(&self, _folder: &Utf8Path) {}
	fn status(&self, _message: &str) {}
	fn folder_done(&self, _folder: &Utf8Path, _outcome: &FolderOutcome) {}
}

/// Forwards everything to the `log` crate, for non-interactive runs.
pub struct LogReporter;

impl Reporter for LogReporter {
	fn folder_started(&self, folder: &Utf8Path) {
		log::info!("{folder}: starting");
	}

	fn status(&self, message: &str) {
		log::info!("{message}");
	}

	fn folder_done(&self, folder: &Utf8Path, outcome: &FolderOutcome) {
		match outcome {
			FolderOutcome::UpToDate => log::info!("{folder}: up to date"),
			FolderOutcome::InitialCopy => log::info!("{folder}: initial copy complete"),
			FolderOutcome::Promoted { added } => {
				log::info!("{folder}: promoted previous snapshot ({added} added)")
			}
			FolderOutcome::IncrementalTransfer { matched, copied } => log::info!(
				"{folder}: incremental transfer ({matched} matched, {copied} copied)"
			),
			FolderOutcome::NeedsReview => log::warn!("{folder}: needs review"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn null_reporter_accepts_every_outcome() {
		let r = NullReporter;
		let p = Utf8Path::new("folder");
		r.folder_started(p);
		r.status("scanning");
		for outcome in [
			FolderOutcome::UpToDate,
			FolderOutcome::InitialCopy,
			FolderOutcome::Promoted { added: 1 },
			FolderOutcome::IncrementalTransfer { matched: 1, copied: 1 },
			FolderOutcome::NeedsReview,
		] {
			r.folder_done(p, &outcome);
		}
	}
}
