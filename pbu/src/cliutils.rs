use anyhow::Result;
use camino::Utf8Path;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use libpbu::reporting::{FolderOutcome, Reporter};
use std::cell::RefCell;
use std::time::Duration;

pub fn confirm(msg: &str) -> Result<bool> {
	Ok(Confirm::new().with_prompt(msg).interact()?)
}

static SPINNER_TICKS: &[&str] = &["⠙", "⠸", "⢰", "⣠", "⣄", "⡆", "⠇", "⠋", "✓"];

fn spinner_style() -> ProgressStyle {
	ProgressStyle::with_template("{spinner} {msg}").unwrap().tick_strings(SPINNER_TICKS)
}

/// Implements the core's [`Reporter`] trait with an `indicatif` spinner,
/// one per folder.
pub struct IndicatifReporter {
	current: RefCell<Option<ProgressBar>>,
}

impl IndicatifReporter {
	pub fn new() -> Self {
		Self { current: RefCell::new(None) }
	}
}

impl Default for IndicatifReporter {
	fn default() -> Self {
		Self::new()
	}
}

impl Reporter for IndicatifReporter {
	fn folder_started(&self, folder: &Utf8Path) {
		let bar = ProgressBar::new_spinner()
			.with_message(folder.to_string())
			.with_style(spinner_style());
		bar.enable_steady_tick(Duration::from_millis(80));
		*self.current.borrow_mut() = Some(bar);
	}

	fn status(&self, message: &str) {
		if let Some(bar) = self.current.borrow().as_ref() {
			bar.set_message(message.to_string());
		}
	}

	fn folder_done(&self, folder: &Utf8Path, outcome: &FolderOutcome) {
		let Some(bar) = self.current.borrow_mut().take() else { return };
		let line = describe(folder, outcome);
		if matches!(outcome, FolderOutcome::NeedsReview) {
			bar.abandon_with_message(style(line).yellow().to_string());
		} else {
			bar.finish_with_message(style(line).green().to_string());
		}
	}
}

fn describe(folder: &Utf8Path, outcome: &FolderOutcome) -> String {
	match outcome {
		FolderOutcome::UpToDate => format!("{folder}: up to date"),
		FolderOutcome::InitialCopy => format!("{folder}: initial copy complete"),
		FolderOutcome::Promoted { added } => format!("{folder}: promoted previous snapshot ({added} added)"),
		FolderOutcome::IncrementalTransfer { matched, copied } => {
			format!("{folder}: incremental transfer ({matched} matched, {copied} copied)")
		}
		FolderOutcome::NeedsReview => format!("{folder}: needs review"),
	}
}
