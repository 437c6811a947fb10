use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use libpbu::compare::diff as compute_diff;
use libpbu::manifest::Manifest;
use libpbu::planner::backup_one;
use libpbu::reporting::FolderOutcome;
use libpbu::{validator, verify, BackupConfig};

mod cliutils;
mod config;

#[derive(Parser, Debug)]
#[command(version, about = "Versioned, content-addressed incremental folder backup tool.")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
	/// Path to a TOML configuration file
	#[arg(short, long, global = true)]
	config: Option<Utf8PathBuf>,
	/// Increase log verbosity (-v, -vv)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,
	/// Suppress all log output below warnings
	#[arg(short, long, global = true)]
	quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Run the planner over the configured source folders
	Backup {
		#[arg(long)]
		base_path: Option<Utf8PathBuf>,
		#[arg(long)]
		dest: Option<Utf8PathBuf>,
		#[arg(long)]
		version: Option<String>,
		/// Source folder to back up; repeatable. Default: every subfolder of
		/// base-path that already contains a `.pbu`
		#[arg(long = "folder")]
		folders: Vec<String>,
		/// Skip source folders until this name is reached
		#[arg(long)]
		start: Option<String>,
		#[arg(long)]
		lazy: Option<bool>,
		#[arg(long = "lazy-check")]
		lazy_check: Option<bool>,
		#[arg(long)]
		debug: bool,
		/// Don't prompt before continuing past a folder that needs review
		#[arg(short, long, default_value_t = false)]
		force: bool,
	},
	/// Run the folder validator over a single folder without backing it up
	Check { path: Utf8PathBuf },
	/// Diff two folders (or two .pbu files) and print a change report
	Diff { a: Utf8PathBuf, b: Utf8PathBuf },
	/// Rehash a folder against its manifest and report mismatches
	Verify { path: Utf8PathBuf },
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose, cli.quiet);

	let mut cfg = config::load(cli.config.as_ref())?;

	match &cli.command {
		Commands::Backup { base_path, dest, version, folders, start, lazy, lazy_check, debug, force } => {
			if let Some(v) = base_path {
				cfg.base_path = v.clone();
			}
			if let Some(v) = dest {
				cfg.dest = v.clone();
			}
			if let Some(v) = version {
				cfg.version = v.clone();
			}
			if !folders.is_empty() {
				cfg.folders = folders.clone();
			}
			if start.is_some() {
				cfg.start = start.clone();
			}
			if let Some(v) = lazy {
				cfg.lazy_mode = *v;
			}
			if let Some(v) = lazy_check {
				cfg.lazy_check = *v;
			}
			if *debug {
				cfg.debug_mode = true;
			}

			run_backup(&cfg, *force)
		}
		Commands::Check { path } => run_check(path, &cfg),
		Commands::Diff { a, b } => run_diff(a, b),
		Commands::Verify { path } => run_verify(path),
	}
}

fn init_logging(verbose: u8, quiet: bool) {
	let level = if quiet {
		log::LevelFilter::Warn
	} else {
		match verbose {
			0 => log::LevelFilter::Info,
			1 => log::LevelFilter::Debug,
			_ => log::LevelFilter::Trace,
		}
	};
	env_logger::Builder::new().filter_level(level).format_timestamp(None).init();
}

fn run_backup(cfg: &BackupConfig, force: bool) -> Result<()> {
	let reporter = cliutils::IndicatifReporter::new();
	let folders = resolve_folders(cfg)?;

	let mut reached = cfg.start.is_none();
	let mut needed_review = Vec::new();

	for folder in &folders {
		if !reached {
			if Some(folder) == cfg.start.as_ref() {
				reached = true;
			} else {
				continue;
			}
		}
		if cfg.is_ignored_folder(folder) {
			continue;
		}

		let outcome = backup_one(folder, cfg, &reporter).with_context(|| format!("backing up folder {folder}"))?;
		if matches!(outcome, FolderOutcome::NeedsReview) {
			needed_review.push(folder.clone());
			if !force && !cliutils::confirm(&format!("{folder} needs review; continue with remaining folders?"))? {
				bail!("aborted after {folder} needed review");
			}
		}
	}

	if needed_review.is_empty() {
		Ok(())
	} else {
		bail!("{} folder(s) need review: {}", needed_review.len(), needed_review.join(", "))
	}
}

fn resolve_folders(cfg: &BackupConfig) -> Result<Vec<String>> {
	if !cfg.folders.is_empty() {
		return Ok(cfg.folders.clone());
	}

	let mut out = Vec::new();
	let read = std::fs::read_dir(&cfg.base_path).with_context(|| format!("reading base path {}", cfg.base_path))?;
	for entry in read {
		let entry = entry?;
		if !entry.file_type()?.is_dir() {
			continue;
		}
		let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
		if entry.path().join(libpbu::manifest::MANIFEST_FILE).is_file() {
			out.push(name);
		}
	}
	out.sort();
	Ok(out)
}

fn run_check(path: &Utf8PathBuf, cfg: &BackupConfig) -> Result<()> {
	let needs_review = validator::check(path, cfg).with_context(|| format!("checking {path}"))?;
	if needs_review {
		bail!("{path}: needs review");
	}
	println!("{path}: clean");
	Ok(())
}

fn run_diff(a: &Utf8PathBuf, b: &Utf8PathBuf) -> Result<()> {
	let manifest_a = load_manifest_or_build(a)?;
	let manifest_b = load_manifest_or_build(b)?;
	let (events, counts) = compute_diff(&manifest_a, &manifest_b);

	println!("{} deleted, {} changed, {} new, {} moved", counts.deleted, counts.changed, counts.new, counts.moved);
	for event in &events {
		println!("{event}");
	}
	Ok(())
}

fn load_manifest_or_build(path: &Utf8PathBuf) -> Result<Manifest> {
	if path.is_file() {
		Manifest::read_file(path).with_context(|| format!("reading manifest {path}"))
	} else {
		libpbu::builder::build(path, None, &BackupConfig::default(), None)
			.with_context(|| format!("building manifest for {path}"))
	}
}

fn run_verify(path: &Utf8PathBuf) -> Result<()> {
	let mismatches = verify::verify(path).with_context(|| format!("verifying {path}"))?;
	if mismatches.is_empty() {
		println!("{path}: OK");
		return Ok(());
	}
	for mismatch in &mismatches {
		println!("{mismatch}");
	}
	bail!("{} mismatch(es) found in {path}", mismatches.len())
}
