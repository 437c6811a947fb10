use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use libpbu::BackupConfig;
use serde::Deserialize;

/// On-disk shape of the config file: a single `[pbu]` table holding every
/// `BackupConfig` field.
#[derive(Deserialize)]
struct ConfigFile {
	pbu: BackupConfig,
}

/// Loads a [`BackupConfig`] from an optional TOML file's `[pbu]` table. With
/// no file, starts from `BackupConfig::default()`; `clap` flags are layered
/// on top by the caller afterward, so flags always win over the file, which
/// always wins over built-in defaults.
pub fn load(path: Option<&Utf8PathBuf>) -> Result<BackupConfig> {
	match path {
		Some(p) => {
			let text = std::fs::read_to_string(p).with_context(|| format!("reading config file {p}"))?;
			let file: ConfigFile = toml::from_str(&text).with_context(|| format!("parsing config file {p}"))?;
			Ok(file.pbu)
		}
		None => Ok(BackupConfig::default()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn loads_fields_from_the_pbu_table() {
		let dir = tempfile::tempdir().unwrap();
		let path = Utf8PathBuf::from_path_buf(dir.path().join("pbu.toml")).unwrap();
		std::fs::write(
			&path,
			r#"
			[pbu]
			base_path = "/mnt/data"
			dest = "/mnt/backup"
			folders = ["photos"]
			lazy_mode = false
			"#,
		)
		.unwrap();

		let cfg = load(Some(&path)).unwrap();
		assert_eq!(cfg.base_path, "/mnt/data");
		assert_eq!(cfg.dest, "/mnt/backup");
		assert_eq!(cfg.folders, vec!["photos".to_string()]);
		assert!(!cfg.lazy_mode);
	}
}
