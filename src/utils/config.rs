use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;
use walkdir::WalkDir;

/// File name of the corpus database searched for when nothing is configured.
pub const DEFAULT_DB_FILE: &str = "danbooru2023.db";

const DB_PATH_KEY: &str = "BOORU_DB_PATH";
const MIRRORED_KEY: &str = "BOORU_DB_MIRRORED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Load the whole store into memory at open.
    pub mirrored: bool,
}

/// Resolves where the store lives.
/// Checks .env first, then searches the filesystem and records the result.
pub fn get_store_config() -> Result<StoreConfig> {
    let env_path = Path::new(".env");

    if env_path.exists() {
        if let Ok(config) = load_from_env(env_path) {
            info!("Loaded store config from .env");
            return Ok(config);
        }
    }

    info!("No store configured in .env. Searching filesystem...");
    let db_path = find_file(DEFAULT_DB_FILE, 5)?;
    info!("Found store: {:?}", db_path);

    let config = StoreConfig {
        db_path,
        mirrored: false,
    };
    save_to_env(env_path, &config)?;
    info!("Saved store path to .env");

    Ok(config)
}

fn find_file(filename: &str, max_depth: usize) -> Result<PathBuf> {
    let root = std::env::current_dir()?;

    // The current tree first, then the parent's, for runs from a subdirectory.
    for dir in std::iter::once(root.as_path()).chain(root.parent()) {
        let found = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name() == filename);
        if let Some(entry) = found {
            return Ok(entry.path().to_path_buf());
        }
    }

    Err(anyhow!("Could not find file '{}' in nearby directories.", filename))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn load_from_env(path: &Path) -> Result<StoreConfig> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut db_path = None;
    let mut mirrored = false;

    for line in reader.lines() {
        let line = line?;
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                DB_PATH_KEY => db_path = Some(PathBuf::from(value.trim())),
                MIRRORED_KEY => mirrored = parse_bool(value.trim()),
                _ => {}
            }
        }
    }

    let db_path = db_path.ok_or_else(|| anyhow!("{} missing from .env", DB_PATH_KEY))?;
    Ok(StoreConfig { db_path, mirrored })
}

fn save_to_env(path: &Path, config: &StoreConfig) -> Result<()> {
    let mut file = File::create(path).context("Failed to create .env file")?;
    writeln!(file, "{}={}", DB_PATH_KEY, config.db_path.display())?;
    writeln!(file, "{}={}", MIRRORED_KEY, config.mirrored)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_env() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        let config = StoreConfig {
            db_path: PathBuf::from("/data/danbooru2023.db"),
            mirrored: true,
        };

        save_to_env(&path, &config)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("BOORU_DB_PATH=/data/danbooru2023.db"));
        assert!(content.contains("BOORU_DB_MIRRORED=true"));

        assert_eq!(load_from_env(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_env_without_path_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".env");
        fs::write(&path, "BOORU_DB_MIRRORED=1\nOTHER=x\n")?;
        assert!(load_from_env(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_mirrored_flag_parsing() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }
}
