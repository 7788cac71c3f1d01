//! File and input helpers

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::constants::MAX_FILTER_JSON_SIZE;

/// Expand `~` and make a path absolute against the working directory
///
/// ```
/// use tagquery::utils::file::expand_path;
///
/// assert_eq!(expand_path("/etc/tagquery.json").to_str(), Some("/etc/tagquery.json"));
/// assert!(expand_path("tagquery.json").is_absolute());
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Read command input from a file, or from stdin when no path (or `-`) is given
///
/// Input larger than the filter size limit is rejected without reading it all.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    let limit = MAX_FILTER_JSON_SIZE as u64 + 1;
    let mut content = String::new();

    match path {
        Some(p) if p != Path::new("-") => {
            let expanded = expand_path(&p.to_string_lossy());
            tracing::debug!(path = %expanded.display(), "Reading input file");
            fs::File::open(&expanded)
                .with_context(|| format!("Failed to open input file: {}", expanded.display()))?
                .take(limit)
                .read_to_string(&mut content)
                .with_context(|| format!("Failed to read input file: {}", expanded.display()))?;
        }
        _ => {
            tracing::debug!("Reading input from stdin");
            io::stdin()
                .lock()
                .take(limit)
                .read_to_string(&mut content)
                .context("Failed to read input from stdin")?;
        }
    }

    Ok(content)
}
