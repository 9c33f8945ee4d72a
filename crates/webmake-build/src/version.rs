//! Build version resolution and versioned target names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::BuildError;

/// Longest version accepted from the command line.
pub const MAX_VERSION_LEN: usize = 12;

/// Where the build version may come from, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct VersionSource {
    /// Fixed version from the configuration file
    pub version: Option<String>,

    /// Derive the version from the current time
    pub autoversion: bool,

    /// File to scan for a version line
    pub file: Option<PathBuf>,

    /// Prefix identifying the version line in `file`
    pub prefix: Option<String>,
}

/// Resolve the build version.
///
/// The command-line value wins (cut to [`MAX_VERSION_LEN`] characters), then
/// the configured version, then `autoversion` (Unix time in lowercase hex),
/// then the first line of the version file starting with the prefix.
pub fn resolve_version(
    source: &VersionSource,
    cli: Option<&str>,
) -> Result<Option<String>, BuildError> {
    if let Some(version) = cli {
        return Ok(Some(version.chars().take(MAX_VERSION_LEN).collect()));
    }

    if let Some(version) = &source.version {
        return Ok(Some(version.clone()));
    }

    if source.autoversion {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        return Ok(Some(format!("{:x}", secs)));
    }

    let (Some(file), Some(prefix)) = (&source.file, &source.prefix) else {
        return Ok(None);
    };

    let content = fs::read_to_string(file).map_err(|e| BuildError::VersionFile {
        path: file.clone(),
        source: e,
    })?;

    let version = content
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|rest| rest.trim().to_string());

    if version.is_none() {
        tracing::warn!(
            "No line starting with '{}' in {}",
            prefix,
            file.display()
        );
    }

    Ok(version)
}

/// Name a build target after the version.
///
/// `app.js` becomes `app_1.2.js`. When `ext` is given it replaces the
/// original extension (`style.scss` with `css` becomes `style_1.2.css`).
/// Without a version only the extension is changed.
pub fn versioned_path(target: &Path, version: Option<&str>, ext: Option<&str>) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ext = ext
        .map(str::to_string)
        .or_else(|| target.extension().map(|e| e.to_string_lossy().into_owned()));

    let mut name = match version {
        Some(version) => format!("{stem}_{version}"),
        None => stem,
    };
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&ext);
    }

    target.with_file_name(name)
}
