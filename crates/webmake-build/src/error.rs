//! Build errors.

use std::path::PathBuf;

use webmake_html::ExpandError;

/// Failures that stop the build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read version file {}: {source}", .path.display())]
    VersionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Minifier not available: {0}")]
    MinifierNotFound(String),
}

/// Failures that are counted and reported, after which the build moves on.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    Html(#[from] ExpandError),

    #[error("Unable to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file not found: {}", .path.display())]
    MissingSource { path: PathBuf },

    #[error("Failed to compile {}: {message}", .path.display())]
    Css { path: PathBuf, message: String },

    #[error("Closure Compiler failed for {}: {message}", .target.display())]
    Minifier { target: PathBuf, message: String },
}
