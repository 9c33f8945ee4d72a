//! Recoverable expansion errors.

use std::path::PathBuf;

/// Errors recorded while expanding a document.
///
/// None of these abort the expansion: each one is pushed into
/// [`Diagnostics`](crate::Diagnostics) and processing continues with the next
/// byte, directive or file.
#[derive(Debug, thiserror::Error)]
pub enum ExpandError {
    #[error("Include file not found: {}", .path.display())]
    IncludeNotFound { path: PathBuf },

    #[error("Unable to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Markdown file not found: {}", .path.display())]
    MarkdownNotFound { path: PathBuf },

    #[error("Unable to write html export {}: {source}", .path.display())]
    ExportUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Html export would overwrite its markdown source {}", .path.display())]
    ExportOverwritesSource { path: PathBuf },

    #[error("Unknown directive '{name}' in {}:{line}", .file.display())]
    UnknownDirective {
        name: String,
        file: PathBuf,
        line: usize,
    },

    #[error("Missing directive closing tag in {}:{line}", .file.display())]
    Unterminated { file: PathBuf, line: usize },

    #[error("Directive {field} exceeds {limit} bytes in {}:{line}", .file.display())]
    TooLong {
        field: &'static str,
        limit: usize,
        file: PathBuf,
        line: usize,
    },

    #[error("Include cycle: {} is already being expanded", .path.display())]
    IncludeCycle { path: PathBuf },
}
