//! Build settings and the error sink shared by every expansion frame.

use std::path::{Path, PathBuf};

use crate::error::ExpandError;

/// Read-only settings consulted while expanding.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Directory that relative include and markdown paths resolve against.
    /// An empty root leaves paths relative to the working directory.
    pub root: PathBuf,

    /// Active include filter (profile tag), if any
    pub html_filter: Option<String>,

    /// Version string emitted for the `«V»` token
    pub version: String,

    /// Substituted for a leading `@` in directive parameters
    pub html_prefix: String,

    /// Prepended to every markdown directive parameter
    pub md_prefix: String,
}

impl BuildContext {
    /// Create a context rooted at `root` with no filter, version or prefixes.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Resolve a directive path against the context root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() || self.root.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Whether an include carrying `filter` should be expanded.
    ///
    /// Unfiltered includes always expand. Filtered ones expand only when the
    /// tag equals the active filter, so with no active filter every tagged
    /// include is skipped.
    pub fn accepts(&self, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(tag) => self.html_filter.as_deref() == Some(tag),
        }
    }
}

/// Collects recoverable errors raised anywhere in an expansion.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ExpandError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep an error.
    pub fn record(&mut self, error: ExpandError) {
        tracing::error!("{}", error);
        self.errors.push(error);
    }

    /// Number of errors recorded so far.
    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ExpandError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ExpandError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_root() {
        let ctx = BuildContext::new("/project");

        assert_eq!(
            ctx.resolve("src/header.html"),
            PathBuf::from("/project/src/header.html")
        );
        assert_eq!(ctx.resolve("/abs/nav.html"), PathBuf::from("/abs/nav.html"));
    }

    #[test]
    fn empty_root_keeps_paths_untouched() {
        let ctx = BuildContext::default();

        assert_eq!(ctx.resolve("a/b.html"), PathBuf::from("a/b.html"));
    }

    #[test]
    fn filter_matching() {
        let mut ctx = BuildContext::default();

        assert!(ctx.accepts(None));
        assert!(!ctx.accepts(Some("test")));

        ctx.html_filter = Some("test".to_string());
        assert!(ctx.accepts(None));
        assert!(ctx.accepts(Some("test")));
        assert!(!ctx.accepts(Some("prod")));
    }

    #[test]
    fn counts_recorded_errors() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.record(ExpandError::IncludeNotFound {
            path: PathBuf::from("missing.html"),
        });
        diags.record(ExpandError::Unterminated {
            file: PathBuf::from("index.html"),
            line: 3,
        });

        assert_eq!(diags.count(), 2);
        assert!(matches!(
            diags.errors()[0],
            ExpandError::IncludeNotFound { .. }
        ));
    }
}
