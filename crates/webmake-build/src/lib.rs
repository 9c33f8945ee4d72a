//! Build driver for webmake.
//!
//! Expands HTML entry files, compiles stylesheets and bundles JavaScript into
//! an output directory.

pub mod assets;
pub mod builder;
pub mod error;
pub mod version;

pub use builder::{BuildConfig, BuildResult, JsBundle, JsMode, StaticBuilder, Targets};
pub use error::{AssetError, BuildError};
pub use version::{resolve_version, versioned_path, VersionSource};
pub use webmake_html::MarkdownOptions;
