//! Static asset builder.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use webmake_html::{BuildContext, CmarkRenderer, Diagnostics, Expander, MarkdownOptions};

use crate::assets::AssetPipeline;
use crate::error::{AssetError, BuildError};
use crate::version::versioned_path;

/// How JavaScript bundles are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsMode {
    /// Concatenate the sources
    #[default]
    Concat,
    /// Minify with the Closure Compiler
    Closure,
}

/// Which kinds of output to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub html: bool,
    pub css: bool,
    pub js: bool,
}

impl Targets {
    pub fn all() -> Self {
        Self {
            html: true,
            css: true,
            js: true,
        }
    }

    /// Build only the selected kinds, or everything when none is selected.
    pub fn select(html: bool, css: bool, js: bool) -> Self {
        if html || css || js {
            Self { html, css, js }
        } else {
            Self::all()
        }
    }
}

impl Default for Targets {
    fn default() -> Self {
        Self::all()
    }
}

/// A JavaScript bundle: one target built from ordered sources.
#[derive(Debug, Clone)]
pub struct JsBundle {
    /// Output file name, relative to the output directory
    pub target: PathBuf,

    /// Source files in bundle order
    pub sources: Vec<PathBuf>,
}

/// Configuration for a build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; relative paths below resolve against it
    pub root: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// HTML entry files
    pub html: Vec<PathBuf>,

    /// Stylesheet sources
    pub css: Vec<PathBuf>,

    /// JavaScript bundles
    pub js: Vec<JsBundle>,

    /// Substituted for a leading `@` in directive parameters
    pub html_prefix: String,

    /// Prepended to markdown directive parameters
    pub md_prefix: String,

    /// Build version, used for `«V»` and versioned CSS/JS names
    pub version: Option<String>,

    /// Active include filter
    pub html_filter: Option<String>,

    pub targets: Targets,

    pub js_mode: JsMode,

    /// Minify compiled CSS
    pub minify: bool,

    pub markdown: MarkdownOptions,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            output_dir: PathBuf::from("public"),
            html: vec![],
            css: vec![],
            js: vec![],
            html_prefix: String::new(),
            md_prefix: String::new(),
            version: None,
            html_filter: None,
            targets: Targets::all(),
            js_mode: JsMode::Concat,
            minify: true,
            markdown: MarkdownOptions::default(),
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of HTML files written
    pub html: usize,

    /// Number of JavaScript bundles written
    pub js: usize,

    /// Number of stylesheets written
    pub css: usize,

    /// Every recoverable error, in the order it occurred
    pub errors: Vec<AssetError>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Static asset builder.
pub struct StaticBuilder {
    config: BuildConfig,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Run the build.
    ///
    /// Recoverable problems are collected in [`BuildResult::errors`] and the
    /// build carries on, so partial output is always produced.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let output_dir = self.resolve(&self.config.output_dir);

        fs::create_dir_all(&output_dir).map_err(|e| BuildError::OutputDir {
            path: output_dir.clone(),
            source: e,
        })?;

        let mut errors = Vec::new();
        let targets = self.config.targets;

        let html = if targets.html {
            self.build_html(&output_dir, &mut errors)
        } else {
            0
        };

        let js = if targets.js {
            self.build_js(&output_dir, &mut errors)?
        } else {
            0
        };

        let css = if targets.css {
            self.build_css(&output_dir, &mut errors)
        } else {
            0
        };

        Ok(BuildResult {
            html,
            js,
            css,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.config.root.join(path)
    }

    fn context(&self) -> BuildContext {
        BuildContext {
            root: self.config.root.clone(),
            html_filter: self.config.html_filter.clone(),
            version: self.config.version.clone().unwrap_or_default(),
            html_prefix: self.config.html_prefix.clone(),
            md_prefix: self.config.md_prefix.clone(),
        }
    }

    /// Expand every HTML entry into `output_dir/<entry file name>`.
    fn build_html(&self, output_dir: &Path, errors: &mut Vec<AssetError>) -> usize {
        tracing::info!("Building HTML");

        let ctx = self.context();
        let mut expander =
            Expander::new(&ctx).with_renderer(CmarkRenderer::new(self.config.markdown));
        let mut diags = Diagnostics::new();
        let mut built = 0;

        for entry in &self.config.html {
            let Some(name) = entry.file_name() else {
                record(
                    errors,
                    AssetError::MissingSource {
                        path: entry.clone(),
                    },
                );
                continue;
            };
            let source = self.resolve(entry);
            if !source.is_file() {
                record(errors, AssetError::MissingSource { path: source });
                continue;
            }
            let target = output_dir.join(name);

            let file = match File::create(&target) {
                Ok(file) => file,
                Err(e) => {
                    record(
                        errors,
                        AssetError::Write {
                            path: target,
                            source: e,
                        },
                    );
                    continue;
                }
            };

            tracing::info!("  html: {}", entry.display());

            let mut out = BufWriter::new(file);
            let written = expander
                .expand_file(entry, &mut out, &mut diags)
                .and_then(|()| out.flush());

            errors.extend(take_errors(&mut diags));

            match written {
                Ok(()) => built += 1,
                Err(e) => record(
                    errors,
                    AssetError::Write {
                        path: target,
                        source: e,
                    },
                ),
            }
        }

        built
    }

    /// Write every JavaScript bundle to `output_dir`.
    fn build_js(
        &self,
        output_dir: &Path,
        errors: &mut Vec<AssetError>,
    ) -> Result<usize, BuildError> {
        if self.config.js.is_empty() {
            return Ok(0);
        }

        let jar = match self.config.js_mode {
            JsMode::Closure => Some(AssetPipeline::find_closure_compiler(&self.config.root)?),
            JsMode::Concat => None,
        };

        let mut built = 0;

        for bundle in &self.config.js {
            let target = output_dir.join(versioned_path(
                &bundle.target,
                self.config.version.as_deref(),
                None,
            ));
            let sources: Vec<PathBuf> = bundle.sources.iter().map(|s| self.resolve(s)).collect();

            tracing::info!("Building JS - {}", target.display());

            let failures: Vec<AssetError> = match &jar {
                Some(jar) => AssetPipeline::closure_compile(jar, &sources, &target)
                    .err()
                    .into_iter()
                    .collect(),
                None => AssetPipeline::concat_js(&sources, &target),
            };

            if failures.is_empty() {
                built += 1;
            }
            for failure in failures {
                record(errors, failure);
            }
        }

        Ok(built)
    }

    /// Compile every stylesheet to `output_dir/<stem>[_version].css`.
    fn build_css(&self, output_dir: &Path, errors: &mut Vec<AssetError>) -> usize {
        if self.config.css.is_empty() {
            return 0;
        }

        tracing::info!("Building CSS");

        let mut built = 0;

        for source in &self.config.css {
            let path = self.resolve(source);

            let css = match AssetPipeline::compile_css(&path, self.config.minify) {
                Ok(css) => css,
                Err(message) => {
                    record(errors, AssetError::Css { path, message });
                    continue;
                }
            };

            let name = versioned_path(
                Path::new(source.file_name().unwrap_or(source.as_os_str())),
                self.config.version.as_deref(),
                Some("css"),
            );
            let target = output_dir.join(name);

            match fs::write(&target, css) {
                Ok(()) => {
                    tracing::info!("  css: {}", target.display());
                    built += 1;
                }
                Err(e) => record(
                    errors,
                    AssetError::Write {
                        path: target,
                        source: e,
                    },
                ),
            }
        }

        built
    }
}

/// Log and keep a recoverable error.
fn record(errors: &mut Vec<AssetError>, error: AssetError) {
    tracing::error!("{}", error);
    errors.push(error);
}

/// Move expansion errors (already logged) out of the sink.
fn take_errors(diags: &mut Diagnostics) -> impl Iterator<Item = AssetError> {
    std::mem::take(diags)
        .into_errors()
        .into_iter()
        .map(AssetError::from)
}
