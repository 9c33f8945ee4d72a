//! Build command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use webmake_build::{
    resolve_version, BuildConfig, JsBundle, JsMode, MarkdownOptions, StaticBuilder, Targets,
    VersionSource,
};

/// Configuration file structure (webmake.toml).
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    /// HTML entry files
    #[serde(default)]
    html: Vec<String>,
    /// Stylesheet sources
    #[serde(default)]
    css: Vec<String>,
    #[serde(default)]
    js: Vec<JsBundleConfig>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    markdown: MarkdownSettings,
}

#[derive(Debug, Deserialize)]
struct JsBundleConfig {
    target: String,
    #[serde(default)]
    sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Settings {
    out: Option<String>,
    #[serde(default)]
    html_prefix: String,
    #[serde(default)]
    md_prefix: String,
    version: Option<String>,
    #[serde(default)]
    autoversion: bool,
    version_file: Option<String>,
    version_prefix: Option<String>,
    #[serde(default = "default_true")]
    minify: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            out: None,
            html_prefix: String::new(),
            md_prefix: String::new(),
            version: None,
            autoversion: false,
            version_file: None,
            version_prefix: None,
            minify: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarkdownSettings {
    #[serde(default = "default_true")]
    hard_wrap: bool,
    #[serde(default = "default_true")]
    escape_html: bool,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        Self {
            hard_wrap: true,
            escape_html: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Command-line overrides for a build.
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Build HTML; a non-empty value is the active include filter
    pub html: Option<String>,
    /// Build JS with the given mode
    pub js: Option<JsMode>,
    pub css: bool,
    pub out: Option<PathBuf>,
    pub asset_version: Option<String>,
}

/// Load and parse the configuration file.
fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        bail!("Missing {} from {}", file_name(path), root_of(path).display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Directory holding the config file; relative paths resolve against it.
fn root_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Combine the config file and command-line overrides.
fn build_config(file: ConfigFile, root: &Path, options: BuildOptions) -> Result<BuildConfig> {
    let settings = file.settings;

    let Some(output_dir) = options.out.or_else(|| settings.out.map(PathBuf::from)) else {
        bail!("Output directory has not been specified in [settings] out or --out");
    };

    let version = resolve_version(
        &VersionSource {
            version: settings.version,
            autoversion: settings.autoversion,
            file: settings.version_file.map(|f| root.join(f)),
            prefix: settings.version_prefix,
        },
        options.asset_version.as_deref(),
    )?;

    if let Some(version) = &version {
        tracing::info!("Using '{}' as file version postfix", version);
    }

    let targets = Targets::select(options.html.is_some(), options.css, options.js.is_some());

    Ok(BuildConfig {
        root: root.to_path_buf(),
        output_dir,
        html: file.html.into_iter().map(PathBuf::from).collect(),
        css: file.css.into_iter().map(PathBuf::from).collect(),
        js: file
            .js
            .into_iter()
            .map(|bundle| JsBundle {
                target: PathBuf::from(bundle.target),
                sources: bundle.sources.into_iter().map(PathBuf::from).collect(),
            })
            .collect(),
        html_prefix: settings.html_prefix,
        md_prefix: settings.md_prefix,
        version,
        html_filter: options.html.filter(|f| !f.is_empty()),
        targets,
        js_mode: options.js.unwrap_or_default(),
        minify: settings.minify,
        markdown: MarkdownOptions {
            hard_wrap: file.markdown.hard_wrap,
            escape_html: file.markdown.escape_html,
        },
    })
}

/// Run the build command.
pub fn run(config_path: &Path, options: BuildOptions) -> Result<()> {
    let file_config = load_config(config_path)?;
    let root = root_of(config_path);

    let config = build_config(file_config, &root, options)?;
    if let Some(filter) = &config.html_filter {
        tracing::info!("Include filter: {}", filter);
    }

    let result = StaticBuilder::new(config).build()?;

    tracing::info!(
        "Built {} html, {} js and {} css files in {}ms",
        result.html,
        result.js,
        result.css,
        result.duration_ms
    );
    tracing::info!("Output: {}", result.output_dir.display());

    if result.error_count() > 0 {
        bail!("Build finished with {} error(s)", result.error_count());
    }

    tracing::info!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = r#"
html = ["src/index.html", "src/about.html"]
css = ["src/site.css"]

[[js]]
target = "app.js"
sources = ["src/a.js", "src/b.js"]

[[js]]
target = "admin.js"
sources = ["src/admin.js"]

[settings]
out = "public"
html_prefix = "src/include/"
md_prefix = "content/"
version = "2.1"
minify = false

[markdown]
escape_html = false
"#;

    #[test]
    fn parses_config_file() {
        let file: ConfigFile = toml::from_str(CONFIG).unwrap();

        assert_eq!(file.html, vec!["src/index.html", "src/about.html"]);
        assert_eq!(file.js.len(), 2);
        assert_eq!(file.js[0].sources, vec!["src/a.js", "src/b.js"]);
        assert_eq!(file.settings.out.as_deref(), Some("public"));
        assert!(!file.settings.minify);
        assert!(file.markdown.hard_wrap);
        assert!(!file.markdown.escape_html);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();

        assert!(file.html.is_empty());
        assert!(file.settings.minify);
        assert!(file.markdown.escape_html);
    }

    #[test]
    fn maps_config_to_build_config() {
        let file: ConfigFile = toml::from_str(CONFIG).unwrap();

        let config = build_config(
            file,
            Path::new("/project"),
            BuildOptions {
                html: Some("test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/project"));
        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.version.as_deref(), Some("2.1"));
        assert_eq!(config.html_filter.as_deref(), Some("test"));
        assert_eq!(config.html_prefix, "src/include/");
        assert_eq!(config.js[1].target, PathBuf::from("admin.js"));
        assert!(config.targets.html);
        assert!(!config.targets.css);
        assert!(!config.targets.js);
    }

    #[test]
    fn command_line_overrides_settings() {
        let file: ConfigFile = toml::from_str(CONFIG).unwrap();

        let config = build_config(
            file,
            Path::new("."),
            BuildOptions {
                html: Some(String::new()),
                js: Some(JsMode::Closure),
                out: Some(PathBuf::from("dist")),
                asset_version: Some("9".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert_eq!(config.version.as_deref(), Some("9"));
        assert_eq!(config.html_filter, None);
        assert_eq!(config.js_mode, JsMode::Closure);
    }

    #[test]
    fn requires_output_directory() {
        let file: ConfigFile = toml::from_str("html = [\"index.html\"]").unwrap();

        let result = build_config(file, Path::new("."), BuildOptions::default());

        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_fails() {
        let temp = tempdir().unwrap();

        let result = run(&temp.path().join("webmake.toml"), BuildOptions::default());

        assert!(result.is_err());
    }

    #[test]
    fn fails_when_build_records_errors() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("webmake.toml");
        fs::write(
            &config_path,
            "html = [\"index.html\"]\n[settings]\nout = \"public\"\n",
        )
        .unwrap();
        fs::write(temp.path().join("index.html"), "<%include gone.html%>").unwrap();

        let result = run(&config_path, BuildOptions::default());

        assert!(result.is_err());
        assert!(temp.path().join("public/index.html").exists());
    }
}
