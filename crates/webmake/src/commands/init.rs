//! Initialize a webmake project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
///
/// Writes the config file and sample sources next to it. Existing files are
/// kept unless `yes` is set.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing webmake...");

    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    write_file(config_path, DEFAULT_CONFIG, yes)?;

    let samples = [
        ("src/index.html", DEFAULT_INDEX),
        ("src/include/header.html", DEFAULT_HEADER),
        ("content/about.md", DEFAULT_ABOUT),
        ("src/style.css", DEFAULT_CSS),
        ("src/js/main.js", DEFAULT_JS),
    ];
    for (relative, content) in samples {
        write_file(&root.join(relative), content, yes)?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'webmake build' to build the site.");

    Ok(())
}

fn write_file(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::debug!("Keeping existing {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Webmake Configuration

# HTML entry files, expanded into the output directory
html = ["src/index.html"]

# Stylesheets, compiled (and @import-bundled) with lightningcss
css = ["src/style.css"]

# JavaScript bundles: sources are concatenated, or minified with --js cc
[[js]]
target = "app.js"
sources = ["src/js/main.js"]

[settings]
# Output directory
out = "public"

# Replaces a leading '@' in <%include ...%> paths
html_prefix = "src/include/"

# Prepended to <%markdown ...%> paths
md_prefix = "content/"

# Version for «V» and versioned css/js names (first match wins):
# version = "1.0.0"
# autoversion = true
# version_file = "Cargo.toml"
# version_prefix = "version = "

# Minify compiled CSS
minify = true

[markdown]
# Turn single newlines into <br />
hard_wrap = true
# Escape raw HTML inside markdown
escape_html = true
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<link rel="stylesheet" href="style.css">
</head>
<body>
<%include @header.html%>
<main>
<%markdown about.md%>
</main>
<%include(debug) src/include/debug.html%>
<script src="app.js"></script>
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header>
<h1>My Site</h1>
</header>
"#;

const DEFAULT_ABOUT: &str = r#"# About

This page is rendered from `content/about.md`.
"#;

const DEFAULT_CSS: &str = r#"body {
  font-family: system-ui, sans-serif;
  margin: 0 auto;
  max-width: 40rem;
}
"#;

const DEFAULT_JS: &str = r#"document.documentElement.classList.add('js');
"#;
