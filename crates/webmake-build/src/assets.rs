//! Asset pipeline for CSS and JavaScript processing.

use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AssetError, BuildError};

/// Closure Compiler jar looked up in the project root.
pub const CLOSURE_JAR: &str = "closure-compiler.jar";

/// Environment variable naming the Closure Compiler jar.
pub const CLOSURE_ENV: &str = "CLOSURE_COMPILER";

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Compile a stylesheet using lightningcss, inlining `@import`ed files.
    ///
    /// `.scss` sources are compiled with grass first; lightningcss then
    /// prints (and optionally minifies) the result.
    pub fn compile_css(path: &Path, minify: bool) -> Result<String, String> {
        use lightningcss::bundler::{Bundler, FileProvider};
        use lightningcss::stylesheet::{ParserOptions, StyleSheet};

        if is_sass(path) {
            let css = grass::from_path(path, &grass::Options::default())
                .map_err(|e| format!("Sass compile error: {}", e))?;

            let stylesheet = StyleSheet::parse(
                &css,
                ParserOptions {
                    filename: path.display().to_string(),
                    ..Default::default()
                },
            )
            .map_err(|e| format!("CSS parse error: {}", e))?;

            return print_css(&stylesheet, minify);
        }

        let fs = FileProvider::new();
        let mut bundler = Bundler::new(&fs, None, ParserOptions::default());

        let stylesheet = bundler
            .bundle(path)
            .map_err(|e| format!("CSS parse error: {}", e))?;

        print_css(&stylesheet, minify)
    }

    /// Concatenate `sources` into `target` in order.
    ///
    /// The target is truncated first. Missing or unreadable sources are
    /// returned as errors and skipped; a failure writing the target ends the
    /// bundle.
    pub fn concat_js(sources: &[PathBuf], target: &Path) -> Vec<AssetError> {
        let mut errors = Vec::new();

        let write_error = |e| AssetError::Write {
            path: target.to_path_buf(),
            source: e,
        };

        let mut out = match File::create(target) {
            Ok(file) => BufWriter::new(file),
            Err(e) => {
                errors.push(write_error(e));
                return errors;
            }
        };

        for source in sources {
            let content = match fs::read(source) {
                Ok(content) => content,
                Err(_) => {
                    errors.push(AssetError::MissingSource {
                        path: source.clone(),
                    });
                    continue;
                }
            };
            if let Err(e) = out.write_all(&content) {
                errors.push(write_error(e));
                return errors;
            }
        }

        if let Err(e) = out.flush() {
            errors.push(write_error(e));
        }

        errors
    }

    /// Locate the Closure Compiler jar.
    ///
    /// Looks for [`CLOSURE_JAR`] in `root`, then for the path in
    /// [`CLOSURE_ENV`].
    pub fn find_closure_compiler(root: &Path) -> Result<PathBuf, BuildError> {
        let local = root.join(CLOSURE_JAR);
        if local.exists() {
            return Ok(local);
        }

        let Some(configured) = env::var_os(CLOSURE_ENV) else {
            return Err(BuildError::MinifierNotFound(format!(
                "{} not found in {} and {} not defined",
                CLOSURE_JAR,
                root.display(),
                CLOSURE_ENV
            )));
        };

        let jar = PathBuf::from(configured);
        if !jar.exists() {
            return Err(BuildError::MinifierNotFound(format!(
                "{}({}) not found",
                CLOSURE_ENV,
                jar.display()
            )));
        }

        Ok(jar)
    }

    /// Minify `sources` into `target` with the Closure Compiler.
    pub fn closure_compile(jar: &Path, sources: &[PathBuf], target: &Path) -> Result<(), AssetError> {
        let output = Command::new("java")
            .arg("-jar")
            .arg(jar)
            .arg(format!("--js_output_file={}", target.display()))
            .args(sources)
            .output()
            .map_err(|e| AssetError::Minifier {
                target: target.to_path_buf(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(AssetError::Minifier {
                target: target.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

fn is_sass(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "scss")
}

fn print_css(
    stylesheet: &lightningcss::stylesheet::StyleSheet<'_>,
    minify: bool,
) -> Result<String, String> {
    use lightningcss::stylesheet::PrinterOptions;

    let css = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..Default::default()
        })
        .map_err(|e| format!("CSS print error: {}", e))?;

    Ok(css.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn compiles_css() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("style.css");
        fs::write(
            &path,
            r#"
.button {
    background-color: blue;
    padding: 10px;
}
        "#,
        )
        .unwrap();

        let minified = AssetPipeline::compile_css(&path, true).unwrap();
        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));

        let pretty = AssetPipeline::compile_css(&path, false).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn inlines_css_imports() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("base.css"), ".base { color: red; }").unwrap();
        fs::write(
            temp.path().join("main.css"),
            "@import \"base.css\";\n.main { color: green; }",
        )
        .unwrap();

        let css = AssetPipeline::compile_css(&temp.path().join("main.css"), true).unwrap();

        assert!(css.contains(".base"));
        assert!(css.contains(".main"));
        assert!(!css.contains("@import"));
    }

    #[test]
    fn compiles_scss() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("_colors.scss"), "$accent: rebeccapurple;").unwrap();
        let path = temp.path().join("style.scss");
        fs::write(
            &path,
            "@use 'colors';\n$pad: 4px;\n.nav { padding: $pad * 2; a { color: colors.$accent; } }\n",
        )
        .unwrap();

        let css = AssetPipeline::compile_css(&path, false).unwrap();

        assert!(css.contains(".nav a"));
        assert!(css.contains("8px"));
        assert!(css.contains("rebeccapurple") || css.contains("#639"));
        assert!(!css.contains('$'));
    }

    #[test]
    fn reports_scss_errors() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.scss");
        fs::write(&path, ".a { color: $undefined; }").unwrap();

        let error = AssetPipeline::compile_css(&path, true).unwrap_err();

        assert!(error.starts_with("Sass compile error"));
    }

    #[test]
    fn reports_css_errors() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.css");

        assert!(AssetPipeline::compile_css(&path, true).is_err());
    }

    #[test]
    fn concatenates_js_in_order() {
        let temp = tempdir().unwrap();
        let a = temp.path().join("a.js");
        let b = temp.path().join("b.js");
        fs::write(&a, "var a = 1;\n").unwrap();
        fs::write(&b, "var b = 2;\n").unwrap();
        let target = temp.path().join("app.js");
        fs::write(&target, "stale content that must go").unwrap();

        let errors = AssetPipeline::concat_js(&[a, b], &target);

        assert!(errors.is_empty());
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "var a = 1;\nvar b = 2;\n"
        );
    }

    #[test]
    fn skips_missing_js_sources() {
        let temp = tempdir().unwrap();
        let a = temp.path().join("a.js");
        fs::write(&a, "a();").unwrap();
        let target = temp.path().join("app.js");

        let errors = AssetPipeline::concat_js(&[temp.path().join("gone.js"), a], &target);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], AssetError::MissingSource { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "a();");
    }

    #[test]
    fn finds_local_closure_jar() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CLOSURE_JAR), b"").unwrap();

        let jar = AssetPipeline::find_closure_compiler(temp.path()).unwrap();

        assert_eq!(jar, temp.path().join(CLOSURE_JAR));
    }
}
