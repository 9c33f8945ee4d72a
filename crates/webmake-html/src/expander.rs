//! Recursive expansion of source documents.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::context::{BuildContext, Diagnostics};
use crate::error::ExpandError;
use crate::lexer::{Directive, DirectiveKind, Event, Lexer};
use crate::markdown::{self, CmarkRenderer, MarkdownRenderer};

/// Expands documents into a shared output stream.
///
/// Included files are expanded depth-first straight into the caller's
/// output, so every byte lands exactly where its directive stood. Each file
/// gets its own [`Lexer`]; only the output and the diagnostics are shared
/// between recursion levels.
pub struct Expander<'a> {
    ctx: &'a BuildContext,
    renderer: Box<dyn MarkdownRenderer + 'a>,
    stack: Vec<PathBuf>,
}

impl<'a> Expander<'a> {
    /// Create an expander using the default markdown renderer.
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            renderer: Box::new(CmarkRenderer::default()),
            stack: Vec::new(),
        }
    }

    /// Replace the markdown renderer.
    pub fn with_renderer(mut self, renderer: impl MarkdownRenderer + 'a) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Files currently being expanded, outermost first.
    pub fn include_stack(&self) -> &[PathBuf] {
        &self.stack
    }

    /// Expand the file at `path` into `out`.
    ///
    /// A missing or unreadable file, or one that is already on the include
    /// stack, is recorded in `diags` and skipped. Only write failures on
    /// `out` are returned.
    pub fn expand_file(
        &mut self,
        path: &Path,
        out: &mut dyn Write,
        diags: &mut Diagnostics,
    ) -> io::Result<()> {
        let path = self.ctx.resolve(path);

        if !path.exists() {
            diags.record(ExpandError::IncludeNotFound { path });
            return Ok(());
        }

        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if self.stack.contains(&key) {
            diags.record(ExpandError::IncludeCycle { path });
            return Ok(());
        }

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(source) => {
                diags.record(ExpandError::Unreadable { path, source });
                return Ok(());
            }
        };

        tracing::debug!(
            "processing: {} with filter ({})",
            path.display(),
            self.ctx.html_filter.as_deref().unwrap_or("")
        );

        self.stack.push(key);
        let result = self.expand_reader(BufReader::new(file), &path, out, diags);
        self.stack.pop();

        result
    }

    /// Expand an already opened document. `path` names it in diagnostics.
    pub fn expand_reader<R: BufRead>(
        &mut self,
        reader: R,
        path: &Path,
        out: &mut dyn Write,
        diags: &mut Diagnostics,
    ) -> io::Result<()> {
        let lexer = Lexer::new(reader, path).with_html_prefix(self.ctx.html_prefix.as_str());

        for event in lexer {
            match event {
                Event::Literal(byte) => out.write_all(&[byte])?,
                Event::Version => out.write_all(self.ctx.version.as_bytes())?,
                Event::Directive(directive) => self.dispatch(directive, out, diags)?,
                Event::Error(error) => diags.record(error),
            }
        }

        Ok(())
    }

    fn dispatch(
        &mut self,
        directive: Directive,
        out: &mut dyn Write,
        diags: &mut Diagnostics,
    ) -> io::Result<()> {
        match directive.kind {
            DirectiveKind::Include => {
                if self.ctx.accepts(directive.filter.as_deref()) {
                    self.expand_file(Path::new(&directive.parameter), out, diags)
                } else {
                    tracing::debug!("    filtered out: {}", directive.parameter);
                    Ok(())
                }
            }
            DirectiveKind::Markdown => {
                let source = self
                    .ctx
                    .resolve(format!("{}{}", self.ctx.md_prefix, directive.parameter));
                markdown::transclude(&source, out, self.renderer.as_mut(), diags)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = tempdir().unwrap();
        for (name, content) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        temp
    }

    fn expand(ctx: &BuildContext, entry: &str) -> (String, Diagnostics) {
        let mut out = Vec::new();
        let mut diags = Diagnostics::new();
        Expander::new(ctx)
            .expand_file(Path::new(entry), &mut out, &mut diags)
            .unwrap();
        (String::from_utf8(out).unwrap(), diags)
    }

    fn expand_str(ctx: &BuildContext, input: &str) -> (String, Diagnostics) {
        let mut out = Vec::new();
        let mut diags = Diagnostics::new();
        Expander::new(ctx)
            .expand_reader(
                Cursor::new(input.as_bytes()),
                Path::new("inline.html"),
                &mut out,
                &mut diags,
            )
            .unwrap();
        (String::from_utf8(out).unwrap(), diags)
    }

    #[test]
    fn inlines_include_verbatim() {
        let temp = project(&[
            ("index.html", "<body>\n<%include header.html%>\n</body>\n"),
            ("header.html", "<h1>Site</h1>"),
        ]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "<body>\n<h1>Site</h1>\n</body>\n");
        assert!(diags.is_empty());
    }

    #[test]
    fn expands_nested_includes() {
        let temp = project(&[
            ("index.html", "[<%include a.html%>]"),
            ("a.html", "a(<%include parts/b.html%>)a"),
            ("parts/b.html", "b"),
        ]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "[a(b)a]");
        assert!(diags.is_empty());
    }

    #[test]
    fn filtered_include_follows_active_filter() {
        let temp = project(&[
            (
                "index.html",
                "<%include(test) t.html%>|<%include(prod) p.html%>|<%include all.html%>",
            ),
            ("t.html", "T"),
            ("p.html", "P"),
            ("all.html", "A"),
        ]);

        let mut ctx = BuildContext::new(temp.path());
        let (html, _) = expand(&ctx, "index.html");
        assert_eq!(html, "||A");

        ctx.html_filter = Some("test".to_string());
        let (html, diags) = expand(&ctx, "index.html");
        assert_eq!(html, "T||A");
        assert!(diags.is_empty());
    }

    #[test]
    fn at_prefix_resolves_include() {
        let temp = project(&[
            ("index.html", "<%include @widgets/nav.html%>"),
            ("site/includes/widgets/nav.html", "<nav/>"),
        ]);
        let mut ctx = BuildContext::new(temp.path());
        ctx.html_prefix = "site/includes/".to_string();

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "<nav/>");
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_include_counts_and_continues() {
        let temp = project(&[("index.html", "a<%include gone.html%>b")]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "ab");
        assert_eq!(diags.count(), 1);
        assert!(matches!(
            diags.errors()[0],
            ExpandError::IncludeNotFound { .. }
        ));
    }

    #[test]
    fn unterminated_directive_recovery() {
        let (html, diags) = expand_str(&BuildContext::default(), "abc<%includ\nxyz");

        assert_eq!(html, "abc\nxyz");
        assert_eq!(diags.count(), 1);
    }

    #[test]
    fn substitutes_version() {
        let ctx = BuildContext {
            version: "3.2.1".to_string(),
            ..Default::default()
        };

        let (html, diags) = expand_str(&ctx, "app_«V».js");

        assert_eq!(html, "app_3.2.1.js");
        assert!(diags.is_empty());
    }

    #[test]
    fn stops_include_cycles() {
        let temp = project(&[
            ("a.html", "a<%include b.html%>"),
            ("b.html", "b<%include a.html%>"),
        ]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "a.html");

        assert_eq!(html, "ab");
        assert_eq!(diags.count(), 1);
        assert!(matches!(diags.errors()[0], ExpandError::IncludeCycle { .. }));
    }

    #[test]
    fn same_file_may_be_included_twice_in_sequence() {
        let temp = project(&[
            ("index.html", "<%include hr.html%><%include hr.html%>"),
            ("hr.html", "<hr>"),
        ]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "<hr><hr>");
        assert!(diags.is_empty());
    }

    #[test]
    fn markdown_inline_matches_export() {
        let temp = project(&[
            ("index.html", "<main><%markdown about.md%></main>"),
            ("content/about.md", "# About\n\nWe *build* sites.\n"),
        ]);
        let mut ctx = BuildContext::new(temp.path());
        ctx.md_prefix = "content/".to_string();

        let (html, diags) = expand(&ctx, "index.html");

        let export = fs::read_to_string(temp.path().join("content/about.html")).unwrap();
        assert!(diags.is_empty());
        assert_eq!(html, format!("<main>{export}</main>"));
        assert!(export.contains("<em>build</em>"));
    }

    #[test]
    fn include_and_markdown_errors_accumulate() {
        let temp = project(&[(
            "index.html",
            "<%include nope.html%><%markdown nope.md%><%bogus x%>",
        )]);
        let ctx = BuildContext::new(temp.path());

        let (html, diags) = expand(&ctx, "index.html");

        assert_eq!(html, "");
        assert_eq!(diags.count(), 3);
    }

    #[test]
    fn include_stack_is_empty_after_expansion() {
        let temp = project(&[("index.html", "<%include a.html%>"), ("a.html", "a")]);
        let ctx = BuildContext::new(temp.path());
        let mut expander = Expander::new(&ctx);
        let mut diags = Diagnostics::new();

        expander
            .expand_file(Path::new("index.html"), &mut Vec::new(), &mut diags)
            .unwrap();

        assert!(expander.include_stack().is_empty());
    }
}
