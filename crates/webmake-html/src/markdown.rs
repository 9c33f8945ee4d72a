//! Markdown transclusion.
//!
//! A `<%markdown path%>` directive renders the markdown file into the current
//! output and also writes a standalone `.html` export next to the source.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

use pulldown_cmark::{html, Event, Options, Parser};

use crate::context::Diagnostics;
use crate::error::ExpandError;

/// Bytes read from the markdown source per feed.
pub const CHUNK_SIZE: usize = 2048;

/// A markdown engine driven with chunked input.
///
/// The caller reads the source in chunks, calls [`feed`](Self::feed) for each
/// one and drains `out` to every destination after each call, then calls
/// [`finish`](Self::finish) once at end of input. One renderer instance is
/// reused across documents, so `finish` must leave it ready for the next one.
pub trait MarkdownRenderer {
    /// Accept the next chunk of source, appending any html that is ready.
    fn feed(&mut self, chunk: &[u8], out: &mut Vec<u8>);

    /// Complete the current document, appending the remaining html.
    fn finish(&mut self, out: &mut Vec<u8>);
}

/// Rendering switches for [`CmarkRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Render single newlines inside paragraphs as `<br />`
    pub hard_wrap: bool,

    /// Escape raw HTML found in the markdown instead of passing it through
    pub escape_html: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            hard_wrap: true,
            escape_html: true,
        }
    }
}

/// pulldown-cmark backed renderer.
///
/// Reference links and footnotes need the whole document, so chunks are
/// buffered and the html is produced on `finish`.
#[derive(Debug, Default)]
pub struct CmarkRenderer {
    options: MarkdownOptions,
    source: Vec<u8>,
}

impl CmarkRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            source: Vec::new(),
        }
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn feed(&mut self, chunk: &[u8], _out: &mut Vec<u8>) {
        self.source.extend_from_slice(chunk);
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        let source = std::mem::take(&mut self.source);
        let html = render_html(&String::from_utf8_lossy(&source), self.options);
        out.extend_from_slice(html.as_bytes());
    }
}

/// Render a complete markdown document to HTML.
pub fn render_html(source: &str, options: MarkdownOptions) -> String {
    let extensions =
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;

    let parser = Parser::new_ext(source, extensions).map(|event| match event {
        Event::SoftBreak if options.hard_wrap => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) if options.escape_html => Event::Text(raw),
        other => other,
    });

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

/// Render `source` into `out` and into its sibling `.html` export.
///
/// Missing or unreadable sources and an unwritable export are recorded in
/// `diags` and nothing is written. An export that would replace the source
/// itself is skipped and recorded. Only failures writing to `out` are
/// returned.
pub fn transclude(
    source: &Path,
    out: &mut dyn Write,
    renderer: &mut dyn MarkdownRenderer,
    diags: &mut Diagnostics,
) -> io::Result<()> {
    if !source.exists() {
        diags.record(ExpandError::MarkdownNotFound {
            path: source.to_path_buf(),
        });
        return Ok(());
    }

    let export_path = source.with_extension("html");

    let mut input = match File::open(source) {
        Ok(file) => file,
        Err(e) => {
            diags.record(ExpandError::Unreadable {
                path: source.to_path_buf(),
                source: e,
            });
            return Ok(());
        }
    };

    let mut export = if export_path == source {
        diags.record(ExpandError::ExportOverwritesSource {
            path: export_path.clone(),
        });
        None
    } else {
        match File::create(&export_path) {
            Ok(file) => Some(file),
            Err(e) => {
                diags.record(ExpandError::ExportUnwritable {
                    path: export_path,
                    source: e,
                });
                return Ok(());
            }
        }
    };

    tracing::debug!(
        "markdown: {} (export {})",
        source.display(),
        export_path.display()
    );

    let mut chunk = [0u8; CHUNK_SIZE];
    let mut html = Vec::new();

    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                diags.record(ExpandError::Unreadable {
                    path: source.to_path_buf(),
                    source: e,
                });
                // Reset the renderer for the next document
                renderer.finish(&mut Vec::new());
                return Ok(());
            }
        };

        renderer.feed(&chunk[..read], &mut html);
        drain(&mut html, out, &mut export, &export_path, diags)?;
    }

    renderer.finish(&mut html);
    drain(&mut html, out, &mut export, &export_path, diags)
}

/// Write pending html to both destinations and clear it.
///
/// A failing export is recorded once and then dropped so the main output
/// still receives the rest of the document.
fn drain(
    html: &mut Vec<u8>,
    out: &mut dyn Write,
    export: &mut Option<File>,
    export_path: &Path,
    diags: &mut Diagnostics,
) -> io::Result<()> {
    if html.is_empty() {
        return Ok(());
    }

    out.write_all(html)?;

    if let Some(file) = export.as_mut() {
        if let Err(e) = file.write_all(html) {
            diags.record(ExpandError::ExportUnwritable {
                path: export_path.to_path_buf(),
                source: e,
            });
            *export = None;
        }
    }

    html.clear();
    Ok(())
}
