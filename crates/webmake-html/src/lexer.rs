//! Directive lexer.
//!
//! Turns one source document into a stream of [`Event`]s: literal bytes,
//! version tokens, parsed directives and syntax errors. The lexer never
//! touches the filesystem beyond its own input; dispatching directives is the
//! job of the [`Expander`](crate::Expander).

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use crate::error::ExpandError;
use crate::scanner::Scanner;

/// Maximum length of a directive name or filter tag.
pub const MAX_TAG: usize = 30;

/// Maximum length of a directive parameter, after `@` expansion.
pub const MAX_PARAM: usize = 1024;

/// Lead byte of the UTF-8 encoded `«` (U+00AB).
const GUILLEMET_LEAD: u8 = 0xc2;
const GUILLEMET_OPEN: u8 = 0xab;

/// Width of the escape closer (`»`), skipped without validation.
const SPECIAL_CLOSER_LEN: usize = 2;

/// Lexer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    /// Copying literal bytes
    #[default]
    Normal,
    /// Reading the directive name after `<%`
    TagName,
    /// Reading the profile tag inside `include(...)`
    Filter,
    /// Reading the directive argument
    Parameter,
    /// Draining until the `%>` closer
    TagNone,
    /// Reading the command byte of a `«x»` escape
    Special,
}

/// The directives the lexer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Include,
    Markdown,
}

impl DirectiveKind {
    /// Look up a directive by name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"include" => Some(Self::Include),
            b"markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Markdown => "markdown",
        }
    }
}

/// A fully parsed directive ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,

    /// Profile tag from `include(tag)`; `None` when absent or empty
    pub filter: Option<String>,

    /// The single argument, with a leading `@` already expanded
    pub parameter: String,
}

/// Output of the lexer.
#[derive(Debug)]
pub enum Event {
    /// A byte to copy to the output unchanged
    Literal(u8),
    /// The `«V»` escape: emit the build version here
    Version,
    /// A complete directive
    Directive(Directive),
    /// A recoverable syntax or read error
    Error(ExpandError),
}

/// Bounded accumulation buffer for a directive field.
#[derive(Debug, Default)]
struct Field {
    bytes: Vec<u8>,
    overflow: bool,
}

impl Field {
    fn clear(&mut self) {
        self.bytes.clear();
        self.overflow = false;
    }

    fn push(&mut self, byte: u8, limit: usize) {
        if self.bytes.len() < limit {
            self.bytes.push(byte);
        } else {
            self.overflow = true;
        }
    }

    fn extend(&mut self, bytes: &[u8], limit: usize) {
        for &byte in bytes {
            self.push(byte, limit);
        }
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Single-pass directive lexer over one source document.
pub struct Lexer<R> {
    scanner: Scanner<R>,
    path: PathBuf,
    html_prefix: String,
    state: ParseState,

    /// A `<` waiting for the next byte to decide whether it opens a directive
    held_lt: bool,

    /// The `<` that abandoned a directive was emitted but may still open one
    reopen: bool,

    kind: Option<DirectiveKind>,
    tag: Field,
    filter: Field,
    has_filter: bool,
    param: Field,
    param_started: bool,

    pending: VecDeque<Event>,
    done: bool,
}

impl<R: BufRead> Lexer<R> {
    /// Create a lexer. `path` is only used in diagnostics.
    pub fn new(reader: R, path: impl AsRef<Path>) -> Self {
        Self {
            scanner: Scanner::new(reader),
            path: path.as_ref().to_path_buf(),
            html_prefix: String::new(),
            state: ParseState::Normal,
            held_lt: false,
            reopen: false,
            kind: None,
            tag: Field::default(),
            filter: Field::default(),
            has_filter: false,
            param: Field::default(),
            param_started: false,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Set the prefix substituted for a leading `@` in parameters.
    pub fn with_html_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.html_prefix = prefix.into();
        self
    }

    /// Current lexer mode.
    pub fn state(&self) -> ParseState {
        self.state
    }

    fn emit(&mut self, byte: u8) {
        self.pending.push_back(Event::Literal(byte));
    }

    fn report(&mut self, error: ExpandError) {
        self.pending.push_back(Event::Error(error));
    }

    fn step(&mut self, byte: u8) -> io::Result<()> {
        match self.state {
            ParseState::Normal => self.normal(byte)?,
            ParseState::Special => self.special(byte)?,
            ParseState::TagName | ParseState::Filter | ParseState::Parameter | ParseState::TagNone
                if byte == b'\n' || byte == b'<' =>
            {
                self.abandon(byte)
            }
            ParseState::TagName => self.tag_name(byte),
            ParseState::Filter => self.filter(byte),
            ParseState::Parameter => self.parameter(byte),
            ParseState::TagNone => self.tag_none(byte),
        }
        Ok(())
    }

    fn normal(&mut self, byte: u8) -> io::Result<()> {
        if std::mem::take(&mut self.reopen) && byte == b'%' {
            self.open_directive();
            return Ok(());
        }

        if std::mem::take(&mut self.held_lt) {
            if byte == b'%' {
                self.open_directive();
                return Ok(());
            }
            self.emit(b'<');
        }

        match byte {
            b'<' => self.held_lt = true,
            GUILLEMET_LEAD if self.scanner.peek()? == Some(GUILLEMET_OPEN) => {
                self.scanner.skip(1)?;
                self.state = ParseState::Special;
            }
            _ => self.emit(byte),
        }
        Ok(())
    }

    fn special(&mut self, command: u8) -> io::Result<()> {
        match command {
            b'V' => self.pending.push_back(Event::Version),
            other => tracing::warn!(
                "Unknown special command '{}' in {}:{}",
                char::from(other),
                self.path.display(),
                self.scanner.line()
            ),
        }

        // The closer is skipped by width, never checked.
        self.scanner.skip(SPECIAL_CLOSER_LEN)?;
        self.state = ParseState::Normal;
        Ok(())
    }

    fn open_directive(&mut self) {
        self.state = ParseState::TagName;
        self.kind = None;
        self.tag.clear();
        self.filter.clear();
        self.has_filter = false;
        self.param.clear();
        self.param_started = false;
    }

    fn tag_name(&mut self, byte: u8) {
        if self.tag.is_empty() && byte == b' ' {
            return;
        }

        match byte {
            b' ' | b'(' => {
                if self.tag.overflow {
                    self.report(ExpandError::TooLong {
                        field: "name",
                        limit: MAX_TAG,
                        file: self.path.clone(),
                        line: self.scanner.line(),
                    });
                    self.state = ParseState::TagNone;
                    return;
                }

                let kind = DirectiveKind::from_name(&self.tag.bytes);
                self.kind = kind;
                self.state = match kind {
                    Some(DirectiveKind::Include) if byte == b'(' => {
                        self.has_filter = true;
                        ParseState::Filter
                    }
                    Some(_) => ParseState::Parameter,
                    None => {
                        self.report(ExpandError::UnknownDirective {
                            name: self.tag.to_string_lossy(),
                            file: self.path.clone(),
                            line: self.scanner.line(),
                        });
                        ParseState::TagNone
                    }
                };
            }
            b'>' if self.scanner.prev() == Some(b'%') => {
                // `<%name%>`: closed before any parameter was given
                if self.tag.bytes.last() == Some(&b'%') {
                    self.tag.bytes.pop();
                }
                self.report(ExpandError::UnknownDirective {
                    name: self.tag.to_string_lossy(),
                    file: self.path.clone(),
                    line: self.scanner.line(),
                });
                self.state = ParseState::Normal;
            }
            _ => self.tag.push(byte, MAX_TAG),
        }
    }

    fn filter(&mut self, byte: u8) {
        match byte {
            b' ' => {}
            b')' => self.state = ParseState::Parameter,
            _ => self.filter.push(byte, MAX_TAG),
        }
    }

    fn parameter(&mut self, byte: u8) {
        if !self.param_started {
            if byte == b' ' {
                return;
            }
            self.param_started = true;
            if byte == b'@' {
                self.param.extend(self.html_prefix.as_bytes(), MAX_PARAM);
                return;
            }
        }

        match byte {
            b' ' | b'%' => self.state = ParseState::TagNone,
            _ => self.param.push(byte, MAX_PARAM),
        }
    }

    fn tag_none(&mut self, byte: u8) {
        if byte == b'>' && self.scanner.prev() == Some(b'%') {
            self.state = ParseState::Normal;
            self.close_directive();
        }
    }

    fn close_directive(&mut self) {
        let Some(kind) = self.kind.take() else {
            return;
        };

        let overflow = if self.filter.overflow {
            Some(("filter", MAX_TAG))
        } else if self.param.overflow {
            Some(("parameter", MAX_PARAM))
        } else {
            None
        };
        if let Some((field, limit)) = overflow {
            self.report(ExpandError::TooLong {
                field,
                limit,
                file: self.path.clone(),
                line: self.scanner.line(),
            });
            return;
        }

        let filter = (self.has_filter && !self.filter.is_empty())
            .then(|| self.filter.to_string_lossy());

        self.pending.push_back(Event::Directive(Directive {
            kind,
            filter,
            parameter: self.param.to_string_lossy(),
        }));
    }

    /// Drop an unterminated directive. The offending byte is kept, and a
    /// `<` may still open the next directive.
    fn abandon(&mut self, byte: u8) {
        self.report(ExpandError::Unterminated {
            file: self.path.clone(),
            line: self.scanner.line(),
        });
        self.emit(byte);
        self.reopen = byte == b'<';
        self.kind = None;
        self.state = ParseState::Normal;
    }

    fn finish(&mut self) {
        if std::mem::take(&mut self.held_lt) {
            self.emit(b'<');
        }
        if !matches!(self.state, ParseState::Normal | ParseState::Special) {
            self.report(ExpandError::Unterminated {
                file: self.path.clone(),
                line: self.scanner.line(),
            });
        }
        self.state = ParseState::Normal;
        self.done = true;
    }

    fn fail(&mut self, source: io::Error) {
        self.report(ExpandError::Unreadable {
            path: self.path.clone(),
            source,
        });
        self.done = true;
    }
}

impl<R: BufRead> Iterator for Lexer<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.done {
                return None;
            }

            match self.scanner.next_byte() {
                Ok(Some(byte)) => {
                    if let Err(e) = self.step(byte) {
                        self.fail(e);
                    }
                }
                Ok(None) => self.finish(),
                Err(e) => self.fail(e),
            }
        }
    }
}
