//! Recursive directive processor for HTML sources.
//!
//! Expands `<%include path%>`, `<%include(filter) path%>` and `<%markdown path%>`
//! directives plus the `«V»` version token, writing the fully expanded byte
//! stream into a single output sink.

pub mod context;
pub mod error;
pub mod expander;
pub mod lexer;
pub mod markdown;
pub mod scanner;

pub use context::{BuildContext, Diagnostics};
pub use error::ExpandError;
pub use expander::Expander;
pub use lexer::{Directive, DirectiveKind, Event, Lexer, ParseState};
pub use markdown::{render_html, CmarkRenderer, MarkdownOptions, MarkdownRenderer};
pub use scanner::Scanner;
