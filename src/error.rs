use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

/// A problem found while parsing. Parsing keeps going after one is recorded,
/// so a program can yield several of these.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(span: Span, message: String) -> Self {
        Self {
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(span: Span, message: String, help: String) -> Self {
        Self {
            span,
            message,
            help: Some(help),
        }
    }

    /// Print a labelled diagnostic for this error against `source`.
    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");
        // ariadne wants the span clamped to the source it is given
        let start = self.span.start.min(source.len());
        let end = self.span.end.clamp(start, source.len());

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", "Syntax Error".fg(Color::Yellow), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(Color::Yellow),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(e) = report_builder
            .finish()
            .print((filename, Source::from(source)))
        {
            eprintln!("{}", self);
            log::debug!("failed to render diagnostic: {e}");
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Syntax Error: {}", self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// A runtime fault. Every fault ends the current run; its message becomes the
/// last line of the program output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("Runtime Error: Division by zero")]
    DivisionByZero,
    #[error("Runtime Error: Index out of range")]
    IndexOutOfRange,
    #[error("Fatal error: String index out of range")]
    StringIndexOutOfRange,
    #[error("Fatal error: Unexpectedly found nil while unwrapping an Optional value")]
    UnwrapNil,
    #[error("Fatal error: Could not cast value of type '{actual}' to '{target}'")]
    InvalidCast { actual: String, target: String },
    #[error("Fatal error: 'try!' expression unexpectedly raised an error: {0}")]
    TryFailed(String),
    #[error("Runtime Error: Can't remove {0} element from an empty collection")]
    RemoveFromEmpty(&'static str),
    #[error("Fatal error: Stack overflow")]
    StackOverflow,
}
