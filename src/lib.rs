// Swiftlet interpreter library
//
// Runs small Swift-like snippets and returns what they print. Runtime faults
// such as an out-of-range index or a nil unwrap end the run and are reported
// in the output text instead of crashing the host.

pub mod ast;
pub mod builtins;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod stack;
pub mod value;

use log::trace;
use std::collections::HashMap;

// Re-export commonly used items
pub use ast::Node;
pub use config::Limits;
pub use error::{Fault, Span, SyntaxError};
pub use evaluator::Evaluator;
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use value::Value;

pub use repl::start as start_repl;
pub use runner::run;

/// Run `source` with the default limits. Returns the trimmed program output,
/// or every syntax error joined by newlines if the program did not parse.
pub fn evaluate(source: &str, bindings: &HashMap<String, Value>) -> String {
    evaluate_with(source, bindings, Limits::default())
}

pub fn evaluate_with(source: &str, bindings: &HashMap<String, Value>, limits: Limits) -> String {
    let (program, errors) = parser::parse_source(source);
    if !errors.is_empty() {
        trace!("not evaluating: {} syntax errors", errors.len());
        return errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
    }

    Evaluator::new(limits)
        .execute(&program, bindings)
        .trim()
        .to_string()
}
