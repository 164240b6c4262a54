use crate::config::Limits;
use crate::evaluator::Evaluator;
use crate::parser::parse_source;
use std::collections::HashMap;

/// Run a whole program and print its output. Syntax errors are rendered as
/// labelled reports against the source instead.
pub fn run(source: &str, filename: Option<&str>, limits: Limits) {
    let (program, errors) = parse_source(source);
    if !errors.is_empty() {
        for error in &errors {
            error.report(source, filename);
        }
        return;
    }

    let output = Evaluator::new(limits).execute(&program, &HashMap::new());
    print!("{}", output);
}
