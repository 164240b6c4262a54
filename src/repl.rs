use crate::config::Limits;
use crate::evaluator::Evaluator;
use crate::parser::parse_source;
use std::collections::HashMap;
use std::io::{self, Write};

/// Line REPL. Every accepted line joins the session source and the whole
/// session runs again in a fresh evaluator; only output not seen before is
/// printed.
pub fn start(limits: Limits) {
    println!("Swiftlet Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut session = Session::new(limits);

    loop {
        print!("> ");
        if let Err(error) = io::stdout().flush() {
            eprintln!("Error writing prompt: {}", error);
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }
                print!("{}", session.submit(line));
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

pub struct Session {
    limits: Limits,
    source: String,
    /// Output of the last successful run, used to print only what is new.
    seen: String,
}

impl Session {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            source: String::new(),
            seen: String::new(),
        }
    }

    /// Add `line` to the session and return the output it produced. Lines
    /// that fail to parse are reported and left out of the session. A line
    /// that faults is kept out as well, so later lines still run.
    pub fn submit(&mut self, line: &str) -> String {
        let candidate = format!("{}{}\n", self.source, line);
        let (program, errors) = parse_source(&candidate);
        if !errors.is_empty() {
            let offset = self.source.len();
            for error in &errors {
                let mut error = error.clone();
                error.span.start = error.span.start.saturating_sub(offset);
                error.span.end = error.span.end.saturating_sub(offset);
                error.report(line, None);
            }
            return String::new();
        }

        let output = Evaluator::new(self.limits).execute(&program, &HashMap::new());
        let fresh = output
            .strip_prefix(self.seen.as_str())
            .unwrap_or(output.as_str())
            .to_string();

        if !output.lines().last().is_some_and(is_fault_line) {
            self.source = candidate;
            self.seen = output;
        }
        fresh
    }
}

fn is_fault_line(line: &str) -> bool {
    line.starts_with("Runtime Error: ") || line.starts_with("Fatal error: ")
}
