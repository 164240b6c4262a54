use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::path::Path;
use swiftlet::{repl, runner, Limits};

fn main() {
    let matches = Command::new("swiftlet")
        .about("Runs Swift-like snippets and prints their output")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .value_name("N")
                .help("Iterations a while loop may run before it is stopped [default: 1000]")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Scope frames allowed before a call faults with a stack overflow [default: 100]")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log interpreter decisions at debug level")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("verbose") {
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        pretty_env_logger::init();
    }

    let mut limits = Limits::default();
    if let Some(n) = matches.get_one::<usize>("max-iterations") {
        limits.max_loop_iterations = *n;
    }
    if let Some(n) = matches.get_one::<usize>("max-depth") {
        limits.max_call_depth = *n;
    }

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => run_file(file_path, limits),
        _ => repl::start(limits),
    }
}

fn run_file(path: &str, limits: Limits) {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        std::process::exit(1);
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.to_string_lossy();
            runner::run(&source, Some(&filename), limits);
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
