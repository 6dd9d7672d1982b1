//! Classbox CLI entry point.

use classbox_runtime::{Executor, Tracer};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    files: Vec<PathBuf>,
    show_help: bool,
    show_version: bool,
    trace: bool,
    redirect_from: Option<String>,
    redirect_to: Option<String>,
    max_depth: Option<usize>,
    max_instructions: Option<u64>,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "--trace" => config.trace = true,
            "--from" => {
                i += 1;
                if i >= args.len() {
                    return Err("--from requires an internal class name".into());
                }
                config.redirect_from = Some(args[i].clone());
            }
            "--to" => {
                i += 1;
                if i >= args.len() {
                    return Err("--to requires an internal class name".into());
                }
                config.redirect_to = Some(args[i].clone());
            }
            "--max-depth" => {
                i += 1;
                if i >= args.len() {
                    return Err("--max-depth requires a value".into());
                }
                config.max_depth = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("invalid --max-depth value: {}", args[i]))?,
                );
            }
            "--max-instructions" => {
                i += 1;
                if i >= args.len() {
                    return Err("--max-instructions requires a value".into());
                }
                config.max_instructions = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("invalid --max-instructions value: {}", args[i]))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            file => config.files.push(PathBuf::from(file)),
        }
        i += 1;
    }

    Ok(config)
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(());
    }
    if config.show_version {
        println!("classbox {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if config.files.is_empty() {
        return Err("no class files given (try --help)".into());
    }

    let mut executor = Executor::new().with_instruction_budget(config.max_instructions);
    if config.redirect_from.is_some() || config.redirect_to.is_some() {
        let from = config
            .redirect_from
            .clone()
            .unwrap_or_else(|| executor.redirect_from().to_string());
        let to = config
            .redirect_to
            .clone()
            .unwrap_or_else(|| executor.redirect_to().to_string());
        executor = executor.with_redirect(from, to);
    }
    if let Some(depth) = config.max_depth {
        executor = executor.with_max_call_depth(depth);
    }

    for file in &config.files {
        let container = std::fs::read(file)
            .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
        let result = if config.trace {
            let mut tracer = Tracer::enabled();
            let result = executor.execute_traced(&container, &mut tracer);
            for record in tracer.records() {
                eprintln!("-- {}", record.event);
            }
            result
        } else {
            executor.execute(&container)
        };
        match result {
            Ok(output) => print!("{output}"),
            Err(error) => {
                // Partial output (diagnostic trace included) still reaches
                // the caller on invocation failure.
                if let Some(output) = error.captured_output() {
                    print!("{output}");
                }
                return Err(format!("{}: {error}", file.display()).into());
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r"classbox - run untrusted class files and capture their console output

USAGE:
    classbox [OPTIONS] <FILE.class>...

OPTIONS:
    --trace                   Print driver events to stderr
    --from <internal-name>    Identifier to redirect (default java/lang/System)
    --to <internal-name>      Capture class identifier (default classbox/Console)
    --max-depth <n>           Interpreter call-depth bound
    --max-instructions <n>    Abort after n interpreted instructions
    -h, --help                Show this help
    -V, --version             Show version"
    );
}
