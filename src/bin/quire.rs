//! Derivative generation CLI.
//!
//! Usage:
//!   quire <path> [--config derivates.json] [--output-root DIR] [--verbose]
//!
//! `<path>` is either a METS file or a holding directory containing an image
//! subdirectory (commonly `MAX/` or `TIF/`).

use std::path::PathBuf;
use std::process::ExitCode;

use quire::config::RunConfig;
use quire::pipeline::{Pipeline, RunPlan};

struct CliArgs {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
}

impl CliArgs {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut input = None;
        let mut config = None;
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        config = Some(PathBuf::from(&args[i]));
                    }
                }
                "--verbose" | "-v" => {
                    verbose = true;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => {
                    if input.is_none() {
                        input = Some(PathBuf::from(other));
                    }
                }
            }
            i += 1;
        }

        Self {
            input,
            config,
            verbose,
        }
    }
}

fn print_usage() {
    println!("Usage: quire <path> [options]");
    println!();
    println!("  <path>            METS file or holding directory");
    println!("  -c, --config F    JSON configuration file");
    println!("  -v, --verbose     debug logging (overrides RUST_LOG)");
}

fn main() -> ExitCode {
    let args = CliArgs::from_args();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let Some(input) = args.input else {
        eprintln!("error: no input path given");
        print_usage();
        return ExitCode::FAILURE;
    };

    let config = match &args.config {
        Some(path) => match RunConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig::default(),
    };

    let plan = match RunPlan::build(&input, &config) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match Pipeline::new(plan, quire::agent_label()).run() {
        Ok(summary) => {
            let pdf = summary
                .pdf_path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}: {} pages, {} steps, {} granulars, pdf {}",
                summary.identifier, summary.pages, summary.steps, summary.granulars, pdf
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
