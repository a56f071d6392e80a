//! minicc CLI.
//!
//! `minicc <file.c> [--stop-after STAGE]` compiles one translation unit,
//! optionally stopping after any pipeline stage. The default runs all the
//! way to the expected-results comparison. Pointing it at a directory runs
//! every test program underneath it. All driving happens in the library's
//! [`compile_file`]; this binary only parses flags and reports outcomes.

use clap::Parser as ClapParser;
use minicc::config::{CompilerConfig, Stage};
use minicc::test_runner::TestRunner;
use minicc::{FileOutcome, compile_file};
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "minicc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a C subset to x86-64 System V assembly", long_about = None)]
struct Cli {
    /// C source file, or a directory of test programs
    input: PathBuf,

    /// Stop the pipeline after this stage
    #[arg(long, value_enum, default_value_t = Stage::Test)]
    stop_after: Stage,

    /// Write the produced binary here instead of scratch space
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep the generated .s next to the source file
    #[arg(long)]
    keep_asm: bool,

    /// Expected-results oracle (JSON keyed by test-relative path)
    #[arg(long, default_value = "expected_results.json")]
    expected: PathBuf,

    /// Directory the oracle's keys are relative to
    #[arg(long, default_value = "tests")]
    tests_root: PathBuf,

    /// Only run tests whose path contains this substring (directory mode)
    #[arg(short, long)]
    filter: Option<String>,

    /// Show expected/actual detail for passing tests too
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CompilerConfig {
        stop_after: cli.stop_after,
        output: cli.output.clone(),
        keep_asm: cli.keep_asm,
        expected_results: cli.expected.clone(),
        tests_root: cli.tests_root.clone(),
    };

    if cli.input.is_dir() {
        run_directory(&cli.input, config, cli.verbose, cli.filter);
    } else {
        run_single(&cli.input, &config);
    }
}

fn run_directory(input: &Path, config: CompilerConfig, verbose: bool, filter: Option<String>) {
    let runner = TestRunner::new(config, verbose, filter);
    match runner.run(&[input.to_path_buf()]) {
        Ok(summary) => {
            runner.print_results(&summary);
            if summary.failed > 0 {
                process::exit(1);
            }
            if summary.total == 0 {
                eprintln!("No test programs found under {}", input.display());
                process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_single(input: &Path, config: &CompilerConfig) {
    // A *_client.c is a link input for some other test, not a translation
    // unit of its own.
    if input
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("_client.c"))
    {
        return;
    }

    match compile_file(input, config, None) {
        Ok(outcome) => report_outcome(input, config, outcome),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn report_outcome(input: &Path, config: &CompilerConfig, outcome: FileOutcome) {
    match outcome {
        FileOutcome::Stopped(_) => {}
        FileOutcome::Assembly(text) => {
            // --keep-asm already put it next to the source.
            if !config.keep_asm {
                print!("{}", text);
            }
        }
        FileOutcome::Ran(code) => println!("{} exited with {}", input.display(), code),
        FileOutcome::Tested {
            expected,
            actual,
            passed,
        } => {
            if passed {
                println!("  {} ... ok", input.display());
            } else {
                println!(
                    "  {} ... FAILED: expected {} got {}",
                    input.display(),
                    expected,
                    actual
                );
                process::exit(1);
            }
        }
    }
}
