//! minicc compiler library.
//!
//! Compiles a single translation unit of a C subset to x86-64 System V
//! assembly (AT&T syntax). The pipeline is strictly sequential:
//!
//! ```text
//! source -> tokens -> AST -> resolved AST (+ symbol table)
//!        -> TAC -> assembly AST -> pseudo replacement -> fix-up -> text
//! ```
//!
//! [`compile_to_assembly`] runs the whole pipeline in memory;
//! [`compile_stages`] stops after a configurable stage for debugging.
//! [`assemble_and_link`] and [`run_binary`] hand the produced text to the
//! system `gcc` and execute the result, which is how the oracle harness in
//! [`test_runner`] checks exit codes against `expected_results.json`.

pub mod asm;
pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod names;
pub mod parser;
pub mod resolver;
pub mod tac;
pub mod test_runner;
pub mod typechecker;

pub use config::{CompilerConfig, Stage};
pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use names::NameContext;
pub use parser::{ParseError, Parser};
pub use resolver::{ResolveError, Resolver};
pub use tac::TacGen;
pub use test_runner::{ExpectedResults, TestRunner};
pub use typechecker::{SymbolTable, TypeCheckError, TypeChecker};

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Umbrella error for the whole driver: every stage's error converts into
/// it, so the pipeline composes with `?`.
#[derive(Debug)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Resolve(ResolveError),
    TypeCheck(TypeCheckError),
    Io(std::io::Error),
    /// Assembler/linker/runtime trouble outside the compiler proper.
    Toolchain(String),
    /// Problems with the expected-results oracle.
    Oracle(String),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "{}", e),
            CompileError::Parse(e) => write!(f, "{}", e),
            CompileError::Resolve(e) => write!(f, "{}", e),
            CompileError::TypeCheck(e) => write!(f, "{}", e),
            CompileError::Io(e) => write!(f, "{}", e),
            CompileError::Toolchain(message) => write!(f, "{}", message),
            CompileError::Oracle(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<ResolveError> for CompileError {
    fn from(e: ResolveError) -> Self {
        CompileError::Resolve(e)
    }
}

impl From<TypeCheckError> for CompileError {
    fn from(e: TypeCheckError) -> Self {
        CompileError::TypeCheck(e)
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e)
    }
}

/// Run the pipeline up to `stop_after`. Returns the assembly text once the
/// codegen stage has run, `None` if the cut-off comes earlier.
pub fn compile_stages(source: &str, stop_after: Stage) -> Result<Option<String>, CompileError> {
    let tokens = Lexer::new(source).lex()?;
    debug!(tokens = tokens.len(), "lexed");
    if stop_after == Stage::Lex {
        return Ok(None);
    }

    let program = Parser::new(tokens).parse()?;
    debug!(declarations = program.declarations.len(), "parsed");
    if stop_after == Stage::Parse {
        return Ok(None);
    }

    let mut names = NameContext::new();
    let program = Resolver::new(&mut names).resolve(program)?;
    let mut checker = TypeChecker::new();
    checker.check_program(&program)?;
    let symbols = checker.into_symbols();
    debug!("resolved and type-checked");
    if stop_after == Stage::Resolve {
        return Ok(None);
    }

    let tac = TacGen::new(&mut names, &symbols).lower_program(&program);
    debug!(top_level = tac.top_level.len(), "lowered to TAC");
    if stop_after == Stage::Tacky {
        return Ok(None);
    }

    let mut assembly = codegen::gen_program(&tac);
    codegen::replace_pseudos(&mut assembly, &symbols);
    let assembly = codegen::fix_program(assembly);
    debug!("generated assembly");
    if stop_after == Stage::Asm {
        return Ok(None);
    }

    Ok(Some(assembly.to_string()))
}

/// Full source-to-text compilation.
pub fn compile_to_assembly(source: &str) -> Result<String, CompileError> {
    match compile_stages(source, Stage::Codegen)? {
        Some(text) => Ok(text),
        None => unreachable!("codegen stage produced no text"),
    }
}

/// The produced executable plus the scratch directory keeping it alive.
pub struct BuildArtifacts {
    pub binary: PathBuf,
    _scratch: Option<tempfile::TempDir>,
}

/// Sibling client translation unit, if the test provides one: first
/// `<stem>_client.c`, then `<stem>_client.s`.
fn find_client(source_path: &Path) -> Option<PathBuf> {
    let stem = source_path.file_stem()?.to_str()?;
    for ext in ["c", "s"] {
        let candidate = source_path.with_file_name(format!("{}_client.{}", stem, ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn run_gcc(args: &[&std::ffi::OsStr]) -> Result<(), CompileError> {
    debug!(?args, "gcc");
    let output = Command::new("gcc").args(args).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(CompileError::Toolchain(format!(
            "gcc failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}

/// Write the assembly to scratch space and let `gcc` assemble and link it,
/// together with the sibling client object when one exists.
pub fn assemble_and_link(
    assembly: &str,
    source_path: &Path,
    config: &CompilerConfig,
) -> Result<BuildArtifacts, CompileError> {
    let scratch = tempfile::tempdir()?;
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    let asm_path = scratch.path().join(format!("{}.s", stem));
    std::fs::write(&asm_path, assembly)?;
    if config.keep_asm {
        std::fs::write(source_path.with_extension("s"), assembly)?;
    }

    let binary = match &config.output {
        Some(path) => path.clone(),
        None => scratch.path().join(format!("{}.out", stem)),
    };

    match find_client(source_path) {
        None => {
            run_gcc(&[
                "-o".as_ref(),
                binary.as_os_str(),
                asm_path.as_os_str(),
            ])?;
        }
        Some(client) if client.extension().is_some_and(|e| e == "s") => {
            // Hand-written assembly client: assemble it, link with ours.
            let client_obj = scratch.path().join("client.o");
            run_gcc(&[
                "-fPIE".as_ref(),
                "-c".as_ref(),
                "-o".as_ref(),
                client_obj.as_os_str(),
                client.as_os_str(),
            ])?;
            run_gcc(&[
                "-fPIE".as_ref(),
                "-o".as_ref(),
                binary.as_os_str(),
                asm_path.as_os_str(),
                client_obj.as_os_str(),
            ])?;
        }
        Some(client) => {
            // C client: assemble our output to an object, compile and link
            // the client against it.
            let object = scratch.path().join(format!("{}.o", stem));
            run_gcc(&[
                "-fPIE".as_ref(),
                "-c".as_ref(),
                "-o".as_ref(),
                object.as_os_str(),
                asm_path.as_os_str(),
            ])?;
            run_gcc(&[
                "-fPIE".as_ref(),
                "-o".as_ref(),
                binary.as_os_str(),
                client.as_os_str(),
                object.as_os_str(),
            ])?;
        }
    }

    Ok(BuildArtifacts {
        binary,
        _scratch: Some(scratch),
    })
}

/// Execute the produced binary; its exit status encodes the program's
/// return value (mod 256 by the OS).
pub fn run_binary(binary: &Path) -> Result<i32, CompileError> {
    let output = Command::new(binary).output()?;
    output.status.code().ok_or_else(|| {
        CompileError::Toolchain(format!("{} terminated by signal", binary.display()))
    })
}

/// What driving one source file produced.
#[derive(Debug)]
pub enum FileOutcome {
    /// The pipeline stopped at the configured stage before emitting text.
    Stopped(Stage),
    /// Assembly text, when the drive stops after codegen.
    Assembly(String),
    /// Exit status of the produced executable, when the drive stops after
    /// running it.
    Ran(i32),
    /// Result of the oracle comparison.
    Tested {
        expected: i32,
        actual: i32,
        passed: bool,
    },
}

/// Drive one source file as far as the configuration asks: read it, run the
/// pipeline, assemble and link, execute, and compare the exit status
/// against the oracle. Both the CLI and the batch harness go through here.
///
/// Pass a preloaded oracle to skip re-reading `expected_results.json` per
/// file; with `None` it is loaded on demand for the final comparison.
pub fn compile_file(
    source_path: &Path,
    config: &CompilerConfig,
    expected: Option<&ExpectedResults>,
) -> Result<FileOutcome, CompileError> {
    let source = std::fs::read_to_string(source_path)?;

    let Some(assembly) = compile_stages(&source, config.stop_after)? else {
        return Ok(FileOutcome::Stopped(config.stop_after));
    };

    if config.stop_after == Stage::Codegen {
        if config.keep_asm {
            std::fs::write(source_path.with_extension("s"), &assembly)?;
        }
        return Ok(FileOutcome::Assembly(assembly));
    }

    let artifacts = assemble_and_link(&assembly, source_path, config)?;
    if config.stop_after == Stage::Assemble {
        return Ok(FileOutcome::Stopped(Stage::Assemble));
    }

    let actual = run_binary(&artifacts.binary)?;
    if config.stop_after == Stage::Run {
        return Ok(FileOutcome::Ran(actual));
    }

    let loaded;
    let expected = match expected {
        Some(map) => map,
        None => {
            loaded = test_runner::load_expected(&config.expected_results)?;
            &loaded
        }
    };
    let key = test_runner::oracle_key(source_path, &config.tests_root);
    let Some(want) = expected.get(&key) else {
        return Err(CompileError::Oracle(format!(
            "no expected result for {}",
            key
        )));
    };

    Ok(FileOutcome::Tested {
        expected: want.return_code,
        actual,
        passed: actual == want.return_code,
    })
}
