//! Driver configuration.
//!
//! A `CompilerConfig` carries everything the driver needs beyond the source
//! path: how far to run the pipeline, where output goes, and where the
//! expected-results oracle lives. Built with `with_*` methods so callers
//! only spell out what differs from the defaults.

use std::path::PathBuf;

/// Pipeline stages, in execution order. `--stop-after` picks one; the
/// default runs everything including the oracle comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Stage {
    Lex,
    Parse,
    Resolve,
    Tacky,
    Asm,
    Codegen,
    Assemble,
    Run,
    Test,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Resolve => "resolve",
            Stage::Tacky => "tacky",
            Stage::Asm => "asm",
            Stage::Codegen => "codegen",
            Stage::Assemble => "assemble",
            Stage::Run => "run",
            Stage::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Stage after which the driver stops.
    pub stop_after: Stage,
    /// Explicit output path for the produced binary; scratch space if unset.
    pub output: Option<PathBuf>,
    /// Keep the generated `.s` next to the source file.
    pub keep_asm: bool,
    /// Path to `expected_results.json`.
    pub expected_results: PathBuf,
    /// Directory the oracle's keys are relative to.
    pub tests_root: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            stop_after: Stage::Test,
            output: None,
            keep_asm: false,
            expected_results: PathBuf::from("expected_results.json"),
            tests_root: PathBuf::from("tests"),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_stop_after(mut self, stage: Stage) -> Self {
        self.stop_after = stage;
        self
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_keep_asm(mut self, keep: bool) -> Self {
        self.keep_asm = keep;
        self
    }

    pub fn with_expected_results(mut self, path: PathBuf) -> Self {
        self.expected_results = path;
        self
    }

    pub fn with_tests_root(mut self, path: PathBuf) -> Self {
        self.tests_root = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.stop_after, Stage::Test);
        assert!(config.output.is_none());
        assert!(!config.keep_asm);
        assert_eq!(
            config.expected_results,
            PathBuf::from("expected_results.json")
        );
    }

    #[test]
    fn test_builder_chain() {
        let config = CompilerConfig::new()
            .with_stop_after(Stage::Codegen)
            .with_keep_asm(true)
            .with_output(PathBuf::from("a.out"));
        assert_eq!(config.stop_after, Stage::Codegen);
        assert!(config.keep_asm);
        assert_eq!(config.output, Some(PathBuf::from("a.out")));
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Lex < Stage::Parse);
        assert!(Stage::Codegen < Stage::Assemble);
        assert!(Stage::Run < Stage::Test);
    }
}
