//! Expected-results oracle harness.
//!
//! Discovers C test programs, runs each through the full
//! compile → link → run flow, and compares the exit status against
//! `expected_results.json`, a map from test-relative path to
//! `{ "return_code": N }`. Sibling `*_client.c` files are link inputs for
//! other tests, never tests themselves.

use crate::config::{CompilerConfig, Stage};
use crate::{CompileError, FileOutcome, compile_file};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExpectedResult {
    pub return_code: i32,
}

pub type ExpectedResults = HashMap<String, ExpectedResult>;

pub fn load_expected(path: &Path) -> Result<ExpectedResults, CompileError> {
    let content = fs::read_to_string(path).map_err(|e| {
        CompileError::Oracle(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CompileError::Oracle(format!("malformed {}: {}", path.display(), e)))
}

/// Key into the oracle: the path relative to the tests root, unchanged if
/// it does not live under it.
pub fn oracle_key(path: &Path, tests_root: &Path) -> String {
    path.strip_prefix(tests_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Result of one test program.
#[derive(Debug)]
pub struct TestOutcome {
    pub path: PathBuf,
    pub passed: bool,
    pub expected: Option<i32>,
    pub actual: Option<i32>,
    /// Failure detail when the test never got as far as a comparison.
    pub error: Option<String>,
}

impl TestOutcome {
    fn failed(path: &Path, error: String) -> Self {
        TestOutcome {
            path: path.to_path_buf(),
            passed: false,
            expected: None,
            actual: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<TestOutcome>,
}

pub struct TestRunner {
    pub config: CompilerConfig,
    pub verbose: bool,
    pub filter: Option<String>,
}

impl TestRunner {
    pub fn new(config: CompilerConfig, verbose: bool, filter: Option<String>) -> Self {
        TestRunner {
            config,
            verbose,
            filter,
        }
    }

    fn is_test_file(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|e| e != "c") {
            return false;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        !stem.ends_with("_client")
    }

    fn matches_filter(&self, path: &Path) -> bool {
        match &self.filter {
            Some(pattern) => path.to_string_lossy().contains(pattern.as_str()),
            None => true,
        }
    }

    /// Walk the given paths for `.c` test programs, sorted for stable
    /// ordering.
    pub fn discover_test_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                self.discover_in_directory(path, &mut files);
            } else if self.is_test_file(path) && self.matches_filter(path) {
                files.push(path.clone());
            }
        }
        files.sort();
        files
    }

    fn discover_in_directory(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.discover_in_directory(&path, files);
            } else if self.is_test_file(&path) && self.matches_filter(&path) {
                files.push(path);
            }
        }
    }

    pub fn oracle_key(&self, path: &Path) -> String {
        oracle_key(path, &self.config.tests_root)
    }

    /// Drive one file through the full test flow, normalizing every failure
    /// into a `TestOutcome`.
    pub fn run_file(&self, path: &Path, expected: &ExpectedResults) -> TestOutcome {
        let config = self.config.clone().with_stop_after(Stage::Test);
        match compile_file(path, &config, Some(expected)) {
            Ok(FileOutcome::Tested {
                expected,
                actual,
                passed,
            }) => TestOutcome {
                path: path.to_path_buf(),
                passed,
                expected: Some(expected),
                actual: Some(actual),
                error: None,
            },
            Ok(outcome) => {
                unreachable!("test drive stopped early with {:?}", outcome)
            }
            Err(e) => TestOutcome::failed(path, e.to_string()),
        }
    }

    pub fn run(&self, paths: &[PathBuf]) -> Result<TestSummary, CompileError> {
        let expected = load_expected(&self.config.expected_results)?;
        let mut summary = TestSummary::default();
        for path in self.discover_test_files(paths) {
            let outcome = self.run_file(&path, &expected);
            summary.total += 1;
            if outcome.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary.outcomes.push(outcome);
        }
        Ok(summary)
    }

    pub fn print_results(&self, summary: &TestSummary) {
        for outcome in &summary.outcomes {
            let status = if outcome.passed { "ok" } else { "FAILED" };
            if outcome.passed && !self.verbose {
                println!("  {} ... {}", outcome.path.display(), status);
                continue;
            }
            match (&outcome.error, outcome.expected, outcome.actual) {
                (Some(error), _, _) => {
                    println!("  {} ... {}: {}", outcome.path.display(), status, error)
                }
                (None, Some(expected), Some(actual)) if !outcome.passed => println!(
                    "  {} ... {}: expected {} got {}",
                    outcome.path.display(),
                    status,
                    expected,
                    actual
                ),
                (None, _, Some(actual)) => println!(
                    "  {} ... {} (returned {})",
                    outcome.path.display(),
                    status,
                    actual
                ),
                _ => println!("  {} ... {}", outcome.path.display(), status),
            }
        }

        println!(
            "\nResults: {} passed, {} failed",
            summary.passed, summary.failed
        );
    }
}
