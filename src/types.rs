//! Common types for hadoop-cli-e2e.
//!
//! Defines the declarative scenario files and per-scenario results.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A word and the number of times it must occur in a generated dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSpec {
    pub word: String,
    pub count: usize,
}

impl WordSpec {
    pub fn new(word: impl Into<String>, count: usize) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// Scenario specification.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSpec {
    /// Scenario name (populated from `HashMap` key).
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: ScenarioKind,
}

/// What a scenario drives.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Filesystem CLI plus the examples wordcount job.
    WordCount(WordCountSpec),
    /// Query CLI over the two generated join tables.
    Join(JoinSpec),
}

/// Word count scenario: upload a generated file, run a job, check its output.
#[derive(Debug, Clone, Deserialize)]
pub struct WordCountSpec {
    /// Words and their counts.
    pub words: Vec<WordSpec>,
    /// Remote directory the file is uploaded into.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    /// Local (and remote) name of the generated file.
    #[serde(default = "default_input_file")]
    pub input_file: String,
    /// Remote directory the job writes to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Program name inside the examples jar.
    #[serde(default = "default_job")]
    pub job: String,
    /// Expected output lines, in sorted order.
    pub expected: Vec<String>,
    /// Lower bound on qualifying events in the job statistics file.
    pub min_events: Option<u64>,
}

fn default_input_dir() -> String {
    "/input".to_string()
}

fn default_input_file() -> String {
    "test-data".to_string()
}

fn default_output_dir() -> String {
    "/output".to_string()
}

fn default_job() -> String {
    "wordcount".to_string()
}

/// Join scenario: load both tables, then run each check through a result table.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinSpec {
    #[serde(default = "default_table_a_location")]
    pub table_a_location: String,
    #[serde(default = "default_table_b_location")]
    pub table_b_location: String,
    /// Location of the table each check query is materialized into.
    #[serde(default = "default_result_location")]
    pub result_location: String,
    pub checks: Vec<QueryCheck>,
}

fn default_table_a_location() -> String {
    "/table-a".to_string()
}

fn default_table_b_location() -> String {
    "/table-b".to_string()
}

fn default_result_location() -> String {
    "/result".to_string()
}

/// A query and the exact text its result table must contain.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryCheck {
    pub query: String,
    pub expected: String,
}

/// Result of running a scenario.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TestResult {
    /// Scenario passed.
    Pass { name: String, details: String },
    /// The system under test misbehaved.
    Fail { name: String, reason: String },
    /// The harness could not run the scenario.
    Error { name: String, error: String },
    /// Scenario was skipped.
    Skip { name: String, reason: String },
}

impl TestResult {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. } | Self::Error { .. })
    }

    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pass { name, .. }
            | Self::Fail { name, .. }
            | Self::Error { name, .. }
            | Self::Skip { name, .. } => name,
        }
    }
}

/// Scenario file structure.
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    /// Scenarios in this file.
    #[serde(default)]
    pub tests: HashMap<String, ScenarioSpec>,
}

/// Loads scenario specs from a YAML file, ordered by name.
pub fn load_scenarios(content: &str) -> anyhow::Result<Vec<ScenarioSpec>> {
    let file: ScenarioFile = serde_yaml_ng::from_str(content)?;
    let mut scenarios = Vec::new();

    for (name, mut spec) in file.tests {
        spec.name = name;
        scenarios.push(spec);
    }
    scenarios.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(scenarios)
}

/// Loads every `*.yaml` / `*.yml` file in `dir`, in file name order.
///
/// A file that fails to parse aborts the load.
pub fn load_scenario_dir(dir: &Path) -> anyhow::Result<Vec<ScenarioSpec>> {
    let mut all = Vec::new();

    if !dir.exists() {
        anyhow::bail!("Scenarios directory not found: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();

    for path in paths {
        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let scenarios = load_scenarios(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            all.extend(scenarios);
        }
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word_count_scenario() {
        let yaml = r#"
tests:
  small:
    kind: word_count
    words:
      - { word: a, count: 3 }
    expected: ["a\t3"]
"#;
        let scenarios = load_scenarios(yaml).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "small");
        let ScenarioKind::WordCount(ref spec) = scenarios[0].kind else {
            panic!("expected a word count scenario");
        };
        assert_eq!(spec.words, vec![WordSpec::new("a", 3)]);
        assert_eq!(spec.input_dir, "/input");
        assert_eq!(spec.output_dir, "/output");
        assert_eq!(spec.job, "wordcount");
        assert_eq!(spec.expected, vec!["a\t3".to_string()]);
        assert_eq!(spec.min_events, None);
    }

    #[test]
    fn test_shipped_scenarios_parse() {
        let scenarios = load_scenarios(include_str!("../scenarios/command_line.yaml")).unwrap();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["hadoop_command_line", "hive_command_line"]);

        let ScenarioKind::WordCount(ref wc) = scenarios[0].kind else {
            panic!("expected a word count scenario");
        };
        assert_eq!(wc.words.iter().map(|w| w.count).sum::<usize>(), 500);
        assert_eq!(wc.min_events, Some(22));
        assert_eq!(wc.expected, ["blue\t150", "green\t200", "red\t100", "yellow\t50"]);

        let ScenarioKind::Join(ref join) = scenarios[1].kind else {
            panic!("expected a join scenario");
        };
        assert_eq!(join.checks.len(), 4);
        assert!(join.checks[2].expected.starts_with("250 500 2002\n"));
        assert_eq!(join.checks[3].expected, "1000\n");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let yaml = r"
tests:
  odd:
    kind: teragen
";
        assert!(load_scenarios(yaml).is_err());
    }

    #[test]
    fn test_failures_and_errors_both_count_as_failed() {
        let fail = TestResult::Fail {
            name: "a".to_string(),
            reason: "r".to_string(),
        };
        let error = TestResult::Error {
            name: "b".to_string(),
            error: "e".to_string(),
        };
        assert!(fail.is_fail());
        assert!(error.is_fail());
        assert_eq!(error.name(), "b");
    }

    #[test]
    fn test_scenario_dir_loads_yaml_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.yaml"),
            "tests:\n  second:\n    kind: join\n    checks: []\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.yml"),
            "tests:\n  first:\n    kind: word_count\n    words: []\n    expected: []\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not yaml: [").unwrap();

        let scenarios = load_scenario_dir(dir.path()).unwrap();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_scenario_dir_with_unparseable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.yaml"), "tests:\n  ok:\n    kind: join\n    checks: []\n").unwrap();
        fs::write(dir.path().join("broken.yaml"), "tests:\n  bad:\n    kind: teragen\n").unwrap();

        let err = load_scenario_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"), "{err}");
    }

    #[test]
    fn test_missing_scenario_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_scenario_dir(&dir.path().join("absent")).is_err());
    }
}
