//! Scenario orchestration.
//!
//! Each scenario issues one external command at a time, fails on the first
//! non-zero exit and verifies filesystem state between commands.

use std::fs;
use std::io::BufReader;

use crate::config::HarnessConfig;
use crate::drivers::{FsCli, QueryCli};
use crate::environment::Workspace;
use crate::error::{HarnessError, HarnessResult, IoContext};
use crate::generator::{self, RandomSource, SeededRandom};
use crate::job_stats::parse_job_stats;
use crate::process::{CommandLine, LogForwarder};
use crate::remote_fs::{join_remote, CliRemoteFs, LocalRemoteFs, RemoteFs};
use crate::types::{JoinSpec, ScenarioKind, ScenarioSpec, TestResult, WordCountSpec};
use crate::verifier;

/// Name of the statistics file inside a job statistics directory.
pub const PERFORMANCE_FILE: &str = "performance";

/// First output file of a single-reducer job.
pub const JOB_OUTPUT_FILE: &str = "part-r-00000";

/// First output file of a query result table.
pub const QUERY_OUTPUT_FILE: &str = "000000_0";

const RESULT_TABLE: &str = "result";

/// Drives scenarios against one prepared workspace.
pub struct Harness<'a> {
    config: &'a HarnessConfig,
    workspace: &'a Workspace,
    fs_cli: FsCli,
    query_cli: Option<QueryCli>,
    remote: Box<dyn RemoteFs + 'a>,
    rng: Box<dyn RandomSource + 'a>,
}

impl<'a> Harness<'a> {
    /// Harness reading remote state through the local mount when configured,
    /// through the hadoop client otherwise.
    pub fn new(config: &'a HarnessConfig, workspace: &'a Workspace) -> Self {
        let fs_cli = FsCli::new(config.hadoop_bin());
        let query_cli = config
            .hive_bin()
            .map(|bin| QueryCli::new(bin, workspace.path()));
        let remote: Box<dyn RemoteFs> = match config.fs_root {
            Some(ref root) => Box::new(LocalRemoteFs::new(root)),
            None => Box::new(CliRemoteFs::new(
                fs_cli.clone(),
                workspace.env().clone(),
                workspace.path(),
            )),
        };

        Self {
            config,
            workspace,
            fs_cli,
            query_cli,
            remote,
            rng: Box::new(SeededRandom::new(config.seed)),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl RemoteFs + 'a) -> Self {
        self.remote = Box::new(remote);
        self
    }

    #[must_use]
    pub fn with_random(mut self, rng: impl RandomSource + 'a) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Runs one scenario, turning its outcome into a [`TestResult`].
    pub fn run(&mut self, spec: &ScenarioSpec) -> TestResult {
        let name = spec.name.clone();
        log::info!("Scenario {name}: starting");

        let outcome = match spec.kind {
            ScenarioKind::WordCount(ref wc) => self.word_count(&name, wc),
            ScenarioKind::Join(ref join) => {
                if self.query_cli.is_none() {
                    return TestResult::Skip {
                        name,
                        reason: "HIVE_HOME hasn't been set".to_string(),
                    };
                }
                self.join(join)
            }
        };

        match outcome {
            Ok(details) => {
                log::info!("Scenario {name}: passed");
                TestResult::Pass { name, details }
            }
            Err(e) if e.is_verification_failure() => {
                log::error!("Scenario {name}: {e}");
                TestResult::Fail {
                    name,
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                log::error!("Scenario {name}: {e}");
                TestResult::Error {
                    name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Runs a hadoop client command that must succeed.
    fn hadoop(&self, cmd: &CommandLine) -> HarnessResult<()> {
        let code = self.fs_cli.run(cmd, self.workspace.env(), &mut LogForwarder)?;
        verifier::ensure_success(code, cmd)
    }

    /// Runs a query that must succeed.
    fn hive(&self, query: &str) -> HarnessResult<()> {
        let Some(ref cli) = self.query_cli else {
            return Err(HarnessError::environment("HIVE_HOME hasn't been set"));
        };
        let code = cli.run(query, self.workspace.env(), &mut LogForwarder)?;
        verifier::ensure_success(code, &cli.command(query))
    }

    fn word_count(&mut self, name: &str, spec: &WordCountSpec) -> HarnessResult<String> {
        let local_input = self.workspace.path().join(&spec.input_file);
        generator::write_word_file(&local_input, &spec.words, &mut *self.rng)?;

        self.hadoop(&self.fs_cli.ls("/"))?;
        self.hadoop(&self.fs_cli.mkdir(&spec.input_dir))?;
        self.hadoop(&self.fs_cli.put(&local_input, &spec.input_dir))?;

        let remote_input = join_remote(&spec.input_dir, &spec.input_file);
        verifier::assert_exists(self.remote.as_ref(), &remote_input)?;

        let uploaded = self.remote.read(&remote_input)?;
        let original = fs::read(&local_input).at_path(&local_input)?;
        verifier::assert_round_trip(&format!("uploaded {remote_input}"), &original, &uploaded)?;

        let examples_jar = self.workspace.examples_jar();
        self.hadoop(&self.fs_cli.jar(
            examples_jar,
            [
                spec.job.as_str(),
                spec.input_dir.as_str(),
                spec.output_dir.as_str(),
            ],
        ))?;

        let stats_dir = self.config.stats_dir();
        verifier::assert_exists(self.remote.as_ref(), &stats_dir)?;
        let job_dir = verifier::single_child(self.remote.as_ref(), &stats_dir, "job statistics")?;

        let local_stats = self.workspace.path().join(format!("{name}-{PERFORMANCE_FILE}"));
        self.hadoop(
            &self
                .fs_cli
                .get(&join_remote(&job_dir, PERFORMANCE_FILE), &local_stats),
        )?;
        let stats_file = fs::File::open(&local_stats).at_path(&local_stats)?;
        let stats = parse_job_stats(BufReader::new(stats_file))?;
        log::info!(
            "Job statistics: {} events on {} node(s)",
            stats.total(),
            stats.nodes.len()
        );
        if let Some(min) = spec.min_events {
            verifier::assert_min_events(&stats, min)?;
        }

        verifier::assert_exists(self.remote.as_ref(), &spec.output_dir)?;
        let output = self
            .remote
            .read(&join_remote(&spec.output_dir, JOB_OUTPUT_FILE))?;
        verifier::assert_sorted_lines(
            &format!("{} output", spec.job),
            &output,
            &spec.expected,
        )?;

        Ok(format!(
            "{} lines matched, {} statistics events",
            spec.expected.len(),
            stats.total()
        ))
    }

    fn join(&self, spec: &JoinSpec) -> HarnessResult<String> {
        let (table_a, table_b) = generator::write_join_tables(self.workspace.path())?;

        self.hive(&create_table_ddl(
            "table_a",
            "id_a int, id_b int",
            &spec.table_a_location,
        ))?;
        self.hadoop(&self.fs_cli.put(&table_a, &spec.table_a_location))?;

        self.hive(&create_table_ddl(
            "table_b",
            "id_b int, rndv int",
            &spec.table_b_location,
        ))?;
        self.hadoop(&self.fs_cli.put(&table_b, &spec.table_b_location))?;

        for check in &spec.checks {
            self.check_query(&spec.result_location, &check.query, &check.expected)?;
        }

        Ok(format!("{} queries matched", spec.checks.len()))
    }

    /// Materializes `query` into the result table and compares its content.
    fn check_query(&self, result_location: &str, query: &str, expected: &str) -> HarnessResult<()> {
        self.hive(&format!("drop table if exists {RESULT_TABLE}"))?;
        self.hive(&create_result_ddl(result_location, query))?;

        let content = self
            .remote
            .read(&join_remote(result_location, QUERY_OUTPUT_FILE))?;
        verifier::assert_exact(&format!("result of {query:?}"), &content, expected)
    }
}

/// Tab-delimited text table stored at `location`.
pub fn create_table_ddl(table: &str, columns: &str, location: &str) -> String {
    format!(
        "create table {table} ({columns}) \
         row format delimited fields terminated by '\\t' \
         stored as textfile \
         location '{location}'"
    )
}

/// Space-delimited result table populated from `query`.
pub fn create_result_ddl(location: &str, query: &str) -> String {
    format!(
        "create table {RESULT_TABLE} \
         row format delimited fields terminated by ' ' \
         stored as textfile \
         location '{location}' as {query}"
    )
}
