//! hadoop-cli-e2e: CLI entry point.
//!
//! Runs the command line integration scenarios against a live cluster.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;

use hadoop_cli_e2e::config::{current_user, HarnessConfig};
use hadoop_cli_e2e::drivers::{check_available, FsCli};
use hadoop_cli_e2e::environment::Workspace;
use hadoop_cli_e2e::scenario::Harness;
use hadoop_cli_e2e::types::{load_scenario_dir, ScenarioSpec, TestResult};

#[derive(Parser)]
#[command(name = "hadoop-cli-e2e")]
#[command(about = "E2E validation of the Hadoop accelerator through the hadoop and hive CLIs")]
#[command(version)]
struct Cli {
    /// Run all scenarios (headless mode with colored output).
    #[arg(long)]
    all: bool,

    /// Run only the named scenario. Repeatable.
    #[arg(long, value_name = "NAME")]
    only: Vec<String>,

    /// Path to scenario specs directory.
    #[arg(short, long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Hadoop installation.
    #[arg(long, env = "HADOOP_HOME")]
    hadoop_home: PathBuf,

    /// Hive installation. Query scenarios are skipped without it.
    #[arg(long, env = "HIVE_HOME")]
    hive_home: Option<PathBuf>,

    /// GridGain installation holding configuration templates and libraries.
    #[arg(long, env = "GRIDGAIN_HOME")]
    gridgain_home: PathBuf,

    /// Owner of the job statistics directory (defaults to the login name).
    #[arg(long)]
    user: Option<String>,

    /// Seed for generated datasets.
    #[arg(long)]
    seed: Option<u64>,

    /// Read remote state through this local mount instead of the hadoop client.
    #[arg(long)]
    fs_root: Option<PathBuf>,

    /// Library artifact to put on the client classpath. Repeatable; replaces
    /// the default set.
    #[arg(long = "classpath-artifact", value_name = "NAME")]
    classpath_artifacts: Vec<String>,

    /// Print results as JSON after the summary.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let scenarios = select_scenarios(load_scenario_dir(&cli.scenarios)?, &cli.only)?;
    if !cli.all && cli.only.is_empty() {
        println!("Loaded {} scenarios", scenarios.len());
        println!("Use --all to run all scenarios");
        return Ok(());
    }

    let config = build_config(&cli);
    let workspace = Workspace::prepare(&config)?;

    let version = check_available(&FsCli::new(config.hadoop_bin()), workspace.env())
        .map_err(|e| anyhow::anyhow!("hadoop client is not usable: {e}"))?;

    println!("{}", "hadoop-cli-e2e".bold());
    println!("  Hadoop: {} ({version})", config.hadoop_home.display());
    match config.hive_home {
        Some(ref hive) => println!("  Hive: {}", hive.display()),
        None => println!("  Hive: {}", "not configured".dimmed()),
    }
    println!("  GridGain: {}", config.gridgain_home.display());
    println!("  Work dir: {}", workspace.path().display());
    println!("  Scenarios: {}", cli.scenarios.display());
    println!();

    let results = run_all_mode(&scenarios, &config, &workspace);
    let failed = results.iter().filter(|r| r.is_fail()).count();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Exiting skips destructors: remove the working directory first.
    workspace.close()?;

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn build_config(cli: &Cli) -> HarnessConfig {
    let mut config = HarnessConfig::new(&cli.hadoop_home, &cli.gridgain_home);
    config.hive_home.clone_from(&cli.hive_home);
    config.user = cli.user.clone().unwrap_or_else(current_user);
    config.seed = cli.seed;
    config.fs_root.clone_from(&cli.fs_root);
    if !cli.classpath_artifacts.is_empty() {
        config.classpath_artifacts.clone_from(&cli.classpath_artifacts);
    }
    config
}

fn select_scenarios(
    scenarios: Vec<ScenarioSpec>,
    only: &[String],
) -> anyhow::Result<Vec<ScenarioSpec>> {
    if let Some(unknown) = only
        .iter()
        .find(|name| !scenarios.iter().any(|s| &s.name == *name))
    {
        anyhow::bail!("Unknown scenario: {unknown}");
    }
    if only.is_empty() {
        return Ok(scenarios);
    }
    Ok(scenarios
        .into_iter()
        .filter(|s| only.contains(&s.name))
        .collect())
}

fn run_all_mode(
    scenarios: &[ScenarioSpec],
    config: &HarnessConfig,
    workspace: &Workspace,
) -> Vec<TestResult> {
    let start = Instant::now();
    let mut harness = Harness::new(config, workspace);
    let mut results = Vec::new();

    println!("{}", "Running scenarios...".cyan());

    for scenario in scenarios {
        let result = harness.run(scenario);
        print_result(&result);
        results.push(result);
    }

    let elapsed = start.elapsed();

    // Summary
    println!();
    println!("{}", "=".repeat(60));

    let passed = results.iter().filter(|r| r.is_pass()).count();
    let failed = results.iter().filter(|r| r.is_fail()).count();
    let skipped = results.iter().filter(|r| r.is_skip()).count();

    if failed == 0 {
        println!(
            "  {} {} passed, {} skipped in {:.2}s",
            "PASS".green(),
            passed.to_string().green(),
            skipped,
            elapsed.as_secs_f64()
        );
    } else {
        println!(
            "  {} {} passed, {} failed, {} skipped in {:.2}s",
            "FAIL".red(),
            passed,
            failed.to_string().red(),
            skipped,
            elapsed.as_secs_f64()
        );
    }

    println!("{}", "=".repeat(60));

    results
}

fn print_result(result: &TestResult) {
    match result {
        TestResult::Pass { name, details } => {
            println!("  {} {} ({})", "✓".green(), name, details.dimmed());
        }
        TestResult::Fail { name, reason } => {
            println!("  {} {}", "✗".red(), name.red());
            println!("      {reason}");
        }
        TestResult::Error { name, error } => {
            println!("  {} {} (error)", "✗".red(), name.red());
            println!("      {error}");
        }
        TestResult::Skip { name, reason } => {
            println!("  {} {} ({})", "○".yellow(), name.dimmed(), reason.dimmed());
        }
    }
}
