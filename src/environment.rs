//! Execution environment for the hadoop and hive clients.
//!
//! Builds the per-run working directory that doubles as `HADOOP_CONF_DIR`,
//! the patched configuration overlays and the client classpath.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult, IoContext};

/// Prefix of the per-run working directory.
pub const WORK_DIR_PREFIX: &str = "hadoop-cli-test";

/// Tag the counter writer property is inserted before.
pub const CLOSING_TAG: &str = "</configuration>";

const CORE_SITE_TEMPLATE: &str = "core-site.gridgain.xml";
const MAPRED_SITE_TEMPLATE: &str = "mapred-site.gridgain.xml";
const EXAMPLES_JAR_PREFIX: &str = "hadoop-mapreduce-examples-";

/// Environment variables and working directory for one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub vars: BTreeMap<String, OsString>,
    pub working_dir: PathBuf,
}

impl ExecutionEnvironment {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            working_dir: working_dir.into(),
        }
    }

    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Environment the hadoop and hive clients need to reach the cluster.
    pub fn for_hadoop(config: &HarnessConfig, conf_dir: &Path, classpath: OsString) -> Self {
        Self::new(conf_dir)
            .with_var("HADOOP_HOME", config.hadoop_home.as_os_str())
            .with_var("HADOOP_CLASSPATH", classpath)
            .with_var("HADOOP_CONF_DIR", conf_dir.as_os_str())
    }

    /// Applies this environment to a freshly built command.
    pub fn apply(&self, command: &mut Command) {
        command.current_dir(&self.working_dir);
        command.envs(&self.vars);
    }

    pub fn var(&self, name: &str) -> Option<&OsString> {
        self.vars.get(name)
    }
}

/// Working directory, configuration overlays and client environment of a run.
///
/// The directory is removed when the workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    env: ExecutionEnvironment,
    examples_jar: PathBuf,
}

impl Workspace {
    /// Validates `config` and prepares everything the clients need.
    pub fn prepare(config: &HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;

        let examples_jar = find_examples_jar(&config.mapreduce_dir())?;
        let classpath = compose_classpath(&config.libs_dir(), &config.classpath_artifacts)?;

        let dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir()
            .at_path(std::env::temp_dir())?;
        log::info!("Working directory: {}", dir.path().display());

        let templates = config.templates_dir();

        let core_src = templates.join(CORE_SITE_TEMPLATE);
        let core_dst = dir.path().join("core-site.xml");
        fs::copy(&core_src, &core_dst).at_path(&core_src)?;

        let mapred_src = templates.join(MAPRED_SITE_TEMPLATE);
        let template = fs::read_to_string(&mapred_src).at_path(&mapred_src)?;
        let patched = patch_template(
            &template,
            &config.counter_writer_property,
            &config.counter_writer_class,
        )
        .map_err(|e| match e {
            HarnessError::Environment(msg) => {
                HarnessError::environment(format!("{}: {msg}", mapred_src.display()))
            }
            other => other,
        })?;
        let mapred_dst = dir.path().join("mapred-site.xml");
        fs::write(&mapred_dst, patched).at_path(&mapred_dst)?;

        let env = ExecutionEnvironment::for_hadoop(config, dir.path(), classpath);

        Ok(Self {
            dir,
            env,
            examples_jar,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn env(&self) -> &ExecutionEnvironment {
        &self.env
    }

    pub fn examples_jar(&self) -> &Path {
        &self.examples_jar
    }

    /// Removes the working directory now, reporting failures.
    pub fn close(self) -> HarnessResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().at_path(path)
    }
}

/// Inserts a `<property>` block before the first line starting with
/// `</configuration>`. All other text is preserved as is.
pub fn patch_template(template: &str, name: &str, value: &str) -> HarnessResult<String> {
    let mut out = String::with_capacity(template.len() + 128);
    let mut patched = false;

    for line in template.split_inclusive('\n') {
        if !patched && line.starts_with(CLOSING_TAG) {
            out.push_str("    <property>\n");
            out.push_str(&format!("        <name>{name}</name>\n"));
            out.push_str(&format!("        <value>{value}</value>\n"));
            out.push_str("    </property>\n");
            patched = true;
        }
        out.push_str(line);
    }

    if patched {
        Ok(out)
    } else {
        Err(HarnessError::environment(format!(
            "closing {CLOSING_TAG} tag not found in configuration template"
        )))
    }
}

/// Locates the single hadoop mapreduce examples jar.
pub fn find_examples_jar(mapreduce_dir: &Path) -> HarnessResult<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(mapreduce_dir).at_path(mapreduce_dir)? {
        let path = entry.at_path(mapreduce_dir)?.path();
        let is_examples_jar = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| {
            n.starts_with(EXAMPLES_JAR_PREFIX)
                && Path::new(n).extension().is_some_and(|e| e == "jar")
        });
        if is_examples_jar {
            found.push(path);
        }
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        n => Err(HarnessError::environment(format!(
            "invalid hadoop distribution: expected one {EXAMPLES_JAR_PREFIX}*.jar in {}, found {n}",
            mapreduce_dir.display()
        ))),
    }
}

/// Joins the location of every artifact with the platform path separator.
///
/// An artifact `name` matches `name.jar` or `name-<version>.jar` anywhere under
/// `lib_dir`. Each must match exactly once.
pub fn compose_classpath(lib_dir: &Path, artifacts: &[String]) -> HarnessResult<OsString> {
    let mut jars = Vec::new();
    collect_jars(lib_dir, &mut jars)?;

    let mut entries = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let matches: Vec<&PathBuf> = jars
            .iter()
            .filter(|jar| is_artifact_jar(jar, artifact))
            .collect();
        match matches.as_slice() {
            [jar] => entries.push((*jar).clone()),
            [] => {
                return Err(HarnessError::environment(format!(
                    "library {artifact} not found under {}",
                    lib_dir.display()
                )))
            }
            several => {
                return Err(HarnessError::Ambiguous {
                    what: format!("library {artifact}"),
                    candidates: several.iter().map(|p| p.display().to_string()).collect(),
                })
            }
        }
    }

    std::env::join_paths(&entries)
        .map_err(|e| HarnessError::environment(format!("invalid classpath entry: {e}")))
}

fn collect_jars(dir: &Path, out: &mut Vec<PathBuf>) -> HarnessResult<()> {
    for entry in fs::read_dir(dir).at_path(dir)? {
        let path = entry.at_path(dir)?.path();
        if path.is_dir() {
            collect_jars(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "jar") {
            out.push(path);
        }
    }
    Ok(())
}

fn is_artifact_jar(jar: &Path, artifact: &str) -> bool {
    let Some(stem) = jar.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem == artifact
        || stem
            .strip_prefix(artifact)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|version| version.starts_with(|c: char| c.is_ascii_digit()))
}
