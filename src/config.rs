//! Run configuration.
//!
//! One `HarnessConfig` is resolved per run and passed explicitly to every
//! component that needs it.

use std::path::{Path, PathBuf};

use crate::error::{HarnessError, HarnessResult};

/// Configuration property naming the job counter writer.
pub const COUNTER_WRITER_PROPERTY: &str = "gridgain.counters.writer";

/// Counter writer that persists job statistics into the filesystem.
pub const FS_COUNTER_WRITER: &str =
    "org.gridgain.grid.kernal.processors.hadoop.counter.GridHadoopFSCounterWriter";

/// Library artifacts the hadoop client needs on its classpath.
pub const DEFAULT_CLASSPATH_ARTIFACTS: [&str; 3] =
    ["gridgain-core", "gridgain-hadoop", "gridgain-jdk8-backport"];

/// Configuration for a harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Hadoop installation (`bin/hadoop`, `share/hadoop/mapreduce`).
    pub hadoop_home: PathBuf,
    /// Hive installation; query scenarios are skipped without it.
    pub hive_home: Option<PathBuf>,
    /// GridGain installation (`docs/*.gridgain.xml`, `libs/`).
    pub gridgain_home: PathBuf,
    /// Owner of the job statistics directory.
    pub user: String,
    /// Seed for generated datasets; entropy when absent.
    pub seed: Option<u64>,
    /// Artifact names composed into `HADOOP_CLASSPATH`.
    pub classpath_artifacts: Vec<String>,
    /// Property injected into `mapred-site.xml`.
    pub counter_writer_property: String,
    pub counter_writer_class: String,
    /// Local mount of the filesystem under test. Remote state is read through
    /// the filesystem CLI when absent.
    pub fs_root: Option<PathBuf>,
}

impl HarnessConfig {
    /// Config with default artifacts and counter writer for the given homes.
    pub fn new(hadoop_home: impl Into<PathBuf>, gridgain_home: impl Into<PathBuf>) -> Self {
        Self {
            hadoop_home: hadoop_home.into(),
            hive_home: None,
            gridgain_home: gridgain_home.into(),
            user: current_user(),
            seed: None,
            classpath_artifacts: DEFAULT_CLASSPATH_ARTIFACTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            counter_writer_property: COUNTER_WRITER_PROPERTY.to_string(),
            counter_writer_class: FS_COUNTER_WRITER.to_string(),
            fs_root: None,
        }
    }

    /// Checks that every configured location exists.
    pub fn validate(&self) -> HarnessResult<()> {
        require_dir("HADOOP_HOME", &self.hadoop_home)?;
        require_dir("GRIDGAIN_HOME", &self.gridgain_home)?;
        if let Some(ref hive_home) = self.hive_home {
            require_dir("HIVE_HOME", hive_home)?;
        }
        if let Some(ref root) = self.fs_root {
            require_dir("filesystem root", root)?;
        }
        if self.user.is_empty() {
            return Err(HarnessError::environment("user name hasn't been set"));
        }
        Ok(())
    }

    pub fn hadoop_bin(&self) -> PathBuf {
        self.hadoop_home.join("bin").join("hadoop")
    }

    pub fn hive_bin(&self) -> Option<PathBuf> {
        self.hive_home.as_ref().map(|h| h.join("bin").join("hive"))
    }

    /// Directory holding the hadoop examples jar.
    pub fn mapreduce_dir(&self) -> PathBuf {
        self.hadoop_home.join("share").join("hadoop").join("mapreduce")
    }

    /// Directory holding the `*.gridgain.xml` configuration templates.
    pub fn templates_dir(&self) -> PathBuf {
        self.gridgain_home.join("docs")
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.gridgain_home.join("libs")
    }

    /// Remote directory the execution engine writes job statistics into.
    pub fn stats_dir(&self) -> String {
        format!("/user/{}/", self.user)
    }
}

fn require_dir(what: &str, path: &Path) -> HarnessResult<()> {
    if path.as_os_str().is_empty() {
        return Err(HarnessError::environment(format!("{what} hasn't been set")));
    }
    if !path.is_dir() {
        return Err(HarnessError::environment(format!(
            "{what} is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Login name from `USER` or `USERNAME`.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}
