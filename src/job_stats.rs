//! Job statistics file parsing.
//!
//! The filesystem counter writer stores one `performance` file per job run.
//! Each line is an event `<descriptor>:<timestamp>`:
//!
//! - `JOB <phase>:<ts>` for job-level events;
//! - `<TYPE> <number> <phase> <node>:<ts>` for task events.
//!
//! Phases are `submit`, `prepare`, `start`, `finish`, `requestId` and
//! `responseId`. Shuffle and reduce tasks with the same number must have run
//! on the same node.

use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;

use crate::error::{HarnessError, HarnessResult};

const TASK_TYPES: [&str; 7] = ["JOB", "SETUP", "MAP", "SHUFFLE", "REDUCE", "COMBINE", "COMMIT"];

const PHASES: [&str; 6] = ["submit", "prepare", "start", "finish", "requestId", "responseId"];

/// Event counts from a statistics file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub job_events: u64,
    pub task_events: u64,
    /// Distinct nodes tasks ran on.
    pub nodes: BTreeSet<String>,
}

impl JobStats {
    /// Qualifying events.
    pub const fn total(&self) -> u64 {
        self.job_events + self.task_events
    }
}

/// Parses a statistics file, checking every line.
pub fn parse_job_stats(reader: impl BufRead) -> HarnessResult<JobStats> {
    let mut stats = JobStats::default();
    let mut shuffle_nodes: HashMap<String, String> = HashMap::new();
    let mut reduce_nodes: HashMap<String, String> = HashMap::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| malformed(line_no, &e.to_string()))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (descriptor, timestamp) = line
            .rsplit_once(':')
            .ok_or_else(|| malformed(line_no, line))?;
        timestamp
            .parse::<u64>()
            .map_err(|_| malformed(line_no, line))?;

        let parts: Vec<&str> = descriptor.split(' ').collect();
        match parts.as_slice() {
            ["JOB", phase] if PHASES.contains(phase) => {
                stats.job_events += 1;
            }
            [task_type, number, phase, node]
                if TASK_TYPES.contains(task_type) && PHASES.contains(phase) && !node.is_empty() =>
            {
                number.parse::<u32>().map_err(|_| malformed(line_no, line))?;

                let paired = match *task_type {
                    "SHUFFLE" => Some((&mut shuffle_nodes, &reduce_nodes)),
                    "REDUCE" => Some((&mut reduce_nodes, &shuffle_nodes)),
                    _ => None,
                };
                if let Some((own, other)) = paired {
                    if let Some(other_node) = other.get(*number) {
                        if other_node != node {
                            return Err(HarnessError::mismatch(
                                format!("job statistics line {line_no}"),
                                format!("shuffle and reduce {number} on node {other_node}"),
                                line,
                            ));
                        }
                    }
                    own.entry((*number).to_string())
                        .or_insert_with(|| (*node).to_string());
                }

                if *task_type == "JOB" {
                    stats.job_events += 1;
                } else {
                    stats.nodes.insert((*node).to_string());
                    stats.task_events += 1;
                }
            }
            _ => return Err(malformed(line_no, line)),
        }
    }

    Ok(stats)
}

fn malformed(line_no: usize, actual: &str) -> HarnessError {
    HarnessError::mismatch(
        format!("job statistics line {line_no}"),
        "<descriptor>:<timestamp>",
        actual,
    )
}
