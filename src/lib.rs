//! hadoop-cli-e2e: E2E validation of the Hadoop accelerator through the
//! stock `hadoop` and `hive` command line clients.
//!
//! Generates datasets, prepares a client environment, drives the external
//! tools and verifies what they leave in the filesystem under test.

pub mod config;
pub mod drivers;
pub mod environment;
pub mod error;
pub mod generator;
pub mod job_stats;
pub mod process;
pub mod remote_fs;
pub mod scenario;
pub mod types;
pub mod verifier;
