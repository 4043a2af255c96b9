use std::time::Duration;

use thiserror::Error;

pub mod hledger;
pub mod journal;
pub mod refresh;

#[cfg(test)]
mod collector_tests;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to fetch journal: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("journal source answered with {0}")]
    Status(reqwest::StatusCode),
    #[error("hledger {report} exited with code {code:?}: {output}")]
    ReportGeneration {
        report: String,
        code: Option<i32>,
        output: String,
    },
    #[error("hledger {report} printed nothing: {stderr}")]
    EmptyOutput { report: String, stderr: String },
    #[error("hledger {report} did not finish within {timeout:?}")]
    Timeout { report: String, timeout: Duration },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
