use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use log::debug;
use tokio::process::Command;

use super::CollectError;
use crate::report::AccountType;

/// Default `--depth` of the balance reports.
pub const DEFAULT_DEPTH: u8 = 5;

#[enum_dispatch]
pub trait HledgerReport {
    fn name(&self) -> String;

    /// Command line for this report, minus the binary itself.
    fn args(&self, journal: &Path) -> Vec<String>;
}

#[enum_dispatch(HledgerReport)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Balance,
    MonthlyRegister,
    PostingExport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub account_type: AccountType,
    pub depth: u8,
}

impl Balance {
    pub fn new(account_type: AccountType, depth: u8) -> Balance {
        Balance { account_type, depth }
    }
}

impl HledgerReport for Balance {
    fn name(&self) -> String {
        format!("bal {}", self.account_type)
    }

    fn args(&self, journal: &Path) -> Vec<String> {
        let mut args = journal_args(journal);
        args.extend([
            "-s".to_string(),
            "bal".to_string(),
            self.account_type.to_string(),
            "--depth".to_string(),
            self.depth.to_string(),
            "--no-elide".to_string(),
        ]);
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRegister;

impl HledgerReport for MonthlyRegister {
    fn name(&self) -> String {
        "reg expenses --monthly".to_string()
    }

    fn args(&self, journal: &Path) -> Vec<String> {
        let mut args = journal_args(journal);
        args.extend(
            ["-s", "reg", "expenses", "--monthly", "--output-format", "csv"]
                .into_iter()
                .map(String::from),
        );
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingExport;

impl HledgerReport for PostingExport {
    fn name(&self) -> String {
        "print expenses".to_string()
    }

    fn args(&self, journal: &Path) -> Vec<String> {
        let mut args = journal_args(journal);
        args.extend(
            ["print", "expenses", "--output-format", "csv"]
                .into_iter()
                .map(String::from),
        );
        args
    }
}

fn journal_args(journal: &Path) -> Vec<String> {
    vec!["-f".to_string(), journal.display().to_string()]
}

/// Produces the raw text of a report. The refresh cycle only talks to hledger through this.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, report: &Report) -> Result<String, CollectError>;
}

/// Runs the `hledger` binary as a subprocess, killing it when it exceeds the timeout.
#[derive(Debug, Clone)]
pub struct HledgerCli {
    binary: PathBuf,
    journal: PathBuf,
    timeout: Duration,
}

impl HledgerCli {
    pub fn new(binary: impl Into<PathBuf>, journal: impl Into<PathBuf>, timeout: Duration) -> HledgerCli {
        HledgerCli {
            binary: binary.into(),
            journal: journal.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReportGenerator for HledgerCli {
    async fn generate(&self, report: &Report) -> Result<String, CollectError> {
        let args = report.args(&self.journal);
        debug!("running hledger, args={:?}", args);

        let child = Command::new(&self.binary)
            .args(&args)
            .env("LEDGER_FILE", &self.journal)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the child on timeout kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CollectError::Timeout {
                report: report.name(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(CollectError::ReportGeneration {
                report: report.name(),
                code: output.status.code(),
                output: diagnostics,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(CollectError::EmptyOutput {
                report: report.name(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(stdout)
    }
}
