use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::collector::hledger::{HledgerCli, DEFAULT_DEPTH};
use crate::collector::journal::{GiteaSource, DEFAULT_JOURNAL_PATH};
use crate::collector::refresh::Refresher;
use crate::metrics::SnapshotStore;

/// Exports hledger balance, register and payee reports as Prometheus metrics
#[derive(Debug, Clone, Parser)]
#[command(name = "ledger-exporter", version)]
pub struct Config {
    /// Gitea access token used to download the journal
    #[arg(long, env = "GITEA_TOKEN", hide_env_values = true)]
    pub gitea_token: Option<String>,

    /// Raw-file URL of the journal
    #[arg(long, env = "GITEA_JOURNAL_URL")]
    pub journal_url: Option<String>,

    /// Where the journal is stored and read by hledger
    #[arg(long, env = "LEDGER_PATH", default_value = DEFAULT_JOURNAL_PATH)]
    pub ledger_path: PathBuf,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9000")]
    pub listen: SocketAddr,

    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval_secs: u64,

    #[arg(long, env = "HLEDGER_BIN", default_value = "hledger")]
    pub hledger_bin: PathBuf,

    /// Upper bound for a single hledger invocation
    #[arg(long, env = "REPORT_TIMEOUT_SECS", default_value_t = 60)]
    pub report_timeout_secs: u64,

    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// `--depth` passed to the balance reports
    #[arg(long, env = "BALANCE_DEPTH", default_value_t = DEFAULT_DEPTH)]
    pub balance_depth: u8,
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Wires the hledger subprocess and, when both token and URL are set, the Gitea source.
    pub fn refresher(&self, store: Arc<SnapshotStore>) -> Result<Refresher> {
        let generator = HledgerCli::new(
            &self.hledger_bin,
            &self.ledger_path,
            Duration::from_secs(self.report_timeout_secs),
        );
        let refresher = Refresher::new(Box::new(generator), &self.ledger_path, store).with_depth(self.balance_depth);

        match (&self.journal_url, &self.gitea_token) {
            (Some(url), Some(token)) => {
                let source = GiteaSource::new(url, token, Duration::from_secs(self.fetch_timeout_secs))
                    .context("failed to build the journal HTTP client")?;
                Ok(refresher.with_source(Box::new(source)))
            },
            _ => Ok(refresher),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "ledger-exporter",
            "--gitea-token",
            "secret",
            "--journal-url",
            "https://git.example.org/api/v1/repos/me/ledger/raw/main.journal",
            "--ledger-path",
            "/var/lib/ledger/main.journal",
            "--listen",
            "127.0.0.1:9100",
            "--refresh-interval-secs",
            "60",
            "--balance-depth",
            "3",
        ])
        .unwrap();

        assert_eq!(config.gitea_token.as_deref(), Some("secret"));
        assert_eq!(config.ledger_path, PathBuf::from("/var/lib/ledger/main.journal"));
        assert_eq!(config.listen, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.balance_depth, 3);
        assert!(config.refresher(Arc::new(SnapshotStore::default())).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::try_parse_from(["ledger-exporter", "--listen", "localhost"]).is_err());
        assert!(Config::try_parse_from(["ledger-exporter", "--refresh-interval-secs", "0"]).is_err());
    }
}
