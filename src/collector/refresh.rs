use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{error, info, warn};
use tokio::time::MissedTickBehavior;

use super::hledger::{Balance, HledgerReport, MonthlyRegister, PostingExport, Report, ReportGenerator, DEFAULT_DEPTH};
use super::journal::{refresh_journal, DocumentSource};
use crate::metrics::{SnapshotBuilder, SnapshotStore};
use crate::report::balance::parse_balance_report;
use crate::report::postings::parse_posting_export;
use crate::report::register::parse_monthly_register;
use crate::report::{AccountType, EXPENSES_PREFIX};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Runs refresh cycles: fetch the journal, generate every report, parse, publish one snapshot.
pub struct Refresher {
    source: Option<Box<dyn DocumentSource>>,
    generator: Box<dyn ReportGenerator>,
    journal: PathBuf,
    depth: u8,
    store: Arc<SnapshotStore>,
}

impl Refresher {
    pub fn new(generator: Box<dyn ReportGenerator>, journal: impl Into<PathBuf>, store: Arc<SnapshotStore>) -> Refresher {
        Refresher {
            source: None,
            generator,
            journal: journal.into(),
            depth: DEFAULT_DEPTH,
            store,
        }
    }

    pub fn with_source(mut self, source: Box<dyn DocumentSource>) -> Refresher {
        self.source = Some(source);
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Refresher {
        self.depth = depth;
        self
    }

    /// Runs one cycle. Failures are logged and stay local: a failed fetch reuses the journal on
    /// disk and a failed report keeps its values from the previous snapshot.
    pub async fn refresh_once(&self) {
        // Month tags of the whole cycle are relative to this instant.
        let captured_at = Local::now();
        info!("refreshing ledger metrics");

        match &self.source {
            Some(source) => {
                if let Err(err) = refresh_journal(source.as_ref(), &self.journal).await {
                    error!("failed to refresh journal, using {}, err={}", self.journal.display(), err);
                }
            },
            None => warn!(
                "GITEA_TOKEN or GITEA_JOURNAL_URL not set, using {}",
                self.journal.display()
            ),
        }

        let mut builder = SnapshotBuilder::new();
        for account_type in AccountType::ALL {
            if let Some(report) = self.generate(Balance::new(account_type, self.depth).into()).await {
                let lines = parse_balance_report(&report, account_type.prefix(), account_type.scope());
                builder = builder.balances(account_type, lines);
            }
        }

        if let Some(report) = self.generate(MonthlyRegister.into()).await {
            builder = builder.monthly_category_totals(parse_monthly_register(&report, EXPENSES_PREFIX));
        }

        if let Some(report) = self.generate(PostingExport.into()).await {
            builder = builder.monthly_payee_totals(parse_posting_export(&report, EXPENSES_PREFIX));
        }

        let snapshot = builder.build(&self.store.current(), captured_at);
        self.store.publish(snapshot);
        info!("ledger metrics refreshed");
    }

    async fn generate(&self, report: Report) -> Option<String> {
        match self.generator.generate(&report).await {
            // A report that prints nothing has failed as much as one that exits non-zero.
            Ok(output) if output.trim().is_empty() => {
                error!("report {} printed nothing, keeping previous values", report.name());
                None
            },
            Ok(output) => Some(output),
            Err(err) => {
                error!("report {} failed, keeping previous values, err={}", report.name(), err);
                None
            },
        }
    }

    /// Refreshes every `interval` forever. The first tick is skipped since the caller runs the
    /// initial refresh itself. A cycle that overruns delays the next one instead of overlapping.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.refresh_once().await;
        }
    }
}
