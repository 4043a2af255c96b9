use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::hledger::*;
use super::journal::*;
use super::refresh::Refresher;
use super::*;
use crate::metrics::{MonthTag, SnapshotStore};
use crate::report::{AccountType, Currency};

const EXPENSES_BALANCE: &str = "\
             €120.00  expenses:food:groceries
              €80.00  expenses:rent
--------------------
             €200.00
";

const ASSETS_BALANCE: &str = "\
           €1,500.00  assets:bank:checking
--------------------
           €1,500.00
";

const INCOME_BALANCE: &str = "\
          €-3,000.00  income:salary
--------------------
          €-3,000.00
";

const MONTHLY_REGISTER: &str = "\
\"txnidx\",\"date\",\"code\",\"description\",\"account\",\"amount\",\"total\"
\"0\",\"2024-03-01\",\"\",\"\",\"expenses:rent\",\"€900.00\",\"€900.00\"
";

const POSTING_EXPORT: &str = "\
\"txnidx\",\"date\",\"date2\",\"status\",\"code\",\"description\",\"comment\",\"account\",\"amount\",\"commodity\",\"credit\",\"debit\",\"posting-status\",\"posting-comment\"
\"1\",\"2024-03-02\",\"\",\"\",\"\",\"Cafe (loyalty)\",\"\",\"expenses:food\",\"€5.00\",\"€\",\"\",\"€5.00\",\"\",\"\"
\"1\",\"2024-03-02\",\"\",\"\",\"\",\"Cafe (loyalty)\",\"\",\"assets:bank\",\"€-5.00\",\"€\",\"€5.00\",\"\",\"\",\"\"
";

/// Answers reports from canned output; reports without output fail like a broken journal would.
struct FakeHledger {
    outputs: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeHledger {
    fn new(outputs: &[(&str, &str)]) -> FakeHledger {
        FakeHledger {
            outputs: outputs
                .iter()
                .map(|(name, output)| (name.to_string(), output.to_string()))
                .collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn complete() -> FakeHledger {
        FakeHledger::new(&[
            ("bal expenses", EXPENSES_BALANCE),
            ("bal assets", ASSETS_BALANCE),
            ("bal income", INCOME_BALANCE),
            ("reg expenses --monthly", MONTHLY_REGISTER),
            ("print expenses", POSTING_EXPORT),
        ])
    }
}

#[async_trait]
impl ReportGenerator for FakeHledger {
    async fn generate(&self, report: &Report) -> Result<String, CollectError> {
        let name = report.name();
        self.calls.lock().unwrap().push(name.clone());

        self.outputs
            .get(&name)
            .cloned()
            .ok_or(CollectError::ReportGeneration {
                report: name,
                code: Some(1),
                output: "hledger: could not parse journal".to_string(),
            })
    }
}

struct FailingSource;

#[async_trait]
impl DocumentSource for FailingSource {
    async fn fetch(&self) -> Result<String, CollectError> {
        Err(CollectError::Status(StatusCode::UNAUTHORIZED))
    }
}

async fn journal_server() -> Result<String> {
    async fn journal(headers: HeaderMap) -> (StatusCode, &'static str) {
        match headers.get(header::AUTHORIZATION) {
            Some(value) if value == "token secret" => (StatusCode::OK, "2024-03-02 Cafe\n    expenses:food  €5.00\n"),
            _ => (StatusCode::UNAUTHORIZED, ""),
        }
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, Router::new().route("/journal", get(journal))).await });

    Ok(format!("http://{addr}/journal"))
}

fn journal_script(dir: &TempDir, script: &str) -> Result<std::path::PathBuf> {
    let path = dir.path().join("main.journal");
    std::fs::write(&path, script)?;
    Ok(path)
}

#[test]
fn test_report_args() {
    let journal = Path::new("/tmp/main.journal");

    assert_eq!(
        Report::from(Balance::new(AccountType::Expenses, 5)).args(journal),
        vec!["-f", "/tmp/main.journal", "-s", "bal", "expenses", "--depth", "5", "--no-elide"]
    );
    assert_eq!(
        Report::from(MonthlyRegister).args(journal),
        vec!["-f", "/tmp/main.journal", "-s", "reg", "expenses", "--monthly", "--output-format", "csv"]
    );
    assert_eq!(
        Report::from(PostingExport).args(journal),
        vec!["-f", "/tmp/main.journal", "print", "expenses", "--output-format", "csv"]
    );
    assert_eq!(Report::from(Balance::new(AccountType::Income, 2)).name(), "bal income");
}

#[tokio::test]
async fn test_refresh_publishes_every_family() -> Result<()> {
    let store = Arc::new(SnapshotStore::default());
    let generator = FakeHledger::complete();
    let calls = Arc::clone(&generator.calls);

    Refresher::new(Box::new(generator), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;

    let snapshot = store.current();
    assert_eq!(
        calls.lock().unwrap().clone(),
        vec!["bal expenses", "bal assets", "bal income", "reg expenses --monthly", "print expenses"]
    );
    assert_eq!(snapshot.expenses()[&("food:groceries".to_string(), Currency::Eur)], 120.0);
    assert_eq!(snapshot.total_expenses()[&Currency::Eur], 200.0);
    assert_eq!(snapshot.assets()[&("bank:checking".to_string(), Currency::Eur)], 1500.0);
    assert_eq!(snapshot.total_income()[&Currency::Eur], -3000.0);
    assert_eq!(snapshot.monthly_expenses().len(), 1);

    let by_payee = snapshot.expense_by_payee();
    let ((payee, currency, month, _), amount) = by_payee.iter().next().unwrap();
    assert_eq!((payee.as_str(), *currency, month.as_str(), *amount), ("cafe", Currency::Eur, "2024-03", 5.0));

    Ok(())
}

#[tokio::test]
async fn test_failed_report_keeps_previous_values() -> Result<()> {
    let store = Arc::new(SnapshotStore::default());
    Refresher::new(Box::new(FakeHledger::complete()), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;
    let first = store.current();

    let updated_assets = "€2,000.00  assets:bank:checking\n€2,000.00\n";
    let partial = FakeHledger::new(&[("bal assets", updated_assets)]);
    Refresher::new(Box::new(partial), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;
    let second = store.current();

    assert_eq!(second.total_assets()[&Currency::Eur], 2000.0);
    assert_eq!(second.expenses(), first.expenses());
    assert_eq!(second.total_income(), first.total_income());
    assert_eq!(second.monthly_category_totals(), first.monthly_category_totals());
    assert_eq!(second.monthly_payee_totals(), first.monthly_payee_totals());
    assert!(second.captured_at() >= first.captured_at());

    Ok(())
}

#[tokio::test]
async fn test_empty_report_keeps_previous_values() -> Result<()> {
    let store = Arc::new(SnapshotStore::default());
    Refresher::new(Box::new(FakeHledger::complete()), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;
    let first = store.current();

    let silent = FakeHledger::new(&[
        ("bal expenses", ""),
        ("bal assets", ASSETS_BALANCE),
        ("bal income", " \n"),
        ("reg expenses --monthly", ""),
        ("print expenses", "\n"),
    ]);
    Refresher::new(Box::new(silent), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;
    let second = store.current();

    assert_eq!(second.total_expenses()[&Currency::Eur], 200.0);
    assert_eq!(second.expenses(), first.expenses());
    assert_eq!(second.total_income(), first.total_income());
    assert_eq!(second.monthly_category_totals(), first.monthly_category_totals());
    assert_eq!(second.monthly_payee_totals(), first.monthly_payee_totals());
    assert_eq!(second.monthly_payee_totals().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_still_refreshes() -> Result<()> {
    let store = Arc::new(SnapshotStore::default());
    Refresher::new(Box::new(FakeHledger::complete()), "/tmp/main.journal", Arc::clone(&store))
        .with_source(Box::new(FailingSource))
        .refresh_once()
        .await;

    assert_eq!(store.current().total_expenses()[&Currency::Eur], 200.0);

    Ok(())
}

#[tokio::test]
async fn test_month_tag_uses_refresh_time() -> Result<()> {
    let store = Arc::new(SnapshotStore::default());
    Refresher::new(Box::new(FakeHledger::complete()), "/tmp/main.journal", Arc::clone(&store))
        .refresh_once()
        .await;

    let snapshot = store.current();
    let expected = MonthTag::classify("2024-03", snapshot.captured_at().date_naive());
    let tags: Vec<_> = snapshot.monthly_expenses().keys().map(|(_, _, _, tag)| *tag).collect();
    assert_eq!(tags, vec![expected]);

    Ok(())
}

#[tokio::test]
async fn test_gitea_source() -> Result<()> {
    let url = journal_server().await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");

    let source = GiteaSource::new(&url, "secret", Duration::from_secs(5))?;
    refresh_journal(&source, &path).await?;

    assert_eq!(
        std::fs::read_to_string(&path)?,
        "2024-03-02 Cafe\n    expenses:food  €5.00\n"
    );

    Ok(())
}

#[tokio::test]
async fn test_gitea_source_rejected_token_keeps_journal() -> Result<()> {
    let url = journal_server().await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("main.journal");
    std::fs::write(&path, "old journal")?;

    let source = GiteaSource::new(&url, "wrong", Duration::from_secs(5))?;
    match refresh_journal(&source, &path).await {
        Err(CollectError::Status(status)) => assert_eq!(status, StatusCode::UNAUTHORIZED),
        other => bail!("expected an unauthorized status, got {:?}", other),
    }
    assert_eq!(std::fs::read_to_string(&path)?, "old journal");

    Ok(())
}

// The tests below use `sh` in place of hledger: `sh -f <journal> args...` runs the journal as a
// script with the report arguments as positional parameters.

#[cfg(unix)]
#[tokio::test]
async fn test_hledger_cli_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let journal = journal_script(&dir, "printf '%s\\n' \"$*\"\ntest \"$LEDGER_FILE\" = \"$0\" || exit 9\n")?;
    let cli = HledgerCli::new("sh", &journal, Duration::from_secs(10));

    let output = cli.generate(&Balance::new(AccountType::Assets, 3).into()).await?;

    assert_eq!(output, "-s bal assets --depth 3 --no-elide\n");

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_hledger_cli_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let journal = journal_script(&dir, "echo 'hledger: parse error' >&2\nexit 3\n")?;
    let cli = HledgerCli::new("sh", &journal, Duration::from_secs(10));

    match cli.generate(&MonthlyRegister.into()).await {
        Err(CollectError::ReportGeneration { report, code, output }) => {
            assert_eq!(report, "reg expenses --monthly");
            assert_eq!(code, Some(3));
            assert!(output.contains("parse error"));
        },
        other => bail!("expected a report generation failure, got {:?}", other),
    }

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_hledger_cli_empty_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let journal = journal_script(&dir, "echo 'no transactions' >&2
exit 0
")?;
    let cli = HledgerCli::new("sh", &journal, Duration::from_secs(10));

    match cli.generate(&Balance::new(AccountType::Expenses, 5).into()).await {
        Err(CollectError::EmptyOutput { report, stderr }) => {
            assert_eq!(report, "bal expenses");
            assert!(stderr.contains("no transactions"));
        },
        other => bail!("expected an empty output failure, got {:?}", other),
    }

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_hledger_cli_timeout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let journal = journal_script(&dir, "sleep 5\n")?;
    let cli = HledgerCli::new("sh", &journal, Duration::from_millis(200));

    match cli.generate(&PostingExport.into()).await {
        Err(CollectError::Timeout { report, .. }) => assert_eq!(report, "print expenses"),
        other => bail!("expected a timeout, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_hledger_cli_missing_binary() -> Result<()> {
    let cli = HledgerCli::new("/nonexistent/hledger", "/tmp/main.journal", Duration::from_secs(1));

    match cli.generate(&PostingExport.into()).await {
        Err(CollectError::Io(_)) => Ok(()),
        other => bail!("expected a spawn failure, got {:?}", other),
    }
}
