use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;

use super::CollectError;

/// Default path the journal is written to and hledger reads from.
pub const DEFAULT_JOURNAL_PATH: &str = "/tmp/main.journal";

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self) -> Result<String, CollectError>;
}

/// Fetches the raw journal from a Gitea raw-file URL with an access token.
#[derive(Debug, Clone)]
pub struct GiteaSource {
    http: Client,
    url: String,
    token: String,
}

impl GiteaSource {
    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<GiteaSource, CollectError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(GiteaSource {
            http,
            url: url.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl DocumentSource for GiteaSource {
    async fn fetch(&self) -> Result<String, CollectError> {
        let response = self
            .http
            .get(&self.url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status(status));
        }

        Ok(response.text().await?)
    }
}

/// Replaces the local journal with a fresh copy from `source`.
pub async fn refresh_journal(source: &dyn DocumentSource, path: &Path) -> Result<(), CollectError> {
    let journal = source.fetch().await?;
    tokio::fs::write(path, journal.as_bytes()).await?;
    info!("journal refreshed, path={}, bytes={}", path.display(), journal.len());

    Ok(())
}
