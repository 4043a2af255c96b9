use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use ledger_exporter::config::Config;
use ledger_exporter::metrics::SnapshotStore;
use ledger_exporter::server;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let store = Arc::new(SnapshotStore::default());
    let refresher = config.refresher(Arc::clone(&store))?;

    // Serve only once the first snapshot is in place.
    refresher.refresh_once().await;
    tokio::spawn(refresher.run(config.refresh_interval()));

    server::serve(config.listen, store).await
}
