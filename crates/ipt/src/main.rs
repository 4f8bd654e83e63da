use std::sync::Arc;

use ipt_core::{
    clock::{Clock, SystemClock},
    config::Config,
    notifier::Notifier,
    ports::{MessageChannel, TrackingStore},
    retention::run_retention,
    store::RetryingStore,
    watcher::StatusWatcher,
};
use ipt_sqlite::SqliteStore;
use ipt_telegram::TelegramChannel;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), ipt_core::Error> {
    ipt_core::logging::init("ipt")?;

    let cfg = Config::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sqlite = SqliteStore::open(&cfg.database_path, clock.clone()).await?;
    let store: Arc<dyn TrackingStore> = Arc::new(RetryingStore::new(sqlite, cfg.store_retry()));

    let telegram = TelegramChannel::connect(&cfg.telegram_bot_token)
        .await
        .map_err(|e| ipt_core::Error::External(format!("telegram connect failed: {e}")))?;
    telegram.register_commands().await;
    let channel: Arc<dyn MessageChannel> = Arc::new(telegram);

    let notifier = Notifier::new(channel.clone(), cfg.rate_limiter(), cfg.notifier());
    let watcher = StatusWatcher::new(channel, store.clone(), clock, notifier, cfg.watcher());

    let cancel = CancellationToken::new();
    let retention = tokio::spawn(run_retention(
        store,
        cfg.retention_max_age,
        cfg.retention_interval,
        cancel.clone(),
    ));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    watcher.run(cancel).await;
    if let Err(e) = retention.await {
        error!(error = %e, "retention task panicked");
    }

    info!("stopped");
    Ok(())
}
