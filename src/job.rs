use crate::conf::Conf;
use crate::error::Error;
use crate::provider::{Binance, ExchangeRateApi, Provider};
use crate::repository::{write_with_retry, RetryPolicy, SnapshotRepository, SnapshotStore};
use anyhow::Result;
use chrono::Utc;
use cron::Schedule;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::str::FromStr;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct SnapshotJob {
    provider: Box<dyn Provider>,
    store: Box<dyn SnapshotStore>,
    retry: RetryPolicy,
    schedule: Schedule,
}

pub fn build(conf: Conf, pool: &Pool<SqliteConnectionManager>) -> Result<Vec<SnapshotJob>, Error> {
    let retry = conf.write_retry.policy();
    let providers: Vec<Box<dyn Provider>> = vec![
        Box::new(ExchangeRateApi::new(conf.providers.exchange_rate_api)?),
        Box::new(Binance::new(conf.providers.binance)?),
    ];

    let mut jobs = vec![];
    for provider in providers {
        // A schedule that can't fire is a conf mistake, caught here instead
        // of inside the long-running loop.
        let schedule = Schedule::from_str(&provider.sync_schedule())
            .map_err(|_| Error::InvalidSchedule(provider.sync_schedule()))?;
        let store = SnapshotRepository::new(pool, provider.table())?;
        jobs.push(SnapshotJob::new(provider, Box::new(store), retry, schedule));
    }
    Ok(jobs)
}

impl SnapshotJob {
    pub fn new(
        provider: Box<dyn Provider>,
        store: Box<dyn SnapshotStore>,
        retry: RetryPolicy,
        schedule: Schedule,
    ) -> SnapshotJob {
        SnapshotJob {
            provider,
            store,
            retry,
            schedule,
        }
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn enabled(&self) -> bool {
        self.provider.enabled()
    }

    pub async fn sync(&self) -> Result<(), Error> {
        let snapshot = self.provider.fetch().await?;
        if snapshot.is_empty() {
            warn!(provider = %self.provider.name(), "Snapshot has no rates");
        }
        info!(
            provider = %self.provider.name(),
            symbols = snapshot.len(),
            "Fetched snapshot"
        );
        write_with_retry(self.store.as_ref(), &snapshot, &self.retry).await?;
        info!(
            provider = %self.provider.name(),
            table = %self.provider.table(),
            "Snapshot saved"
        );
        Ok(())
    }

    pub async fn rebuild(&self) -> Result<()> {
        let symbols = self.provider.columns().await?;
        warn!(
            provider = %self.provider.name(),
            table = %self.provider.table(),
            columns = symbols.len(),
            "Rebuilding table, all existing rows will be lost"
        );
        self.store.rebuild(&symbols)?;
        warn!(
            provider = %self.provider.name(),
            table = %self.provider.table(),
            "Table has been rebuilt"
        );
        Ok(())
    }

    pub async fn schedule_sync(&self) {
        if !self.provider.enabled() {
            info!(provider = %self.provider.name(), "Sync is disabled");
            return;
        }

        warn!(provider = %self.provider.name(), "Scheduling sync...");

        for next_sync in self.schedule.upcoming(Utc) {
            warn!(provider = %self.provider.name(), %next_sync, "Got next sync date");
            let time_to_next_sync = next_sync.signed_duration_since(Utc::now());
            let time_to_next_sync = match time_to_next_sync.to_std() {
                Ok(it) => it,
                Err(_) => {
                    warn!("Skipping next sync because the old one didn't finish in time");
                    continue;
                }
            };
            warn!(
                provider = %self.provider.name(),
                secs_to_next_sync = time_to_next_sync.as_secs(),
                "Going to sleep till next sync"
            );
            sleep(time_to_next_sync).await;
            warn!(provider = %self.provider.name(), "Syncing...");
            if let Err(e) = self.sync().await {
                error!(provider = %self.provider.name(), %e, "Sync failed");
            }
        }
    }
}
