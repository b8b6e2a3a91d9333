use crate::error::Error;
use crate::model::{is_safe_identifier, Snapshot, Symbol};
use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::ToSql;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

pub trait SnapshotStore: Send + Sync {
    fn rebuild(&self, symbols: &[Symbol]) -> Result<()>;

    fn insert(&self, snapshot: &Snapshot) -> Result<()>;
}

pub struct SnapshotRepository {
    pool: Pool<SqliteConnectionManager>,
    table: String,
}

impl SnapshotRepository {
    pub fn new(
        pool: &Pool<SqliteConnectionManager>,
        table: &str,
    ) -> Result<SnapshotRepository, Error> {
        if !is_safe_identifier(table) {
            return Err(Error::InvalidSymbol(table.to_string()));
        }
        Ok(SnapshotRepository {
            pool: pool.clone(),
            table: table.to_string(),
        })
    }
}

impl SnapshotStore for SnapshotRepository {
    fn rebuild(&self, symbols: &[Symbol]) -> Result<()> {
        let mut columns = vec![
            "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "\"captured_at\" TEXT NOT NULL".to_string(),
        ];
        // A repeated symbol keeps its first slot, same as Snapshot::new.
        let mut seen: Vec<&Symbol> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if seen.contains(&symbol) {
                continue;
            }
            seen.push(symbol);
            columns.push(format!("\"{}\" REAL", symbol));
        }
        let query = format!(
            "DROP TABLE IF EXISTS \"{}\"; CREATE TABLE \"{}\" ({})",
            self.table,
            self.table,
            columns.join(", ")
        );
        self.pool.get()?.execute_batch(&query)?;
        Ok(())
    }

    fn insert(&self, snapshot: &Snapshot) -> Result<()> {
        let mut columns = vec!["\"captured_at\"".to_string()];
        let mut placeholders = vec!["?".to_string()];
        for symbol in snapshot.symbols() {
            columns.push(format!("\"{}\"", symbol));
            placeholders.push("?".to_string());
        }
        let query = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let captured_at = snapshot.captured_at();
        let mut params: Vec<&dyn ToSql> = vec![&captured_at];
        for (_, rate) in snapshot.values() {
            params.push(rate);
        }

        self.pool.get()?.execute(&query, &params[..])?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

pub async fn write_with_retry(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
    policy: &RetryPolicy,
) -> Result<(), Error> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match store.insert(snapshot) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, %e, "Write failed, retrying");
                attempt += 1;
                sleep(policy.delay).await;
            }
            Err(e) => {
                return Err(Error::Write {
                    attempts,
                    source: e.into(),
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::pool;
    use anyhow::anyhow;
    use chrono::Utc;
    use rusqlite::params;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn symbol(code: &str) -> Symbol {
        Symbol::new(code).unwrap()
    }

    fn table_columns(pool: &Pool<SqliteConnectionManager>, table: &str) -> Vec<String> {
        let conn = pool.get().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?)")
            .unwrap();
        let columns = stmt
            .query_map(params![table], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap();
        columns
    }

    #[test]
    fn rebuild_creates_expected_columns() -> Result<()> {
        let pool = pool();
        let repo = SnapshotRepository::new(&pool, "fiat_rates")?;
        repo.rebuild(&[symbol("USD"), symbol("EUR")])?;
        assert_eq!(
            vec!["id", "captured_at", "USD", "EUR"],
            table_columns(&pool, "fiat_rates")
        );
        Ok(())
    }

    #[test]
    fn rebuild_discards_previous_table() -> Result<()> {
        let pool = pool();
        let repo = SnapshotRepository::new(&pool, "crypto_rates")?;

        repo.rebuild(&[symbol("BTCUSDT")])?;
        repo.insert(&Snapshot::new(
            Utc::now(),
            vec![(symbol("BTCUSDT"), Some(64000.1))],
        ))?;

        repo.rebuild(&[symbol("ETHUSDT")])?;
        assert_eq!(
            vec!["id", "captured_at", "ETHUSDT"],
            table_columns(&pool, "crypto_rates")
        );
        let count: i64 = pool
            .get()?
            .query_row("SELECT count(*) FROM crypto_rates", [], |row| row.get(0))?;
        assert_eq!(0, count);
        Ok(())
    }

    #[test]
    fn rebuild_collapses_repeated_symbols() -> Result<()> {
        let pool = pool();
        let repo = SnapshotRepository::new(&pool, "fiat_rates")?;
        repo.rebuild(&[symbol("USD"), symbol("EUR"), symbol("USD")])?;
        assert_eq!(
            vec!["id", "captured_at", "USD", "EUR"],
            table_columns(&pool, "fiat_rates")
        );
        Ok(())
    }

    #[test]
    fn insert_keeps_missing_rates_null() -> Result<()> {
        let pool = pool();
        let repo = SnapshotRepository::new(&pool, "fiat_rates")?;
        repo.rebuild(&[symbol("USD"), symbol("EUR")])?;

        repo.insert(&Snapshot::new(
            Utc::now(),
            vec![(symbol("USD"), Some(1.0)), (symbol("EUR"), None)],
        ))?;

        let row: (String, Option<f64>, Option<f64>) = pool.get()?.query_row(
            "SELECT captured_at, USD, EUR FROM fiat_rates",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        assert!(!row.0.is_empty());
        assert_eq!(Some(1.0), row.1);
        assert_eq!(None, row.2);
        Ok(())
    }

    #[test]
    fn insert_without_table_fails() {
        let pool = pool();
        let repo = SnapshotRepository::new(&pool, "fiat_rates").unwrap();
        let res = repo.insert(&Snapshot::new(Utc::now(), vec![(symbol("USD"), Some(1.0))]));
        assert!(res.is_err());
    }

    #[test]
    fn unsafe_table_name_is_rejected() {
        let pool = pool();
        for table in &["", "fiat rates", "fiat_rates; --", "\"fiat_rates\""] {
            match SnapshotRepository::new(&pool, table) {
                Err(Error::InvalidSymbol(it)) => assert_eq!(&it, table),
                Err(e) => panic!("unexpected error for {:?}: {:?}", table, e),
                Ok(_) => panic!("{:?} should be rejected", table),
            }
        }
    }

    struct FlakyStore {
        calls: AtomicUsize,
        failures: usize,
    }

    impl FlakyStore {
        fn new(failures: usize) -> FlakyStore {
            FlakyStore {
                calls: AtomicUsize::new(0),
                failures,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl SnapshotStore for FlakyStore {
        fn rebuild(&self, _symbols: &[Symbol]) -> Result<()> {
            Ok(())
        }

        fn insert(&self, _snapshot: &Snapshot) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            if call <= self.failures {
                Err(anyhow!("database is locked"))
            } else {
                Ok(())
            }
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(Utc::now(), vec![(symbol("USD"), Some(1.0))])
    }

    #[tokio::test(start_paused = true)]
    async fn write_succeeds_without_retrying() {
        let store = FlakyStore::new(0);
        let started = tokio::time::Instant::now();
        let res = write_with_retry(&store, &snapshot(), &RetryPolicy::default()).await;
        assert!(res.is_ok());
        assert_eq!(1, store.calls());
        assert_eq!(Duration::from_secs(0), started.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn write_retries_until_success() {
        let store = FlakyStore::new(2);
        let res = write_with_retry(&store, &snapshot(), &RetryPolicy::default()).await;
        assert!(res.is_ok());
        assert_eq!(3, store.calls());
    }

    #[tokio::test(start_paused = true)]
    async fn write_gives_up_after_last_attempt() {
        let store = FlakyStore::new(usize::MAX);
        let started = tokio::time::Instant::now();
        let res = write_with_retry(&store, &snapshot(), &RetryPolicy::default()).await;
        assert_eq!(3, store.calls());
        // Two delays: between 1-2 and 2-3, none after the last failure.
        assert_eq!(Duration::from_secs(10), started.elapsed());
        match res {
            Err(Error::Write { attempts, source }) => {
                assert_eq!(3, attempts);
                assert_eq!("database is locked", source.to_string());
            }
            other => panic!("expected Write error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn write_makes_at_least_one_attempt() {
        let store = FlakyStore::new(usize::MAX);
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::from_secs(5),
        };
        let res = write_with_retry(&store, &snapshot(), &policy).await;
        assert_eq!(1, store.calls());
        match res {
            Err(Error::Write { attempts, .. }) => assert_eq!(1, attempts),
            other => panic!("expected Write error, got {:?}", other),
        }
    }
}
