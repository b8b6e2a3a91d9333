use crate::conf::Conf;
use anyhow::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::fs::remove_file;
use tracing::{info, warn};

// Connections are opened on first checkout, not here. A sync that fails
// before its write never touches the database file.
pub fn pool(conf: &Conf) -> Pool<SqliteConnectionManager> {
    let manager = SqliteConnectionManager::file(&conf.db_url);
    Pool::builder().min_idle(Some(0)).build_unchecked(manager)
}

pub fn drop(conf: &Conf) -> Result<()> {
    warn!("Dropping database...");
    info!(db_url = %conf.db_url);
    remove_file(&conf.db_url)?;
    warn!("Database has been dropped");
    Ok(())
}
