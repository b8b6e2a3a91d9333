use crate::error::Error;
use crate::model::{Snapshot, Symbol};
use async_trait::async_trait;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool;

    fn sync_schedule(&self) -> String;

    fn table(&self) -> &str;

    // Symbols the destination table should have columns for.
    async fn columns(&self) -> Result<Vec<Symbol>, Error>;

    async fn fetch(&self) -> Result<Snapshot, Error>;
}
