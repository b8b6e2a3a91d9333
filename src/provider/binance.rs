use crate::error::Error;
use crate::model::{Snapshot, Symbol};
use crate::provider::Provider;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::{cmp::Ordering, time::Duration};
use tracing::warn;

pub struct Binance {
    conf: BinanceConf,
    http: Client,
}

#[derive(Deserialize)]
pub struct BinanceConf {
    pub enabled: bool,
    pub schedule: String,
    pub url: String,
    pub table: String,
    pub top: usize,
    pub quote_asset: String,
}

#[derive(Deserialize)]
struct Ticker {
    symbol: String,
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "quoteVolume")]
    quote_volume: String,
}

impl Binance {
    pub fn new(conf: BinanceConf) -> Result<Binance, Error> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Binance { conf, http })
    }

    async fn tickers(&self) -> Result<Vec<Ticker>, Error> {
        let res = self.http.get(&self.conf.url).send().await?;
        if !res.status().is_success() {
            return Err(Error::Api(res.status()));
        }
        Ok(res.json().await?)
    }

    fn top_rates(&self, tickers: Vec<Ticker>) -> Vec<(Symbol, Option<f64>)> {
        let mut rates: Vec<(Symbol, f64, f64)> = vec![];

        for ticker in tickers {
            if !self.conf.quote_asset.is_empty()
                && !ticker.symbol.ends_with(&self.conf.quote_asset)
            {
                continue;
            }
            let price: f64 = match ticker.last_price.parse() {
                Ok(it) => it,
                Err(_) => {
                    warn!(symbol = %ticker.symbol, "Skipping ticker with unreadable price");
                    continue;
                }
            };
            let volume: f64 = match ticker.quote_volume.parse() {
                Ok(it) => it,
                Err(_) => {
                    warn!(symbol = %ticker.symbol, "Skipping ticker with unreadable volume");
                    continue;
                }
            };
            let symbol = match Symbol::new(&ticker.symbol) {
                Ok(it) => it,
                Err(e) => {
                    warn!(%e, "Skipping ticker");
                    continue;
                }
            };
            rates.push((symbol, price, volume));
        }

        rates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
        rates.truncate(self.conf.top);
        rates
            .into_iter()
            .map(|(symbol, price, _)| (symbol, Some(price)))
            .collect()
    }
}

#[async_trait]
impl Provider for Binance {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn enabled(&self) -> bool {
        self.conf.enabled
    }

    fn sync_schedule(&self) -> String {
        self.conf.schedule.clone()
    }

    fn table(&self) -> &str {
        &self.conf.table
    }

    async fn columns(&self) -> Result<Vec<Symbol>, Error> {
        let rates = self.top_rates(self.tickers().await?);
        Ok(rates.into_iter().map(|(symbol, _)| symbol).collect())
    }

    async fn fetch(&self) -> Result<Snapshot, Error> {
        let rates = self.top_rates(self.tickers().await?);
        Ok(Snapshot::new(Utc::now(), rates))
    }
}
