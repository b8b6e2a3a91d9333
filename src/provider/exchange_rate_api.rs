use crate::error::Error;
use crate::model::{Snapshot, Symbol};
use crate::provider::Provider;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

pub struct ExchangeRateApi {
    conf: ExchangeRateApiConf,
    http: Client,
}

#[derive(Deserialize)]
pub struct ExchangeRateApiConf {
    pub enabled: bool,
    pub schedule: String,
    pub url: String,
    pub table: String,
    pub symbols: Vec<Symbol>,
}

#[derive(Deserialize)]
struct LatestRates {
    conversion_rates: Option<HashMap<String, f64>>,
}

impl ExchangeRateApi {
    pub fn new(conf: ExchangeRateApiConf) -> Result<ExchangeRateApi, Error> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(ExchangeRateApi { conf, http })
    }

    fn snapshot(&self, body: LatestRates) -> Result<Snapshot, Error> {
        let rates = body
            .conversion_rates
            .ok_or(Error::MalformedResponse("conversion_rates"))?;
        Ok(Snapshot::from_rates(Utc::now(), &self.conf.symbols, &rates))
    }
}

#[async_trait]
impl Provider for ExchangeRateApi {
    fn name(&self) -> &'static str {
        "exchange_rate_api"
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
        Ok(self.conf.symbols.clone())
    }

    async fn fetch(&self) -> Result<Snapshot, Error> {
        let res = self.http.get(&self.conf.url).send().await?;
        if !res.status().is_success() {
            return Err(Error::Api(res.status()));
        }
        self.snapshot(res.json().await?)
    }
}
