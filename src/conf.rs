use crate::provider::{BinanceConf, ExchangeRateApiConf};
use crate::repository::RetryPolicy;
use anyhow::Result;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{
    env,
    time::Duration,
    {include_bytes, path::Path},
};

#[derive(Deserialize)]
pub struct Conf {
    pub db_url: String,
    pub write_retry: WriteRetryConf,
    pub providers: ProvidersConf,
}

#[derive(Deserialize)]
pub struct ProvidersConf {
    pub exchange_rate_api: ExchangeRateApiConf,
    pub binance: BinanceConf,
}

#[derive(Deserialize)]
pub struct WriteRetryConf {
    pub attempts: usize,
    pub delay_secs: u64,
}

impl WriteRetryConf {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            delay: Duration::from_secs(self.delay_secs),
        }
    }
}

impl Conf {
    pub fn new() -> Result<Conf> {
        let default_conf = include_bytes!("../ratelog.conf");
        let default_conf = String::from_utf8_lossy(default_conf);

        let mut figment = Figment::new().merge(Toml::string(&default_conf));

        if let Ok(data_dir) = env::var("DATA_DIR") {
            figment = figment.merge(Toml::file(Path::new(&data_dir).join("ratelog.conf")));
        }

        Ok(figment.extract()?)
    }
}
