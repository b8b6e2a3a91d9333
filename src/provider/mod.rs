mod provider;
pub use provider::Provider;
mod exchange_rate_api;
pub use exchange_rate_api::{ExchangeRateApi, ExchangeRateApiConf};
mod binance;
pub use binance::{Binance, BinanceConf};
