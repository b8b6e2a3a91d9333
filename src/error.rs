use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("provider returned status {0}")]
    Api(StatusCode),

    #[error("provider response is missing field `{0}`")]
    MalformedResponse(&'static str),

    #[error("`{0}` is not a safe SQL identifier")]
    InvalidSymbol(String),

    #[error("`{0}` is not a valid cron expression")]
    InvalidSchedule(String),

    #[error("write failed after {attempts} attempts")]
    Write {
        attempts: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("http request failed")]
    Http(#[from] reqwest::Error),
}
