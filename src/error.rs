use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status: {0}")]
    Status(reqwest::StatusCode),

    #[error("error decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("amount overflow while totalling {0:?}")]
    Overflow(String),

    #[error("error writing csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("invalid date {input:?}: expected YYYY-MM-DD ({source})")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("both --start and --end must be given when either is set")]
    IncompleteDateRange,

    #[error("invalid date range: start {start} must be before or equal to end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}
