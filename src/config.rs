use crate::client::PageRequest;
use crate::error::ConfigError;
use crate::models::AddressField;
use chrono::{Days, NaiveDate};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_WINDOW_DAYS: u64 = 30;
pub const DEFAULT_AGGREGATE_PATH: &str = "state_results.csv";
pub const DEFAULT_RECORDS_PATH: &str = "order_records.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of order dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending on, and including, `today`.
    pub fn trailing_days(today: NaiveDate, days: u64) -> Result<Self, ConfigError> {
        if days == 0 {
            return Err(ConfigError::InvalidParameter(
                "date window must cover at least one day",
            ));
        }
        let start = today
            .checked_sub_days(Days::new(days - 1))
            .ok_or(ConfigError::InvalidParameter(
                "date window starts before the earliest supported date",
            ))?;
        Self::new(start, today)
    }

    /// Resolve `--start`/`--end` style inputs, falling back to a trailing
    /// window when neither bound is given.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
        days: u64,
    ) -> Result<Self, ConfigError> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(parse_date(start)?, parse_date(end)?),
            (None, None) => Self::trailing_days(today, days),
            _ => Err(ConfigError::IncompleteDateRange),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|source| ConfigError::InvalidDate {
        input: raw.to_string(),
        source,
    })
}

/// How the per-order CSV is written across pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordsMode {
    /// One file for the whole run, rows appended page by page.
    #[default]
    Run,
    /// Recreate the file for every page; only the last page survives.
    LastPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsOutput {
    pub path: PathBuf,
    pub mode: RecordsMode,
}

/// Everything the report driver needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub range: DateRange,
    pub page_size: u32,
    pub state_field: AddressField,
    pub aggregate_path: PathBuf,
    pub records: Option<RecordsOutput>,
}

impl ReportConfig {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            page_size: DEFAULT_PAGE_SIZE,
            state_field: AddressField::default(),
            aggregate_path: PathBuf::from(DEFAULT_AGGREGATE_PATH),
            records: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, ConfigError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidParameter(
                "page size must be between 1 and 500",
            ));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn with_state_field(mut self, field: AddressField) -> Self {
        self.state_field = field;
        self
    }

    pub fn with_aggregate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.aggregate_path = path.into();
        self
    }

    pub fn with_order_records(mut self, path: impl Into<PathBuf>, mode: RecordsMode) -> Self {
        self.records = Some(RecordsOutput {
            path: path.into(),
            mode,
        });
        self
    }

    pub fn page_request(&self, page: u32) -> PageRequest {
        PageRequest {
            range: self.range,
            page_size: self.page_size,
            page,
        }
    }
}
