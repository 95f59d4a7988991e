//! Per-state sales and tax report for a ShipStation-style order API.
//! Pages through the orders placed in a date window, totals paid and tax
//! amounts by destination state and writes the result as CSV.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod report;

pub use aggregate::{StateSummary, StateTotals};
pub use client::{Client, Credentials, OrderSource, PageRequest};
pub use config::{DateRange, RecordsMode, ReportConfig};
pub use error::{ConfigError, ReportError};
pub use models::{AddressField, Order, OrderPage};
pub use report::{ReportOutcome, run_report};
