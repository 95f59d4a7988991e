use crate::aggregate::StateTotals;
use crate::error::ReportError;
use crate::models::{AddressField, Order};
use csv::Writer;
use log::{debug, info};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const STATE_RESULTS_HEADER: [&str; 4] = ["State", "NumOrders", "TotalPaid", "TotalTaxPaid"];
pub const ORDER_RECORDS_HEADER: [&str; 5] =
    ["Order ID", "Email", "State", "Total Paid", "Tax Paid"];

/// Render a money value with exactly two decimals, rounding half away from zero.
pub fn format_money(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Write the per-state aggregate, replacing any existing file.
pub fn write_state_results(path: &Path, totals: &StateTotals) -> Result<(), ReportError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(STATE_RESULTS_HEADER)?;
    for (state, summary) in totals {
        writer.write_record([
            state.clone(),
            summary.order_count.to_string(),
            format_money(summary.total_paid),
            format_money(summary.total_tax),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {} state rows to {}", totals.len(), path.display());
    Ok(())
}

/// Per-order CSV export. Each call to [`write_orders`](Self::write_orders)
/// is flushed before returning, so rows from completed pages stay on disk
/// if a later page fails.
pub struct OrderRecordWriter {
    writer: Writer<File>,
    path: PathBuf,
    rows_written: u64,
}

impl OrderRecordWriter {
    /// Create (truncate) the file and write the header row.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let path = path.into();
        debug!("Creating order records file {}", path.display());
        let mut writer = Writer::from_path(&path)?;
        writer.write_record(ORDER_RECORDS_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            path,
            rows_written: 0,
        })
    }

    pub fn write_orders(
        &mut self,
        orders: &[Order],
        field: AddressField,
    ) -> Result<(), ReportError> {
        for order in orders {
            self.writer.write_record([
                order.order_number.as_str(),
                order.customer_email.as_str(),
                order.destination_state(field),
                format_money(order.amount_paid).as_str(),
                format_money(order.tax_amount).as_str(),
            ])?;
        }
        self.writer.flush()?;
        self.rows_written += orders.len() as u64;
        debug!(
            "Appended {} order rows to {} ({} total)",
            orders.len(),
            self.path.display(),
            self.rows_written
        );
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<u64, ReportError> {
        self.writer.flush()?;
        info!(
            "Wrote {} order rows to {}",
            self.rows_written,
            self.path.display()
        );
        Ok(self.rows_written)
    }
}
