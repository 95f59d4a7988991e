//! The pagination loop: fetch every page of the window once, fold it into
//! per-state totals, optionally export raw rows, then write the aggregate.

use crate::aggregate::StateTotals;
use crate::client::OrderSource;
use crate::config::{RecordsMode, RecordsOutput, ReportConfig};
use crate::error::ReportError;
use crate::models::{AddressField, OrderPage};
use crate::output::{OrderRecordWriter, format_money, write_state_results};
use log::{debug, info};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub pages_fetched: u32,
    pub totals: StateTotals,
    /// Rows left in the order records file, when that export is enabled.
    pub order_rows: Option<u64>,
}

enum RecordSink {
    Disabled,
    Run(OrderRecordWriter),
    LastPage { path: PathBuf, rows: u64 },
}

impl RecordSink {
    fn open(records: Option<&RecordsOutput>) -> Result<Self, ReportError> {
        let sink = match records {
            None => RecordSink::Disabled,
            Some(out) => match out.mode {
                RecordsMode::Run => RecordSink::Run(OrderRecordWriter::create(&out.path)?),
                RecordsMode::LastPage => RecordSink::LastPage {
                    path: out.path.clone(),
                    rows: 0,
                },
            },
        };
        Ok(sink)
    }

    fn write_page(&mut self, page: &OrderPage, field: AddressField) -> Result<(), ReportError> {
        match self {
            RecordSink::Disabled => Ok(()),
            RecordSink::Run(writer) => writer.write_orders(&page.orders, field),
            RecordSink::LastPage { path, rows } => {
                let mut writer = OrderRecordWriter::create(path.as_path())?;
                writer.write_orders(&page.orders, field)?;
                *rows = writer.finish()?;
                Ok(())
            }
        }
    }

    fn finish(self) -> Result<Option<u64>, ReportError> {
        match self {
            RecordSink::Disabled => Ok(None),
            RecordSink::Run(writer) => writer.finish().map(Some),
            RecordSink::LastPage { rows, .. } => Ok(Some(rows)),
        }
    }
}

/// Run one report over `config.range`.
///
/// Page 1 is fetched first to learn the page count and its orders are used
/// directly; pages 2..=N follow strictly in order. Any error aborts the run
/// before the aggregate file is touched. Order rows already written for
/// earlier pages are left on disk.
pub async fn run_report<S: OrderSource>(
    source: &S,
    config: &ReportConfig,
) -> Result<ReportOutcome, ReportError> {
    info!(
        "Fetching orders from {} ({} per page, state from {})",
        config.range, config.page_size, config.state_field
    );

    let first = source.fetch_orders(&config.page_request(1)).await?;
    let pages = first.pages.max(1);
    info!(
        "API reports {} orders across {} pages",
        first.total, first.pages
    );

    let mut totals = StateTotals::new();
    let mut records = RecordSink::open(config.records.as_ref())?;
    absorb_page(&first, 1, pages, config, &mut totals, &mut records)?;

    for page in 2..=pages {
        let response = source.fetch_orders(&config.page_request(page)).await?;
        absorb_page(&response, page, pages, config, &mut totals, &mut records)?;
    }

    let order_rows = records.finish()?;
    let overall = totals.overall()?;
    write_state_results(&config.aggregate_path, &totals)?;

    info!(
        "State results saved to {}: {} orders in {} states, paid {}, tax {}",
        config.aggregate_path.display(),
        overall.order_count,
        totals.len(),
        format_money(overall.total_paid),
        format_money(overall.total_tax)
    );

    Ok(ReportOutcome {
        pages_fetched: pages,
        totals,
        order_rows,
    })
}

fn absorb_page(
    response: &OrderPage,
    page: u32,
    pages: u32,
    config: &ReportConfig,
    totals: &mut StateTotals,
    records: &mut RecordSink,
) -> Result<(), ReportError> {
    records.write_page(response, config.state_field)?;
    totals.add_orders(&response.orders, config.state_field)?;
    debug!(
        "Processed page {}/{} with {} orders",
        page,
        pages,
        response.orders.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PageRequest;
    use crate::config::DateRange;
    use crate::models::{Address, Order};
    use chrono::NaiveDate;
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use std::str::FromStr;
    use tempfile::TempDir;

    /// Serves canned pages and records which page numbers were requested.
    struct ScriptedSource {
        pages: Vec<OrderPage>,
        fail_on: Option<u32>,
        requested: RefCell<Vec<u32>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<OrderPage>) -> Self {
            Self {
                pages,
                fail_on: None,
                requested: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(mut self, page: u32) -> Self {
            self.fail_on = Some(page);
            self
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.borrow().clone()
        }
    }

    impl OrderSource for ScriptedSource {
        async fn fetch_orders(&self, request: &PageRequest) -> Result<OrderPage, ReportError> {
            self.requested.borrow_mut().push(request.page);
            if self.fail_on == Some(request.page) {
                return Err(ReportError::Status(StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(self
                .pages
                .get(request.page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn order(id: &str, ship_state: &str, bill_state: &str, paid: &str, tax: &str) -> Order {
        Order {
            order_number: id.to_string(),
            customer_email: format!("{}@example.com", id.to_lowercase()),
            ship_to: Address {
                state: ship_state.to_string(),
            },
            bill_to: Address {
                state: bill_state.to_string(),
            },
            amount_paid: Decimal::from_str(paid).unwrap(),
            tax_amount: Decimal::from_str(tax).unwrap(),
        }
    }

    /// `count` pages of two orders each; page `n` holds orders `P{n}-A` and `P{n}-B`.
    fn paged_orders(count: u32) -> Vec<OrderPage> {
        (1..=count)
            .map(|page| OrderPage {
                orders: vec![
                    order(&format!("P{page}-A"), "CA", "NV", "10.00", "1.00"),
                    order(&format!("P{page}-B"), "NY", "NJ", "5.50", "0.25"),
                ],
                total: u64::from(count) * 2,
                page,
                pages: count,
            })
            .collect()
    }

    fn config(dir: &Path) -> ReportConfig {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        ReportConfig::new(range).with_aggregate_path(dir.join("state_results.csv"))
    }

    #[tokio::test]
    async fn single_order_report() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![OrderPage {
            orders: vec![order("1001", "CA", "", "10.005", "0.75")],
            total: 1,
            page: 1,
            pages: 1,
        }]);

        let outcome = run_report(&source, &config(dir.path())).await.unwrap();

        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.order_rows, None);
        assert_eq!(source.requested(), vec![1]);
        let contents = fs::read_to_string(dir.path().join("state_results.csv")).unwrap();
        assert_eq!(
            contents,
            "State,NumOrders,TotalPaid,TotalTaxPaid\nCA,1,10.01,0.75\n"
        );
    }

    #[tokio::test]
    async fn no_orders_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(vec![OrderPage::default()]);

        let outcome = run_report(&source, &config(dir.path())).await.unwrap();

        assert!(outcome.totals.is_empty());
        assert_eq!(source.requested(), vec![1]);
        let contents = fs::read_to_string(dir.path().join("state_results.csv")).unwrap();
        assert_eq!(contents, "State,NumOrders,TotalPaid,TotalTaxPaid\n");
    }

    #[tokio::test]
    async fn fetches_each_page_once_and_appends_records() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("order_records.csv");
        let source = ScriptedSource::new(paged_orders(3));
        let config = config(dir.path()).with_order_records(&records_path, RecordsMode::Run);

        let outcome = run_report(&source, &config).await.unwrap();

        assert_eq!(source.requested(), vec![1, 2, 3]);
        assert_eq!(outcome.pages_fetched, 3);
        assert_eq!(outcome.order_rows, Some(6));

        let ca = outcome.totals.get("CA").unwrap();
        assert_eq!(ca.order_count, 3);
        assert_eq!(ca.total_paid, Decimal::from_str("30.00").unwrap());
        let ny = outcome.totals.get("NY").unwrap();
        assert_eq!(ny.order_count, 3);
        assert_eq!(ny.total_tax, Decimal::from_str("0.75").unwrap());

        let ids: Vec<String> = csv::Reader::from_path(&records_path)
            .unwrap()
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(ids, ["P1-A", "P1-B", "P2-A", "P2-B", "P3-A", "P3-B"]);

        let aggregate = fs::read_to_string(dir.path().join("state_results.csv")).unwrap();
        assert_eq!(
            aggregate,
            "State,NumOrders,TotalPaid,TotalTaxPaid\nCA,3,30.00,3.00\nNY,3,16.50,0.75\n"
        );
    }

    #[tokio::test]
    async fn failure_mid_run_leaves_earlier_records_and_no_aggregate() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("order_records.csv");
        let source = ScriptedSource::new(paged_orders(5)).failing_on(3);
        let config = config(dir.path()).with_order_records(&records_path, RecordsMode::Run);

        let err = run_report(&source, &config).await.unwrap_err();

        assert!(matches!(err, ReportError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        assert_eq!(source.requested(), vec![1, 2, 3]);
        assert!(!dir.path().join("state_results.csv").exists());
        let records = fs::read_to_string(&records_path).unwrap();
        assert_eq!(
            records,
            "Order ID,Email,State,Total Paid,Tax Paid\n\
             P1-A,p1-a@example.com,CA,10.00,1.00\n\
             P1-B,p1-b@example.com,NY,5.50,0.25\n\
             P2-A,p2-a@example.com,CA,10.00,1.00\n\
             P2-B,p2-b@example.com,NY,5.50,0.25\n"
        );
    }

    #[tokio::test]
    async fn amount_overflow_aborts_before_aggregate() {
        let dir = TempDir::new().unwrap();
        let huge = "70000000000000000000000000000";
        let source = ScriptedSource::new(vec![OrderPage {
            orders: vec![order("X-1", "CA", "", huge, "0"), order("X-2", "CA", "", huge, "0")],
            total: 2,
            page: 1,
            pages: 1,
        }]);

        let err = run_report(&source, &config(dir.path())).await.unwrap_err();

        assert!(matches!(err, ReportError::Overflow(ref state) if state == "CA"));
        assert!(!dir.path().join("state_results.csv").exists());
    }

    #[tokio::test]
    async fn failure_on_first_page_creates_no_files() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("order_records.csv");
        let source = ScriptedSource::new(paged_orders(2)).failing_on(1);
        let config = config(dir.path()).with_order_records(&records_path, RecordsMode::Run);

        assert!(run_report(&source, &config).await.is_err());
        assert!(!records_path.exists());
        assert!(!dir.path().join("state_results.csv").exists());
    }

    #[tokio::test]
    async fn last_page_mode_keeps_only_final_page() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("order_records.csv");
        let source = ScriptedSource::new(paged_orders(3));
        let config = config(dir.path()).with_order_records(&records_path, RecordsMode::LastPage);

        let outcome = run_report(&source, &config).await.unwrap();

        assert_eq!(outcome.order_rows, Some(2));
        assert_eq!(outcome.totals.get("CA").unwrap().order_count, 3);
        let records = fs::read_to_string(&records_path).unwrap();
        assert_eq!(
            records,
            "Order ID,Email,State,Total Paid,Tax Paid\n\
             P3-A,p3-a@example.com,CA,10.00,1.00\n\
             P3-B,p3-b@example.com,NY,5.50,0.25\n"
        );
    }

    #[tokio::test]
    async fn aggregates_by_bill_to_when_configured() {
        let dir = TempDir::new().unwrap();
        let source = ScriptedSource::new(paged_orders(2));
        let config = config(dir.path()).with_state_field(AddressField::BillTo);

        let outcome = run_report(&source, &config).await.unwrap();

        assert!(outcome.totals.get("CA").is_none());
        assert_eq!(outcome.totals.get("NV").unwrap().order_count, 2);
        assert_eq!(outcome.totals.get("NJ").unwrap().order_count, 2);
    }
}
