use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use log::error;
use state_sales_report::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use state_sales_report::config::{
    DEFAULT_AGGREGATE_PATH, DEFAULT_PAGE_SIZE, DEFAULT_RECORDS_PATH, DEFAULT_WINDOW_DAYS,
};
use state_sales_report::{
    AddressField, Client, Credentials, DateRange, RecordsMode, ReportConfig, ReportError,
    ReportOutcome, run_report,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "state-sales-report",
    about = "Total paid and tax amounts per destination state for orders in a date window"
)]
struct Cli {
    /// API key; falls back to SSKEY env var
    #[arg(long, env = "SSKEY", hide_env_values = true)]
    key: Option<String>,

    /// API secret; falls back to SSSECRET env var
    #[arg(long, env = "SSSECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Start date YYYY-MM-DD (requires --end)
    #[arg(long)]
    start: Option<String>,

    /// End date YYYY-MM-DD (requires --start)
    #[arg(long)]
    end: Option<String>,

    /// Days ending today to report on when --start/--end are not given
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    days: u64,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Address the destination state is read from
    #[arg(long, value_enum, default_value = "ship-to")]
    state_from: StateFrom,

    /// Aggregate CSV path
    #[arg(long, default_value = DEFAULT_AGGREGATE_PATH)]
    output: PathBuf,

    /// Also export every order to this CSV
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = DEFAULT_RECORDS_PATH
    )]
    order_records: Option<PathBuf>,

    /// Rewrite the order export on every page, keeping only the last page
    #[arg(long, requires = "order_records")]
    records_last_page_only: bool,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StateFrom {
    ShipTo,
    BillTo,
}

impl From<StateFrom> for AddressField {
    fn from(value: StateFrom) -> Self {
        match value {
            StateFrom::ShipTo => AddressField::ShipTo,
            StateFrom::BillTo => AddressField::BillTo,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();
    if let Err(err) = execute(cli, today).await {
        error!("{err}");
    }
}

async fn execute(cli: Cli, today: NaiveDate) -> Result<ReportOutcome, ReportError> {
    let credentials = Credentials::new(cli.key, cli.secret)?;
    let range = DateRange::resolve(cli.start.as_deref(), cli.end.as_deref(), today, cli.days)?;

    let mut config = ReportConfig::new(range)
        .with_page_size(cli.page_size)?
        .with_state_field(cli.state_from.into())
        .with_aggregate_path(cli.output);
    if let Some(path) = cli.order_records {
        let mode = if cli.records_last_page_only {
            RecordsMode::LastPage
        } else {
            RecordsMode::Run
        };
        config = config.with_order_records(path, mode);
    }

    let client = Client::with_timeout(credentials, Duration::from_secs(cli.timeout_secs))?
        .with_base_url(cli.base_url);
    run_report(&client, &config).await
}
