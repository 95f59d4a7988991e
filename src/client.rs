use crate::config::DateRange;
use crate::error::{ConfigError, ReportError};
use crate::models::{OrderPage, parse_order_page};
use log::{debug, info};
use reqwest::{Client as HttpClient, Request, StatusCode, Url};
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://ssapi.shipstation.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_KEY_VAR: &str = "SSKEY";
pub const API_SECRET_VAR: &str = "SSSECRET";

/// API key and secret sent as HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Build credentials from possibly-unset values; empty strings count as unset.
    pub fn new(key: Option<String>, secret: Option<String>) -> Result<Self, ConfigError> {
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingCredential(API_SECRET_VAR))?;
        Ok(Self { key, secret })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parameters of a single `/orders` listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub range: DateRange,
    pub page_size: u32,
    pub page: u32,
}

impl PageRequest {
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("orderDateStart", self.range.start().format("%Y-%m-%d").to_string()),
            ("orderDateEnd", self.range.end().format("%Y-%m-%d").to_string()),
            ("pageSize", self.page_size.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

/// Anything that can hand out pages of orders.
pub trait OrderSource {
    fn fetch_orders(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<OrderPage, ReportError>>;
}

#[derive(Debug, Clone)]
pub struct Client {
    credentials: Credentials,
    http: HttpClient,
    base_url: String,
}

impl Client {
    /// Create a new client with the default base URL and timeout.
    pub fn new(credentials: Credentials) -> Result<Self, ReportError> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self, ReportError> {
        let http = HttpClient::builder().timeout(timeout).build()?;

        info!("Initialized order API client with default base URL");
        Ok(Self {
            credentials,
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (useful for tests or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Updated order API base URL to {}", self.base_url);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the authenticated GET for one page without sending it.
    pub fn build_request(&self, request: &PageRequest) -> Result<Request, ReportError> {
        let endpoint = format!("{}/orders", self.base_url);
        let url = Url::parse_with_params(&endpoint, request.query_pairs())
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        let built = self
            .http
            .get(url)
            .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
            .build()?;
        Ok(built)
    }

    /// Fetch and decode one page of orders.
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<OrderPage, ReportError> {
        let built = self.build_request(request)?;
        debug!("GET request to {}", built.url());
        let response = self.http.execute(built).await?;
        debug!("Received status {}", response.status());
        self.handle_status(response.status())?;
        let body = response.text().await?;
        let page = parse_order_page(&body)?;
        debug!("Decoded response: {:?}", page);
        Ok(page)
    }

    fn handle_status(&self, status: StatusCode) -> Result<(), ReportError> {
        if status.is_success() {
            return Ok(());
        }
        Err(ReportError::Status(status))
    }
}

impl OrderSource for Client {
    async fn fetch_orders(&self, request: &PageRequest) -> Result<OrderPage, ReportError> {
        self.fetch_page(request).await
    }
}
