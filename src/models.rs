use crate::error::ReportError;
use log::debug;
use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Which address sub-object of an order carries the destination state.
///
/// Upstream responses have been seen with the state under either `shipTo` or
/// `billTo`; the correct one depends on the account's API contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddressField {
    #[default]
    ShipTo,
    BillTo,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = match self {
            AddressField::ShipTo => "shipTo",
            AddressField::BillTo => "billTo",
        };
        f.write_str(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(deserialize_with = "lenient_string")]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(rename = "orderNumber", deserialize_with = "lenient_string")]
    pub order_number: String,
    #[serde(rename = "customerEmail", deserialize_with = "lenient_string")]
    pub customer_email: String,
    #[serde(rename = "shipTo", deserialize_with = "null_as_default")]
    pub ship_to: Address,
    #[serde(rename = "billTo", deserialize_with = "null_as_default")]
    pub bill_to: Address,
    #[serde(rename = "amountPaid", deserialize_with = "lenient_decimal")]
    pub amount_paid: Decimal,
    #[serde(rename = "taxAmount", deserialize_with = "lenient_decimal")]
    pub tax_amount: Decimal,
}

impl Order {
    pub fn destination_state(&self, field: AddressField) -> &str {
        match field {
            AddressField::ShipTo => &self.ship_to.state,
            AddressField::BillTo => &self.bill_to.state,
        }
    }
}

/// One page of the `/orders` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderPage {
    #[serde(deserialize_with = "null_as_default")]
    pub orders: Vec<Order>,
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub pages: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(String::new()),
        Some(value) => {
            json_value_to_string(&value).ok_or_else(|| D::Error::custom("expected a scalar value"))
        }
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(Decimal::ZERO),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()).map_err(D::Error::custom),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(Value::String(s)) => parse_decimal(s.trim()).map_err(D::Error::custom),
        Some(_) => Err(D::Error::custom("expected a numeric amount")),
    }
}

// JSON floats print in shortest round-trip form, so 10.005 stays 10.005 here
// instead of picking up binary float error.
fn parse_decimal(raw: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw))
}

fn json_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode one `/orders` response body into an [`OrderPage`].
pub fn parse_order_page(data: &str) -> Result<OrderPage, ReportError> {
    let page: OrderPage = serde_json::from_str(data).map_err(ReportError::Decode)?;
    debug!(
        "Parsed page {}/{} with {} orders (total {})",
        page.page,
        page.pages,
        page.orders.len(),
        page.total
    );
    Ok(page)
}
