use crate::error::ReportError;
use crate::models::{AddressField, Order};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::btree_map;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSummary {
    pub order_count: u64,
    pub total_paid: Decimal,
    pub total_tax: Decimal,
}

impl StateSummary {
    fn from_order(order: &Order) -> Self {
        Self {
            order_count: 1,
            total_paid: order.amount_paid,
            total_tax: order.tax_amount,
        }
    }

    /// `None` when either running total would leave `Decimal`'s range.
    fn checked_merge(&self, other: &StateSummary) -> Option<Self> {
        Some(Self {
            order_count: self.order_count.checked_add(other.order_count)?,
            total_paid: self.total_paid.checked_add(other.total_paid)?,
            total_tax: self.total_tax.checked_add(other.total_tax)?,
        })
    }
}

/// Running per-state totals, keyed by the raw destination state string.
///
/// Blank states are kept under their own key. Iteration is ordered by state
/// code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTotals {
    states: BTreeMap<String, StateSummary>,
}

impl StateTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `orders` in. Stops at the first order whose amounts would
    /// overflow its state's totals; orders before it stay counted.
    pub fn add_orders<'a, I>(&mut self, orders: I, field: AddressField) -> Result<(), ReportError>
    where
        I: IntoIterator<Item = &'a Order>,
    {
        for order in orders {
            let state = order.destination_state(field);
            let incoming = StateSummary::from_order(order);
            match self.states.get_mut(state) {
                Some(summary) => {
                    *summary = summary
                        .checked_merge(&incoming)
                        .ok_or_else(|| ReportError::Overflow(state.to_string()))?;
                }
                None => {
                    self.states.insert(state.to_string(), incoming);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, state: &str) -> Option<&StateSummary> {
        self.states.get(state)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, StateSummary> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Grand total across every state.
    pub fn overall(&self) -> Result<StateSummary, ReportError> {
        self.states
            .values()
            .try_fold(StateSummary::default(), |acc, summary| acc.checked_merge(summary))
            .ok_or_else(|| ReportError::Overflow("all states".to_string()))
    }
}

impl<'a> IntoIterator for &'a StateTotals {
    type Item = (&'a String, &'a StateSummary);
    type IntoIter = btree_map::Iter<'a, String, StateSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, StateSummary)> for StateTotals {
    fn from_iter<T: IntoIterator<Item = (String, StateSummary)>>(iter: T) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}
