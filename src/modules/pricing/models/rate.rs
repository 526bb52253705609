use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One entry of an item's sale-rate history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub account_level4_id: String,
    pub rate: Decimal,
    pub applicable_date: NaiveDate,
    pub is_active: bool,
}

impl RateEntry {
    pub fn new(account_level4_id: impl Into<String>, rate: Decimal, applicable_date: NaiveDate) -> Self {
        Self {
            account_level4_id: account_level4_id.into(),
            rate,
            applicable_date,
            is_active: true,
        }
    }

    /// Whether this entry may price a sale dated `as_of`
    pub fn applies_on(&self, as_of: NaiveDate) -> bool {
        self.is_active && self.applicable_date <= as_of
    }
}
