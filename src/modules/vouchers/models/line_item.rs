// A sales voucher line: one finished good sold at a rate, with the discount
// and tax breakdowns the engines recorded for it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Selectable, SelectableOption};
use crate::modules::pricing::models::{DiscountBreakdownEntry, RateEntry, TaxBreakdownEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Assigned by the store once persisted
    #[serde(default)]
    pub id: Option<String>,

    pub finished_good: SelectableOption,

    /// Priced ledger-account variant of the finished good
    pub account_level4: SelectableOption,

    #[serde(default)]
    pub unit_measurement: Option<SelectableOption>,

    pub quantity: Decimal,

    pub rate: Decimal,

    /// quantity × rate, rounded to 2 decimals
    pub amount: Decimal,

    #[serde(default)]
    pub discount_breakdown: Vec<DiscountBreakdownEntry>,

    /// amount − Σ discount values
    pub net_amount_before_tax: Decimal,

    #[serde(default)]
    pub tax_breakdown: Vec<TaxBreakdownEntry>,

    /// net_amount_before_tax + Σ tax values
    pub net_amount: Decimal,

    /// Set once any override was applied or the line was updated
    #[serde(default)]
    pub is_edited: bool,

    /// Set while the line is loaded back into the form
    #[serde(default)]
    pub is_being_edited: bool,

    /// Rate-history entry the rate came from, if any
    #[serde(default)]
    pub rate_info: Option<RateEntry>,
}

impl LineItem {
    pub fn discount_total(&self) -> Decimal {
        self.discount_breakdown.iter().map(|entry| entry.value).sum()
    }

    pub fn tax_total(&self) -> Decimal {
        self.tax_breakdown.iter().map(|entry| entry.value).sum()
    }

    /// Whether any discount or tax entry carries a user override
    pub fn has_edited_entries(&self) -> bool {
        self.discount_breakdown.iter().any(|entry| entry.is_edited)
            || self.tax_breakdown.iter().any(|entry| entry.is_edited)
    }

    /// Title used for the line's credit row
    pub fn product_title(&self) -> String {
        self.account_level4.label()
    }
}
