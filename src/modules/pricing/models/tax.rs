// Government tax rules for a (finished good, account-level-4 item) pair.
// Each rule carries one rate for registered customers and one for
// un-registered customers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::Selectable;

use super::customer::CustomerType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxType {
    /// Rate is a percentage of the net amount before tax
    Percentage,
    /// Rate is an amount per unit sold
    Quantity,
}

impl TaxType {
    /// `None` when the value overflows
    pub fn value_for(&self, rate: Decimal, base: Decimal, quantity: Decimal) -> Option<Decimal> {
        match self {
            TaxType::Quantity => quantity.checked_mul(rate),
            TaxType::Percentage => base.checked_mul(rate / Decimal::ONE_HUNDRED),
        }
    }

    /// Rate that reproduces `value`; zero when the divisor is zero
    pub fn rate_for(&self, value: Decimal, base: Decimal, quantity: Decimal) -> Option<Decimal> {
        match self {
            TaxType::Quantity if quantity.is_zero() => Some(Decimal::ZERO),
            TaxType::Percentage if base.is_zero() => Some(Decimal::ZERO),
            TaxType::Quantity => value.checked_div(quantity),
            TaxType::Percentage => value
                .checked_div(base)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Purchase,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Sale => write!(f, "sale"),
            TransactionType::Purchase => write!(f, "purchase"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRule {
    pub tax_type_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub tax_type: TaxType,
    pub registered_value: Decimal,
    pub unregistered_value: Decimal,
    #[serde(default)]
    pub is_editable: bool,
    pub transaction_type: TransactionType,
}

impl TaxRule {
    /// Rate column that applies to `customer_type`
    pub fn rate_for_customer(&self, customer_type: CustomerType) -> Decimal {
        match customer_type {
            CustomerType::Registered => self.registered_value,
            CustomerType::UnRegistered => self.unregistered_value,
        }
    }
}

/// Tax rules effective from `applicable_date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRuleSet {
    #[serde(default)]
    pub id: Option<String>,
    pub finished_good_id: String,
    pub account_level4_id: String,
    pub applicable_date: NaiveDate,
    pub is_active: bool,
    pub rules: Vec<TaxRule>,
}

/// A user's edit of one tax entry.
///
/// Edited rates are kept per customer-type column so switching the
/// customer's registration never reuses the other column's edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxOverride {
    pub editable: bool,
    #[serde(default)]
    pub edited_registered_rate: Option<Decimal>,
    #[serde(default)]
    pub edited_unregistered_rate: Option<Decimal>,
    #[serde(default)]
    pub edited_value: Option<Decimal>,
}

impl TaxOverride {
    pub fn edited_rate(&self, customer_type: CustomerType) -> Option<Decimal> {
        match customer_type {
            CustomerType::Registered => self.edited_registered_rate,
            CustomerType::UnRegistered => self.edited_unregistered_rate,
        }
    }

    pub fn set_edited_rate(&mut self, customer_type: CustomerType, rate: Decimal) {
        self.editable = true;
        match customer_type {
            CustomerType::Registered => self.edited_registered_rate = Some(rate),
            CustomerType::UnRegistered => self.edited_unregistered_rate = Some(rate),
        }
    }
}

/// Overrides keyed by `tax_type_id`
pub type TaxOverrides = BTreeMap<String, TaxOverride>;

/// What the tax engine recorded for one tax rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdownEntry {
    pub title: String,
    /// Registered column after any rate edit
    pub registered_value: Decimal,
    /// Un-registered column after any rate edit
    pub unregistered_value: Decimal,
    /// Rate actually applied, back-derived when the value was edited
    pub current_rate: Decimal,
    /// Increases the running amount
    pub value: Decimal,
    pub tax_type_id: String,
    pub transaction_type: TransactionType,
    pub original_registered_value: Decimal,
    pub original_unregistered_value: Decimal,
    pub original_value: Decimal,
    pub is_editable: bool,
    #[serde(rename = "type")]
    pub tax_type: TaxType,
    #[serde(default)]
    pub is_edited: bool,
}

impl Selectable for TaxBreakdownEntry {
    fn option_id(&self) -> &str {
        &self.tax_type_id
    }

    fn option_title(&self) -> &str {
        &self.title
    }
}
