// Discount rules attached to a (debtor account, sub-account, finished good)
// triple, the per-entry overrides a user can make while composing a line, and
// the breakdown recorded on the line item.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::Selectable;

/// How a discount rate turns into a discount value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Rate is a percentage of the line amount
    Percentage,
    /// Rate is an amount per unit sold
    Quantity,
    /// Rate is the discount value itself
    Flat,
}

impl DiscountType {
    /// Discount value produced by `rate` on a line of `amount` / `quantity`.
    ///
    /// `None` when the value does not fit in a `Decimal`.
    pub fn value_for(&self, rate: Decimal, amount: Decimal, quantity: Decimal) -> Option<Decimal> {
        match self {
            DiscountType::Percentage => amount.checked_mul(rate / Decimal::ONE_HUNDRED),
            DiscountType::Quantity => quantity.checked_mul(rate),
            DiscountType::Flat => Some(rate),
        }
    }

    /// Rate that reproduces `value` on a line of `amount` / `quantity`.
    ///
    /// Zero when the divisor is zero, `None` on overflow.
    pub fn rate_for(&self, value: Decimal, amount: Decimal, quantity: Decimal) -> Option<Decimal> {
        match self {
            DiscountType::Percentage if amount.is_zero() => Some(Decimal::ZERO),
            DiscountType::Quantity if quantity.is_zero() => Some(Decimal::ZERO),
            DiscountType::Percentage => value
                .checked_div(amount)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED)),
            DiscountType::Quantity => value.checked_div(quantity),
            DiscountType::Flat => Some(value),
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Quantity => write!(f, "quantity"),
            DiscountType::Flat => write!(f, "flat"),
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "quantity" => Ok(DiscountType::Quantity),
            "flat" => Ok(DiscountType::Flat),
            _ => Err(format!("Invalid discount type: {}", s)),
        }
    }
}

/// One discount rate inside a rule-set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub discount_type_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub rate: Decimal,
    #[serde(default)]
    pub is_editable: bool,
}

/// Discount rates configured for one debtor / sub-account / finished good
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRuleSet {
    #[serde(default)]
    pub id: Option<String>,
    pub debtor_account_id: String,
    pub sub_account_id: String,
    pub finished_good_id: String,
    pub is_active: bool,
    /// Applied in this order
    pub rates: Vec<DiscountRule>,
}

/// A user's edit of one discount entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountOverride {
    /// Set once the user has opened the entry for editing
    pub editable: bool,
    #[serde(default)]
    pub edited_rate: Option<Decimal>,
    #[serde(default)]
    pub edited_value: Option<Decimal>,
}

impl DiscountOverride {
    pub fn with_rate(rate: Decimal) -> Self {
        Self {
            editable: true,
            edited_rate: Some(rate),
            edited_value: None,
        }
    }

    pub fn with_value(value: Decimal) -> Self {
        Self {
            editable: true,
            edited_rate: None,
            edited_value: Some(value),
        }
    }
}

/// Overrides keyed by `discount_type_id`
pub type DiscountOverrides = BTreeMap<String, DiscountOverride>;

/// What the discount engine recorded for one discount rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountBreakdownEntry {
    pub title: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub rate: Decimal,
    /// Non-negative for non-negative rates; reduces the running amount
    pub value: Decimal,
    pub discount_type_id: String,
    pub original_rate: Decimal,
    pub original_value: Decimal,
    pub is_editable: bool,
    #[serde(default)]
    pub is_edited: bool,
}

impl Selectable for DiscountBreakdownEntry {
    fn option_id(&self) -> &str {
        &self.discount_type_id
    }

    fn option_title(&self) -> &str {
        &self.title
    }
}
