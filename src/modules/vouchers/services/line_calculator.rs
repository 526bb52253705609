use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::{in_range, round_money};
use crate::core::{AppError, Result, SelectableOption};
use crate::modules::pricing::models::{customer_type_of, CustomerProfile, RateEntry};
use crate::modules::pricing::services::{DiscountEngine, DiscountInputs, TaxEngine, TaxInputs};
use crate::modules::vouchers::models::LineItem;

/// Product, quantity and rate of a line before pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDraft {
    pub finished_good: SelectableOption,
    pub account_level4: SelectableOption,
    #[serde(default)]
    pub unit_measurement: Option<SelectableOption>,
    pub quantity: Decimal,
    pub rate: Decimal,
    #[serde(default)]
    pub rate_info: Option<RateEntry>,
}

/// Runs a line through the discount and tax engines.
///
/// Pure: the same inputs always produce the same line.
pub struct LineCalculator {
    discounts: DiscountEngine,
    taxes: TaxEngine,
}

impl LineCalculator {
    pub fn new() -> Self {
        Self {
            discounts: DiscountEngine::new(),
            taxes: TaxEngine::new(),
        }
    }

    pub fn compute_line(
        &self,
        draft: &LineDraft,
        discount_inputs: &DiscountInputs,
        tax_inputs: &TaxInputs,
        customer: Option<&CustomerProfile>,
    ) -> Result<LineItem> {
        Self::validate_quantity(draft.quantity)?;
        Self::validate_rate(draft.rate)?;

        let amount = round_money(in_range(draft.quantity.checked_mul(draft.rate))?);
        let discount = self.discounts.apply(amount, draft.quantity, discount_inputs)?;
        let tax = self.taxes.apply(
            discount.net_amount_before_tax,
            draft.quantity,
            customer_type_of(customer),
            tax_inputs,
        )?;

        let mut item = LineItem {
            id: None,
            finished_good: draft.finished_good.clone(),
            account_level4: draft.account_level4.clone(),
            unit_measurement: draft.unit_measurement.clone(),
            quantity: draft.quantity,
            rate: draft.rate,
            amount,
            discount_breakdown: discount.breakdown,
            net_amount_before_tax: discount.net_amount_before_tax,
            tax_breakdown: tax.breakdown,
            net_amount: tax.net_amount,
            is_edited: false,
            is_being_edited: false,
            rate_info: draft.rate_info.clone(),
        };
        item.is_edited = item.has_edited_entries();

        Ok(item)
    }

    fn validate_quantity(quantity: Decimal) -> Result<()> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::validation(format!(
                "Quantity must be positive, got: {}",
                quantity
            )));
        }
        Ok(())
    }

    fn validate_rate(rate: Decimal) -> Result<()> {
        if rate < Decimal::ZERO {
            return Err(AppError::validation(format!(
                "Rate must be non-negative, got: {}",
                rate
            )));
        }
        Ok(())
    }
}

impl Default for LineCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Prices one line; see [`LineCalculator::compute_line`]
pub fn compute_line(
    draft: &LineDraft,
    discount_inputs: &DiscountInputs,
    tax_inputs: &TaxInputs,
    customer: Option<&CustomerProfile>,
) -> Result<LineItem> {
    LineCalculator::new().compute_line(draft, discount_inputs, tax_inputs, customer)
}
