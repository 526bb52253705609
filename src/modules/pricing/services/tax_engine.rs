use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::{in_range, round_money, round_rate};
use crate::core::Result;
use crate::modules::pricing::models::{
    CustomerType, TaxBreakdownEntry, TaxOverride, TaxOverrides, TaxRule, TaxRuleSet,
    TransactionType,
};

/// Everything the tax engine needs besides the line's figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInputs {
    #[serde(default)]
    pub rule_sets: Vec<TaxRuleSet>,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub overrides: TaxOverrides,
}

impl TaxInputs {
    pub fn new(rule_sets: Vec<TaxRuleSet>, invoice_date: NaiveDate) -> Self {
        Self {
            rule_sets,
            invoice_date,
            overrides: TaxOverrides::new(),
        }
    }

    pub fn with_override(mut self, tax_type_id: impl Into<String>, edit: TaxOverride) -> Self {
        self.overrides.insert(tax_type_id.into(), edit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxOutcome {
    pub breakdown: Vec<TaxBreakdownEntry>,
    pub net_amount: Decimal,
}

/// Applies the sale taxes effective on the invoice date
pub struct TaxEngine;

impl TaxEngine {
    pub fn new() -> Self {
        Self
    }

    /// Active rule-set with the latest `applicable_date <= invoice_date`.
    /// Ties on the date go to the first set found.
    pub fn select_applicable<'a>(
        &self,
        rule_sets: &'a [TaxRuleSet],
        invoice_date: NaiveDate,
    ) -> Option<&'a TaxRuleSet> {
        rule_sets
            .iter()
            .filter(|set| set.is_active && set.applicable_date <= invoice_date)
            .fold(None, |best: Option<&TaxRuleSet>, set| match best {
                Some(current) if current.applicable_date >= set.applicable_date => Some(current),
                _ => Some(set),
            })
    }

    /// Tax breakdown and final net amount for a line.
    ///
    /// Rules whose rate for `customer_type` is zero or negative are left out
    /// of the breakdown entirely.
    pub fn apply(
        &self,
        net_amount_before_tax: Decimal,
        quantity: Decimal,
        customer_type: CustomerType,
        inputs: &TaxInputs,
    ) -> Result<TaxOutcome> {
        let untaxed = TaxOutcome {
            breakdown: Vec::new(),
            net_amount: round_money(net_amount_before_tax),
        };

        if inputs.rule_sets.is_empty() || net_amount_before_tax.is_zero() {
            return Ok(untaxed);
        }

        let Some(rule_set) = self.select_applicable(&inputs.rule_sets, inputs.invoice_date) else {
            tracing::debug!(
                invoice_date = %inputs.invoice_date,
                "No tax rule-set applicable on invoice date"
            );
            return Ok(untaxed);
        };

        let mut running = net_amount_before_tax;
        let mut breakdown = Vec::new();

        for rule in rule_set
            .rules
            .iter()
            .filter(|rule| rule.transaction_type == TransactionType::Sale)
        {
            let edit = inputs.overrides.get(&rule.tax_type_id);
            if let Some(entry) =
                self.price_rule(rule, net_amount_before_tax, quantity, customer_type, edit)?
            {
                running = in_range(running.checked_add(entry.value))?;
                breakdown.push(entry);
            }
        }

        tracing::debug!(
            customer_type = %customer_type,
            taxes = breakdown.len(),
            net_amount = %running,
            "Applied tax rule-set"
        );

        Ok(TaxOutcome {
            breakdown,
            net_amount: round_money(running),
        })
    }

    fn price_rule(
        &self,
        rule: &TaxRule,
        base: Decimal,
        quantity: Decimal,
        customer_type: CustomerType,
        edit: Option<&TaxOverride>,
    ) -> Result<Option<TaxBreakdownEntry>> {
        let edit = edit.filter(|e| rule.is_editable && e.editable);
        let kind = rule.tax_type;

        let registered_value = edit
            .and_then(|e| e.edited_registered_rate)
            .unwrap_or(rule.registered_value);
        let unregistered_value = edit
            .and_then(|e| e.edited_unregistered_rate)
            .unwrap_or(rule.unregistered_value);

        let rate = match customer_type {
            CustomerType::Registered => registered_value,
            CustomerType::UnRegistered => unregistered_value,
        };
        if rate <= Decimal::ZERO {
            return Ok(None);
        }

        let original_rate = rule.rate_for_customer(customer_type);
        let original_value = if original_rate > Decimal::ZERO {
            round_money(in_range(kind.value_for(original_rate, base, quantity))?)
        } else {
            Decimal::ZERO
        };

        let rate_edited = edit.and_then(|e| e.edited_rate(customer_type)).is_some();
        let value_at_rate = round_money(in_range(kind.value_for(rate, base, quantity))?);
        let (current_rate, value, value_edited) = match edit.and_then(|e| e.edited_value) {
            // A value matching the column rate keeps that rate
            Some(value) if round_money(value) == value_at_rate => (rate, value_at_rate, true),
            Some(value) => {
                let value = round_money(value);
                let rate = in_range(kind.rate_for(value, base, quantity))?;
                (round_rate(rate), value, true)
            }
            None => (rate, value_at_rate, false),
        };

        Ok(Some(TaxBreakdownEntry {
            title: rule.title.clone(),
            registered_value,
            unregistered_value,
            current_rate,
            value,
            tax_type_id: rule.tax_type_id.clone(),
            transaction_type: rule.transaction_type,
            original_registered_value: rule.registered_value,
            original_unregistered_value: rule.unregistered_value,
            original_value,
            is_editable: rule.is_editable,
            tax_type: kind,
            is_edited: rate_edited || value_edited,
        }))
    }
}

impl Default for TaxEngine {
    fn default() -> Self {
        Self::new()
    }
}
