use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::{in_range, round_money, round_rate};
use crate::core::Result;
use crate::modules::pricing::models::{
    DiscountBreakdownEntry, DiscountOverride, DiscountOverrides, DiscountRule, DiscountRuleSet,
};

/// Everything the discount engine needs besides the line's amount and quantity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountInputs {
    #[serde(default)]
    pub rule_sets: Vec<DiscountRuleSet>,
    #[serde(default)]
    pub overrides: DiscountOverrides,
}

impl DiscountInputs {
    pub fn new(rule_sets: Vec<DiscountRuleSet>) -> Self {
        Self {
            rule_sets,
            overrides: DiscountOverrides::new(),
        }
    }

    pub fn with_override(mut self, discount_type_id: impl Into<String>, edit: DiscountOverride) -> Self {
        self.overrides.insert(discount_type_id.into(), edit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub breakdown: Vec<DiscountBreakdownEntry>,
    pub net_amount_before_tax: Decimal,
}

/// Applies a line's discount rates in order, honouring user overrides
pub struct DiscountEngine;

impl DiscountEngine {
    pub fn new() -> Self {
        Self
    }

    /// The rule-set that applies to a line: the first one flagged active
    pub fn select_active<'a>(&self, rule_sets: &'a [DiscountRuleSet]) -> Option<&'a DiscountRuleSet> {
        rule_sets.iter().find(|set| set.is_active)
    }

    /// Discount breakdown and net amount before tax for a line of
    /// `amount` (quantity × rate) and `quantity`.
    ///
    /// Values are rounded to 2 decimals as they are recorded and the net
    /// amount is `amount` minus the recorded values. Discounts larger than
    /// the amount are not clamped. Figures that overflow `Decimal` are a
    /// validation error.
    pub fn apply(
        &self,
        amount: Decimal,
        quantity: Decimal,
        inputs: &DiscountInputs,
    ) -> Result<DiscountOutcome> {
        let undiscounted = DiscountOutcome {
            breakdown: Vec::new(),
            net_amount_before_tax: round_money(amount),
        };

        if inputs.rule_sets.is_empty() || amount.is_zero() {
            return Ok(undiscounted);
        }

        let Some(rule_set) = self.select_active(&inputs.rule_sets) else {
            tracing::debug!("No active discount rule-set among {}", inputs.rule_sets.len());
            return Ok(undiscounted);
        };

        let mut running = amount;
        let mut breakdown = Vec::with_capacity(rule_set.rates.len());

        for rule in &rule_set.rates {
            let entry =
                self.price_rule(rule, amount, quantity, inputs.overrides.get(&rule.discount_type_id))?;
            running = in_range(running.checked_sub(entry.value))?;
            breakdown.push(entry);
        }

        tracing::debug!(
            amount = %amount,
            discounts = breakdown.len(),
            net_amount_before_tax = %running,
            "Applied discount rule-set"
        );

        Ok(DiscountOutcome {
            breakdown,
            net_amount_before_tax: round_money(running),
        })
    }

    fn price_rule(
        &self,
        rule: &DiscountRule,
        amount: Decimal,
        quantity: Decimal,
        edit: Option<&DiscountOverride>,
    ) -> Result<DiscountBreakdownEntry> {
        let kind = rule.discount_type;
        let original_value = round_money(in_range(kind.value_for(rule.rate, amount, quantity))?);
        let edit = edit.filter(|e| rule.is_editable && e.editable);

        let (rate, value, is_edited) = match edit {
            // A value edited back to the rule's own value keeps the rule's rate
            Some(DiscountOverride {
                edited_value: Some(value),
                ..
            }) if round_money(*value) == original_value => (rule.rate, original_value, true),
            Some(DiscountOverride {
                edited_value: Some(value),
                ..
            }) => {
                let value = round_money(*value);
                let rate = in_range(kind.rate_for(value, amount, quantity))?;
                (round_rate(rate), value, true)
            }
            Some(DiscountOverride {
                edited_rate: Some(rate),
                ..
            }) => {
                let value = in_range(kind.value_for(*rate, amount, quantity))?;
                (*rate, round_money(value), true)
            }
            _ => (rule.rate, original_value, false),
        };

        Ok(DiscountBreakdownEntry {
            title: rule.title.clone(),
            discount_type: kind,
            rate,
            value,
            discount_type_id: rule.discount_type_id.clone(),
            original_rate: rule.rate,
            original_value,
            is_editable: rule.is_editable,
            is_edited,
        })
    }
}

impl Default for DiscountEngine {
    fn default() -> Self {
        Self::new()
    }
}
