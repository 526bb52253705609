use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::pricing_source::PricingSource;
use crate::core::Result;
use crate::modules::pricing::models::{CustomerProfile, DiscountRuleSet, RateEntry, TaxRuleSet};
use crate::modules::pricing::services::RateResolver;

/// Pricing data held in process, for tests and local runs
#[derive(Default)]
pub struct InMemoryPricingSource {
    rates: RwLock<HashMap<String, Vec<RateEntry>>>,
    discounts: RwLock<Vec<DiscountRuleSet>>,
    taxes: RwLock<Vec<TaxRuleSet>>,
    customers: RwLock<HashMap<(String, String), CustomerProfile>>,
}

impl InMemoryPricingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_rate(&self, entry: RateEntry) {
        self.rates
            .write()
            .await
            .entry(entry.account_level4_id.clone())
            .or_default()
            .push(entry);
    }

    pub async fn add_discount_rules(&self, rule_set: DiscountRuleSet) {
        self.discounts.write().await.push(rule_set);
    }

    pub async fn add_tax_rules(&self, rule_set: TaxRuleSet) {
        self.taxes.write().await.push(rule_set);
    }

    pub async fn set_customer_profile(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
        profile: CustomerProfile,
    ) {
        self.customers.write().await.insert(
            (debtor_account_id.to_string(), sub_account_id.to_string()),
            profile,
        );
    }
}

#[async_trait]
impl PricingSource for InMemoryPricingSource {
    async fn resolve_rate(
        &self,
        account_level4_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<RateEntry>> {
        let rates = self.rates.read().await;
        Ok(rates
            .get(account_level4_id)
            .and_then(|history| RateResolver::new().latest_applicable(history, as_of))
            .cloned())
    }

    async fn resolve_discount_rules(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
        finished_good_id: &str,
    ) -> Result<Vec<DiscountRuleSet>> {
        Ok(self
            .discounts
            .read()
            .await
            .iter()
            .filter(|set| {
                set.debtor_account_id == debtor_account_id
                    && set.sub_account_id == sub_account_id
                    && set.finished_good_id == finished_good_id
            })
            .cloned()
            .collect())
    }

    async fn resolve_tax_rules(
        &self,
        finished_good_id: &str,
        account_level4_id: &str,
    ) -> Result<Vec<TaxRuleSet>> {
        Ok(self
            .taxes
            .read()
            .await
            .iter()
            .filter(|set| {
                set.finished_good_id == finished_good_id
                    && set.account_level4_id == account_level4_id
            })
            .cloned()
            .collect())
    }

    async fn resolve_customer_profile(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
    ) -> Result<Option<CustomerProfile>> {
        Ok(self
            .customers
            .read()
            .await
            .get(&(debtor_account_id.to_string(), sub_account_id.to_string()))
            .cloned())
    }
}
