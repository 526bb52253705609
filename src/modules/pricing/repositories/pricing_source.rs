use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::Result;
use crate::modules::pricing::models::{CustomerProfile, DiscountRuleSet, RateEntry, TaxRuleSet};

/// Lookups the pricing engine depends on.
///
/// `Ok(None)` / an empty list means nothing applies; callers degrade
/// rather than fail.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Latest active rate for the item with `applicable_date <= as_of`
    async fn resolve_rate(
        &self,
        account_level4_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<RateEntry>>;

    async fn resolve_discount_rules(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
        finished_good_id: &str,
    ) -> Result<Vec<DiscountRuleSet>>;

    async fn resolve_tax_rules(
        &self,
        finished_good_id: &str,
        account_level4_id: &str,
    ) -> Result<Vec<TaxRuleSet>>;

    async fn resolve_customer_profile(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
    ) -> Result<Option<CustomerProfile>>;
}
