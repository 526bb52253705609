// MySQL-backed pricing lookups.
//
// Rule members are stored as JSON arrays on the rule-set row so a rule-set
// is read back in the order it was configured.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};

use super::pricing_source::PricingSource;
use crate::core::{AppError, Result};
use crate::modules::pricing::models::{
    CustomerProfile, CustomerType, DiscountRule, DiscountRuleSet, RateEntry, TaxRule, TaxRuleSet,
};

pub struct MySqlPricingSource {
    pool: MySqlPool,
}

impl MySqlPricingSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PricingSource for MySqlPricingSource {
    async fn resolve_rate(
        &self,
        account_level4_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<RateEntry>> {
        let row = sqlx::query(
            r#"
            SELECT account_level4_id, rate, applicable_date, is_active
            FROM item_rates
            WHERE account_level4_id = ? AND applicable_date <= ? AND is_active = TRUE
            ORDER BY applicable_date DESC, id ASC
            LIMIT 1
            "#,
        )
        .bind(account_level4_id)
        .bind(as_of)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<RateEntry> {
            Ok(RateEntry {
                account_level4_id: row.try_get("account_level4_id")?,
                rate: row.try_get("rate")?,
                applicable_date: row.try_get("applicable_date")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .transpose()
    }

    async fn resolve_discount_rules(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
        finished_good_id: &str,
    ) -> Result<Vec<DiscountRuleSet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, debtor_account_id, sub_account_id, finished_good_id, is_active, rates
            FROM discount_rule_sets
            WHERE debtor_account_id = ? AND sub_account_id = ? AND finished_good_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(debtor_account_id)
        .bind(sub_account_id)
        .bind(finished_good_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<DiscountRuleSet> {
                let rates: Json<Vec<DiscountRule>> = row.try_get("rates")?;
                Ok(DiscountRuleSet {
                    id: Some(row.try_get("id")?),
                    debtor_account_id: row.try_get("debtor_account_id")?,
                    sub_account_id: row.try_get("sub_account_id")?,
                    finished_good_id: row.try_get("finished_good_id")?,
                    is_active: row.try_get("is_active")?,
                    rates: rates.0,
                })
            })
            .collect()
    }

    async fn resolve_tax_rules(
        &self,
        finished_good_id: &str,
        account_level4_id: &str,
    ) -> Result<Vec<TaxRuleSet>> {
        let rows = sqlx::query(
            r#"
            SELECT id, finished_good_id, account_level4_id, applicable_date, is_active, rules
            FROM tax_rule_sets
            WHERE finished_good_id = ? AND account_level4_id = ?
            ORDER BY applicable_date DESC, created_at ASC
            "#,
        )
        .bind(finished_good_id)
        .bind(account_level4_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<TaxRuleSet> {
                let rules: Json<Vec<TaxRule>> = row.try_get("rules")?;
                Ok(TaxRuleSet {
                    id: Some(row.try_get("id")?),
                    finished_good_id: row.try_get("finished_good_id")?,
                    account_level4_id: row.try_get("account_level4_id")?,
                    applicable_date: row.try_get("applicable_date")?,
                    is_active: row.try_get("is_active")?,
                    rules: rules.0,
                })
            })
            .collect()
    }

    async fn resolve_customer_profile(
        &self,
        debtor_account_id: &str,
        sub_account_id: &str,
    ) -> Result<Option<CustomerProfile>> {
        let customer_type: Option<String> = sqlx::query_scalar(
            r#"
            SELECT customer_type
            FROM customer_profiles
            WHERE debtor_account_id = ? AND sub_account_id = ?
            "#,
        )
        .bind(debtor_account_id)
        .bind(sub_account_id)
        .fetch_optional(&self.pool)
        .await?;

        customer_type
            .map(|raw| {
                raw.parse::<CustomerType>()
                    .map(CustomerProfile::new)
                    .map_err(AppError::internal)
            })
            .transpose()
    }
}
