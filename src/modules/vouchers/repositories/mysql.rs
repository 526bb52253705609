// MySQL-backed voucher store.
//
// Selections and breakdowns are stored as JSON columns; mutations run in a
// transaction that locks the voucher row first so posting and line changes
// serialize per voucher.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, Row, Transaction};
use uuid::Uuid;

use super::voucher_store::VoucherStore;
use crate::core::{AppError, Result, SelectableOption};
use crate::modules::pricing::models::{DiscountBreakdownEntry, RateEntry, TaxBreakdownEntry};
use crate::modules::vouchers::models::{
    AuditStamp, LineItem, SalesVoucher, VoucherHeader, VoucherScope,
};

pub struct MySqlVoucherStore {
    pool: MySqlPool,
}

impl MySqlVoucherStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Locks the voucher row and rejects changes to a posted voucher
    async fn lock_mutable(tx: &mut Transaction<'_, MySql>, voucher_id: &str) -> Result<()> {
        let row = sqlx::query("SELECT voucher_number, is_posted FROM sales_vouchers WHERE id = ? FOR UPDATE")
            .bind(voucher_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Voucher {} not found", voucher_id)))?;

        let is_posted: bool = row.try_get("is_posted")?;
        if is_posted {
            let number: String = row.try_get("voucher_number")?;
            return Err(AppError::locked(format!("voucher {} cannot be changed", number)));
        }
        Ok(())
    }

    async fn touch(tx: &mut Transaction<'_, MySql>, voucher_id: &str, user: &str) -> Result<()> {
        sqlx::query("UPDATE sales_vouchers SET updated_by = ?, updated_at = ? WHERE id = ?")
            .bind(user)
            .bind(Utc::now())
            .bind(voucher_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Appends `item` after the voucher's last line; returns the new item id
    async fn insert_item(
        tx: &mut Transaction<'_, MySql>,
        voucher_id: &str,
        item: &LineItem,
        user: &str,
    ) -> Result<String> {
        let item_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM sales_voucher_items WHERE voucher_id = ?",
        )
        .bind(voucher_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO sales_voucher_items (
                id, voucher_id, position, finished_good, account_level4, unit_measurement,
                quantity, rate, amount, discount_breakdown, net_amount_before_tax,
                tax_breakdown, net_amount, is_edited, rate_info,
                created_by, updated_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item_id)
        .bind(voucher_id)
        .bind(position)
        .bind(Json(&item.finished_good))
        .bind(Json(&item.account_level4))
        .bind(item.unit_measurement.as_ref().map(Json))
        .bind(item.quantity)
        .bind(item.rate)
        .bind(item.amount)
        .bind(Json(&item.discount_breakdown))
        .bind(item.net_amount_before_tax)
        .bind(Json(&item.tax_breakdown))
        .bind(item.net_amount)
        .bind(item.is_edited)
        .bind(item.rate_info.as_ref().map(Json))
        .bind(user)
        .bind(user)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(item_id)
    }

    async fn load_items(&self, voucher_id: &str) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, finished_good, account_level4, unit_measurement, quantity, rate, amount,
                   discount_breakdown, net_amount_before_tax, tax_breakdown, net_amount,
                   is_edited, rate_info
            FROM sales_voucher_items
            WHERE voucher_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }
}

fn item_from_row(row: &MySqlRow) -> Result<LineItem> {
    let finished_good: Json<SelectableOption> = row.try_get("finished_good")?;
    let account_level4: Json<SelectableOption> = row.try_get("account_level4")?;
    let unit_measurement: Option<Json<SelectableOption>> = row.try_get("unit_measurement")?;
    let discounts: Json<Vec<DiscountBreakdownEntry>> = row.try_get("discount_breakdown")?;
    let taxes: Json<Vec<TaxBreakdownEntry>> = row.try_get("tax_breakdown")?;
    let rate_info: Option<Json<RateEntry>> = row.try_get("rate_info")?;

    Ok(LineItem {
        id: Some(row.try_get("id")?),
        finished_good: finished_good.0,
        account_level4: account_level4.0,
        unit_measurement: unit_measurement.map(|json| json.0),
        quantity: row.try_get("quantity")?,
        rate: row.try_get("rate")?,
        amount: row.try_get("amount")?,
        discount_breakdown: discounts.0,
        net_amount_before_tax: row.try_get("net_amount_before_tax")?,
        tax_breakdown: taxes.0,
        net_amount: row.try_get("net_amount")?,
        is_edited: row.try_get("is_edited")?,
        is_being_edited: false,
        rate_info: rate_info.map(|json| json.0),
    })
}

fn voucher_from_row(row: &MySqlRow, items: Vec<LineItem>) -> Result<SalesVoucher> {
    let godown: Json<SelectableOption> = row.try_get("godown")?;
    let debtor_account: Json<SelectableOption> = row.try_get("debtor_account")?;
    let sub_account: Json<SelectableOption> = row.try_get("sub_account")?;

    Ok(SalesVoucher {
        id: row.try_get("id")?,
        header: VoucherHeader {
            scope: VoucherScope {
                company_id: row.try_get("company_id")?,
                location_id: row.try_get("location_id")?,
                financial_year_id: row.try_get("financial_year_id")?,
            },
            voucher_number: row.try_get("voucher_number")?,
            invoice_date: row.try_get("invoice_date")?,
            godown: godown.0,
            debtor_account: debtor_account.0,
            sub_account: sub_account.0,
            remarks: row.try_get("remarks")?,
        },
        items,
        is_posted: row.try_get("is_posted")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        posted_at: row.try_get("posted_at")?,
    })
}

#[async_trait]
impl VoucherStore for MySqlVoucherStore {
    async fn create_voucher(
        &self,
        header: &VoucherHeader,
        first_item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<SalesVoucher> {
        header.validate()?;
        let user = audit.require("createdBy")?;
        if let Some(item_id) = &first_item.id {
            return Err(AppError::not_found(format!("Line item {} not found", item_id)));
        }
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales_vouchers (
                id, company_id, location_id, financial_year_id, voucher_number, invoice_date,
                godown, debtor_account, sub_account, remarks, is_posted,
                created_by, updated_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&header.scope.company_id)
        .bind(&header.scope.location_id)
        .bind(&header.scope.financial_year_id)
        .bind(&header.voucher_number)
        .bind(header.invoice_date)
        .bind(Json(&header.godown))
        .bind(Json(&header.debtor_account))
        .bind(Json(&header.sub_account))
        .bind(&header.remarks)
        .bind(user)
        .bind(user)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::conflict(format!(
                        "Voucher number {} already exists",
                        header.voucher_number
                    ));
                }
            }
            AppError::Database(e)
        })?;

        let mut stored = first_item.clone();
        stored.is_being_edited = false;
        stored.id = Some(Self::insert_item(&mut tx, &id, first_item, user).await?);
        tx.commit().await?;

        tracing::info!(voucher_id = %id, voucher_number = %header.voucher_number, "Voucher created");

        Ok(SalesVoucher {
            id,
            header: header.clone(),
            items: vec![stored],
            is_posted: false,
            created_by: user.to_string(),
            updated_by: user.to_string(),
            created_at: now,
            updated_at: now,
            posted_at: None,
        })
    }

    async fn find_voucher(&self, scope: &VoucherScope, voucher_id: &str) -> Result<Option<SalesVoucher>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, location_id, financial_year_id, voucher_number, invoice_date,
                   godown, debtor_account, sub_account, remarks, is_posted,
                   created_by, updated_by, created_at, updated_at, posted_at
            FROM sales_vouchers
            WHERE id = ? AND company_id = ? AND location_id = ? AND financial_year_id = ?
            "#,
        )
        .bind(voucher_id)
        .bind(&scope.company_id)
        .bind(&scope.location_id)
        .bind(&scope.financial_year_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(voucher_id).await?;
                voucher_from_row(&row, items).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn persist_line_item(
        &self,
        voucher_id: &str,
        item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<LineItem> {
        let user = audit.require("updatedBy")?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        Self::lock_mutable(&mut tx, voucher_id).await?;

        let mut stored = item.clone();
        stored.is_being_edited = false;

        match &item.id {
            Some(item_id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE sales_voucher_items SET
                        finished_good = ?, account_level4 = ?, unit_measurement = ?,
                        quantity = ?, rate = ?, amount = ?, discount_breakdown = ?,
                        net_amount_before_tax = ?, tax_breakdown = ?, net_amount = ?,
                        is_edited = ?, rate_info = ?, updated_by = ?, updated_at = ?
                    WHERE id = ? AND voucher_id = ?
                    "#,
                )
                .bind(Json(&item.finished_good))
                .bind(Json(&item.account_level4))
                .bind(item.unit_measurement.as_ref().map(Json))
                .bind(item.quantity)
                .bind(item.rate)
                .bind(item.amount)
                .bind(Json(&item.discount_breakdown))
                .bind(item.net_amount_before_tax)
                .bind(Json(&item.tax_breakdown))
                .bind(item.net_amount)
                .bind(item.is_edited)
                .bind(item.rate_info.as_ref().map(Json))
                .bind(user)
                .bind(now)
                .bind(item_id)
                .bind(voucher_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::not_found(format!("Line item {} not found", item_id)));
                }
            }
            None => {
                stored.id = Some(Self::insert_item(&mut tx, voucher_id, item, user).await?);
            }
        }

        Self::touch(&mut tx, voucher_id, user).await?;
        tx.commit().await?;

        Ok(stored)
    }

    async fn delete_line_item(
        &self,
        voucher_id: &str,
        item_id: &str,
        audit: &AuditStamp,
    ) -> Result<bool> {
        let user = audit.require("updatedBy")?;
        let mut tx = self.pool.begin().await?;
        Self::lock_mutable(&mut tx, voucher_id).await?;

        let result = sqlx::query("DELETE FROM sales_voucher_items WHERE id = ? AND voucher_id = ?")
            .bind(item_id)
            .bind(voucher_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Line item {} not found", item_id)));
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales_voucher_items WHERE voucher_id = ?")
                .bind(voucher_id)
                .fetch_one(&mut *tx)
                .await?;

        let voucher_deleted = remaining == 0;
        if voucher_deleted {
            sqlx::query("DELETE FROM sales_vouchers WHERE id = ?")
                .bind(voucher_id)
                .execute(&mut *tx)
                .await?;
            tracing::info!(voucher_id = %voucher_id, "Last line removed; voucher deleted");
        } else {
            Self::touch(&mut tx, voucher_id, user).await?;
        }

        tx.commit().await?;
        Ok(voucher_deleted)
    }

    async fn post_voucher(&self, voucher_id: &str, audit: &AuditStamp) -> Result<SalesVoucher> {
        let user = audit.require("updatedBy")?;
        let mut tx = self.pool.begin().await?;
        Self::lock_mutable(&mut tx, voucher_id).await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales_voucher_items WHERE voucher_id = ?")
                .bind(voucher_id)
                .fetch_one(&mut *tx)
                .await?;
        if count == 0 {
            return Err(AppError::validation("Voucher must have at least one line item"));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE sales_vouchers SET is_posted = TRUE, posted_at = ?, updated_by = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(user)
        .bind(now)
        .bind(voucher_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT id, company_id, location_id, financial_year_id, voucher_number, invoice_date,
                   godown, debtor_account, sub_account, remarks, is_posted,
                   created_by, updated_by, created_at, updated_at, posted_at
            FROM sales_vouchers
            WHERE id = ?
            "#,
        )
        .bind(voucher_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let items = self.load_items(voucher_id).await?;
        tracing::info!(voucher_id = %voucher_id, lines = items.len(), "Voucher posted");
        voucher_from_row(&row, items)
    }
}
