// Sales voucher header, persisted voucher and invoice-level totals.
//
// A voucher belongs to exactly one company / location / financial year
// scope and becomes immutable once posted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::LineItem;
use crate::core::money::{nearly_equal, round_money};
use crate::core::{AppError, Result, SelectableOption};

/// Tenancy scope every voucher is filed under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherScope {
    pub company_id: String,
    pub location_id: String,
    pub financial_year_id: String,
}

impl VoucherScope {
    pub fn new(
        company_id: impl Into<String>,
        location_id: impl Into<String>,
        financial_year_id: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            location_id: location_id.into(),
            financial_year_id: financial_year_id.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.company_id.trim().is_empty() {
            return Err(AppError::missing_field("Company"));
        }
        if self.location_id.trim().is_empty() {
            return Err(AppError::missing_field("Location"));
        }
        if self.financial_year_id.trim().is_empty() {
            return Err(AppError::missing_field("Financial year"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherHeader {
    pub scope: VoucherScope,
    /// Issued by the numbering counter; unique within the scope
    pub voucher_number: String,
    pub invoice_date: NaiveDate,
    pub godown: SelectableOption,
    pub debtor_account: SelectableOption,
    pub sub_account: SelectableOption,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl VoucherHeader {
    pub fn validate(&self) -> Result<()> {
        self.scope.validate()?;
        if self.voucher_number.trim().is_empty() {
            return Err(AppError::missing_field("Voucher number"));
        }
        Ok(())
    }
}

/// Who is making a persistence change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub user_id: String,
}

impl AuditStamp {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// `field` names the audit column being filled ("createdBy", "updatedBy")
    pub fn require(&self, field: &str) -> Result<&str> {
        let user = self.user_id.trim();
        if user.is_empty() {
            return Err(AppError::missing_field(field));
        }
        Ok(user)
    }
}

/// A sales voucher as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesVoucher {
    pub id: String,
    pub header: VoucherHeader,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub is_posted: bool,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl SalesVoucher {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::from_items(&self.items)
    }

    /// Rejects any mutation once the voucher is posted
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.is_posted {
            return Err(AppError::locked(format!(
                "voucher {} cannot be changed",
                self.header.voucher_number
            )));
        }
        Ok(())
    }
}

/// Invoice-level sums over the line items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Σ line amount
    pub total_amount: Decimal,
    /// Σ (amount − net amount before tax)
    pub discount_amount: Decimal,
    /// Σ (net amount − net amount before tax)
    pub tax_amount: Decimal,
    /// Σ line net amount
    pub net_amount: Decimal,
}

impl InvoiceTotals {
    pub fn from_items(items: &[LineItem]) -> Self {
        let totals = items.iter().fold(Self::default(), |acc, item| Self {
            total_amount: acc.total_amount + item.amount,
            discount_amount: acc.discount_amount + (item.amount - item.net_amount_before_tax),
            tax_amount: acc.tax_amount + (item.net_amount - item.net_amount_before_tax),
            net_amount: acc.net_amount + item.net_amount,
        });

        Self {
            total_amount: round_money(totals.total_amount),
            discount_amount: round_money(totals.discount_amount),
            tax_amount: round_money(totals.tax_amount),
            net_amount: round_money(totals.net_amount),
        }
    }

    /// netAmount + discountAmount == totalAmount + taxAmount, within `tolerance`
    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        nearly_equal(
            self.net_amount + self.discount_amount,
            self.total_amount + self.tax_amount,
            tolerance,
        )
    }
}
