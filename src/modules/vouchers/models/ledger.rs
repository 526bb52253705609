use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a ledger row posts against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRowKind {
    /// Customer sub-account, debited with the invoice net amount
    Customer,
    /// One discount title, summed over all lines
    Discount,
    /// One sold product line, credited with its pre-discount amount
    Product,
    /// One tax title, summed over all lines
    Tax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub kind: LedgerRowKind,
    pub title: String,
    pub amount: Decimal,
}

impl LedgerRow {
    pub fn new(kind: LedgerRowKind, title: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            title: title.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// netAmount + Σ discounts
    pub debit_total: Decimal,
    /// Σ line amount + Σ taxes
    pub credit_total: Decimal,
}

impl LedgerTotals {
    pub fn difference(&self) -> Decimal {
        self.debit_total - self.credit_total
    }
}

/// Two-column view of a voucher used on screen and on the printed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerProjection {
    pub debit_rows: Vec<LedgerRow>,
    pub credit_rows: Vec<LedgerRow>,
    pub totals: LedgerTotals,
    pub is_balanced: bool,
}
