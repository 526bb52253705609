use rust_decimal::Decimal;

use crate::core::money::{format_amount, nearly_equal, round_money};
use crate::core::{AppError, Result, Selectable, SelectableOption};
use crate::modules::vouchers::models::{
    InvoiceTotals, LedgerProjection, LedgerRow, LedgerRowKind, LedgerTotals, LineItem,
};

/// Title of the customer row when no sub-account is supplied
pub const DEFAULT_CUSTOMER_TITLE: &str = "Customer";

/// Builds the debit/credit view of a voucher's lines
#[derive(Debug, Clone)]
pub struct LedgerProjector {
    tolerance: Decimal,
}

impl LedgerProjector {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Debit side: customer sub-account (invoice net amount) then one row
    /// per distinct discount title. Credit side: one row per line (its
    /// amount) then one row per distinct tax title.
    ///
    /// An unbalanced projection is logged and flagged, never raised.
    pub fn project(&self, items: &[LineItem], customer: Option<&SelectableOption>) -> LedgerProjection {
        let totals = InvoiceTotals::from_items(items);
        let customer_title = customer
            .map(Selectable::label)
            .unwrap_or_else(|| DEFAULT_CUSTOMER_TITLE.to_string());

        let mut debit_rows = vec![LedgerRow::new(
            LedgerRowKind::Customer,
            customer_title,
            totals.net_amount,
        )];
        let mut credit_rows = Vec::with_capacity(items.len());
        let mut tax_rows = Vec::new();

        for item in items {
            for discount in &item.discount_breakdown {
                accumulate(&mut debit_rows, LedgerRowKind::Discount, discount, discount.value);
            }
            credit_rows.push(LedgerRow::new(
                LedgerRowKind::Product,
                item.product_title(),
                item.amount,
            ));
            for tax in &item.tax_breakdown {
                accumulate(&mut tax_rows, LedgerRowKind::Tax, tax, tax.value);
            }
        }
        credit_rows.extend(tax_rows);

        let totals = LedgerTotals {
            debit_total: round_money(debit_rows.iter().map(|row| row.amount).sum()),
            credit_total: round_money(credit_rows.iter().map(|row| row.amount).sum()),
        };
        let is_balanced = nearly_equal(totals.debit_total, totals.credit_total, self.tolerance);

        if !is_balanced {
            tracing::error!(
                debit_total = %totals.debit_total,
                credit_total = %totals.credit_total,
                lines = items.len(),
                "Ledger projection does not balance"
            );
        }

        LedgerProjection {
            debit_rows,
            credit_rows,
            totals,
            is_balanced,
        }
    }

    /// Raises `InvariantViolation` when the projection does not balance
    pub fn verify(&self, projection: &LedgerProjection) -> Result<()> {
        if projection.is_balanced {
            return Ok(());
        }
        Err(AppError::invariant(format!(
            "debit total {} differs from credit total {} by {}",
            format_amount(projection.totals.debit_total),
            format_amount(projection.totals.credit_total),
            format_amount(projection.totals.difference())
        )))
    }
}

impl Default for LedgerProjector {
    fn default() -> Self {
        Self::new(Decimal::new(1, 2))
    }
}

/// Adds `amount` to the row labelled like `source`, appending it on first sight
fn accumulate(rows: &mut Vec<LedgerRow>, kind: LedgerRowKind, source: &impl Selectable, amount: Decimal) {
    let title = source.label();
    match rows
        .iter_mut()
        .find(|row| row.kind == kind && row.title == title)
    {
        Some(row) => row.amount += amount,
        None => rows.push(LedgerRow::new(kind, title, amount)),
    }
}

/// Projects lines with the default tolerance and customer title
pub fn project_ledger(items: &[LineItem]) -> LedgerProjection {
    LedgerProjector::default().project(items, None)
}
