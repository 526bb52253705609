mod ledger;
mod line_item;
mod voucher;

pub use ledger::{LedgerProjection, LedgerRow, LedgerRowKind, LedgerTotals};
pub use line_item::LineItem;
pub use voucher::{AuditStamp, InvoiceTotals, SalesVoucher, VoucherHeader, VoucherScope};
