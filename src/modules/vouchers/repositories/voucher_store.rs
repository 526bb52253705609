use async_trait::async_trait;

use crate::core::Result;
use crate::modules::vouchers::models::{AuditStamp, LineItem, SalesVoucher, VoucherHeader, VoucherScope};

/// Persistence for sales vouchers and their line items
#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Creates an unposted voucher holding `first_item` as its only line.
    /// Either both are stored or neither is. `Conflict` when the voucher
    /// number is already taken within the header's scope.
    async fn create_voucher(
        &self,
        header: &VoucherHeader,
        first_item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<SalesVoucher>;

    /// Vouchers outside `scope` are reported as missing
    async fn find_voucher(&self, scope: &VoucherScope, voucher_id: &str) -> Result<Option<SalesVoucher>>;

    /// Inserts the item when it has no id yet, otherwise replaces the stored
    /// item with that id. Returns the item as stored.
    async fn persist_line_item(
        &self,
        voucher_id: &str,
        item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<LineItem>;

    /// Returns `true` when the voucher itself was deleted because `item_id`
    /// was its last item
    async fn delete_line_item(
        &self,
        voucher_id: &str,
        item_id: &str,
        audit: &AuditStamp,
    ) -> Result<bool>;

    /// `Locked` when already posted, `Validation` when the voucher has no items
    async fn post_voucher(&self, voucher_id: &str, audit: &AuditStamp) -> Result<SalesVoucher>;
}
