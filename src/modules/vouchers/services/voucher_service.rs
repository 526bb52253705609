// Drives one voucher edit session against the pricing source and the store.
//
// Lookups release the session lock while they await, so a slow response
// never blocks the user; the fetch guard drops it if the selectors moved on.
// Commits and posting keep the lock for the whole round trip so the session
// and the store cannot diverge.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::{AppError, Result};
use crate::modules::pricing::models::CustomerType;
use crate::modules::pricing::repositories::PricingSource;
use crate::modules::vouchers::models::{
    AuditStamp, InvoiceTotals, LedgerProjection, LineItem, SalesVoucher, VoucherScope,
};
use crate::modules::vouchers::repositories::VoucherStore;

use super::edit_session::{DeletedLine, SessionState, VoucherEditSession};
use super::fetch_guard::{FetchKind, FetchOutcome, FetchWarning};
use super::ledger_projector::LedgerProjector;

pub type SharedSession = Arc<Mutex<VoucherEditSession>>;

pub struct VoucherService {
    session: SharedSession,
    pricing: Arc<dyn PricingSource>,
    store: Arc<dyn VoucherStore>,
    projector: LedgerProjector,
}

impl VoucherService {
    pub fn new(
        session: VoucherEditSession,
        pricing: Arc<dyn PricingSource>,
        store: Arc<dyn VoucherStore>,
        projector: LedgerProjector,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            pricing,
            store,
            projector,
        }
    }

    /// Rebuilds a session for a stored voucher and reloads its customer profile
    pub async fn open_voucher(
        scope: &VoucherScope,
        voucher_id: &str,
        pricing: Arc<dyn PricingSource>,
        store: Arc<dyn VoucherStore>,
        projector: LedgerProjector,
        default_customer_type: CustomerType,
    ) -> Result<Self> {
        let voucher = store
            .find_voucher(scope, voucher_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Voucher {} not found", voucher_id)))?;

        let session =
            VoucherEditSession::from_voucher(voucher).with_default_customer_type(default_customer_type);
        let service = Self::new(session, pricing, store, projector);
        service.refresh_customer_profile().await;
        Ok(service)
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn projector(&self) -> &LedgerProjector {
        &self.projector
    }

    // Lookups

    pub async fn refresh_rate(&self) -> Option<FetchOutcome> {
        let (ticket, account_level4_id, as_of) = {
            let mut session = self.session.lock().await;
            let ticket = session.begin_fetch(FetchKind::Rate)?;
            let item = session.form().account_level4.as_ref()?.id.clone();
            (ticket, item, session.invoice_date())
        };

        let response = self.pricing.resolve_rate(&account_level4_id, as_of).await;
        Some(self.session.lock().await.apply_rate(&ticket, response))
    }

    pub async fn refresh_discount_rules(&self) -> Option<FetchOutcome> {
        let (ticket, debtor_id, sub_id, good_id) = {
            let mut session = self.session.lock().await;
            let ticket = session.begin_fetch(FetchKind::DiscountRules)?;
            (
                ticket,
                session.debtor_account()?.id.clone(),
                session.sub_account()?.id.clone(),
                session.form().finished_good.as_ref()?.id.clone(),
            )
        };

        let response = self
            .pricing
            .resolve_discount_rules(&debtor_id, &sub_id, &good_id)
            .await;
        Some(self.session.lock().await.apply_discount_rules(&ticket, response))
    }

    pub async fn refresh_tax_rules(&self) -> Option<FetchOutcome> {
        let (ticket, good_id, item_id) = {
            let mut session = self.session.lock().await;
            let ticket = session.begin_fetch(FetchKind::TaxRules)?;
            (
                ticket,
                session.form().finished_good.as_ref()?.id.clone(),
                session.form().account_level4.as_ref()?.id.clone(),
            )
        };

        let response = self.pricing.resolve_tax_rules(&good_id, &item_id).await;
        Some(self.session.lock().await.apply_tax_rules(&ticket, response))
    }

    pub async fn refresh_customer_profile(&self) -> Option<FetchOutcome> {
        let (ticket, debtor_id, sub_id) = {
            let mut session = self.session.lock().await;
            let ticket = session.begin_fetch(FetchKind::CustomerProfile)?;
            (
                ticket,
                session.debtor_account()?.id.clone(),
                session.sub_account()?.id.clone(),
            )
        };

        let response = self
            .pricing
            .resolve_customer_profile(&debtor_id, &sub_id)
            .await;
        Some(self.session.lock().await.apply_customer_profile(&ticket, response))
    }

    /// Runs every lookup the current selections allow and returns the
    /// warnings raised along the way
    pub async fn refresh_pricing(&self) -> Vec<FetchWarning> {
        let (customer, rate, discounts, taxes) = tokio::join!(
            self.refresh_customer_profile(),
            self.refresh_rate(),
            self.refresh_discount_rules(),
            self.refresh_tax_rules(),
        );

        [customer, rate, discounts, taxes]
            .into_iter()
            .flatten()
            .filter_map(|outcome| outcome.warning().cloned())
            .collect()
    }

    // Commits

    /// Persists the composed line and appends it to the session. The first
    /// line creates the voucher in the same store call.
    pub async fn commit_add(&self, audit: &AuditStamp) -> Result<LineItem> {
        audit.require("updatedBy")?;
        let mut session = self.session.lock().await;
        if let SessionState::Editing(index) = session.state() {
            return Err(AppError::validation(format!(
                "Line {} is being edited; update it first",
                index + 1
            )));
        }

        let item = session.prepare_commit()?;
        let (voucher_id, stored) = self.store_line(&mut session, &item, audit).await?;
        session.commit_prepared(stored.clone())?;

        tracing::info!(voucher_id = %voucher_id, line_id = ?stored.id, "Line item added");
        Ok(stored)
    }

    /// Persists the edited line in place of the one being edited
    pub async fn commit_update(&self, audit: &AuditStamp) -> Result<LineItem> {
        audit.require("updatedBy")?;
        let mut session = self.session.lock().await;
        if !matches!(session.state(), SessionState::Editing(_)) {
            return Err(AppError::validation("No line is being edited"));
        }

        let item = session.prepare_commit()?;
        let (voucher_id, stored) = self.store_line(&mut session, &item, audit).await?;
        session.commit_prepared(stored.clone())?;

        tracing::info!(voucher_id = %voucher_id, line_id = ?stored.id, "Line item updated");
        Ok(stored)
    }

    /// Deletes line `index` from the store, then from the session
    pub async fn commit_delete(&self, index: usize, audit: &AuditStamp) -> Result<DeletedLine> {
        audit.require("updatedBy")?;
        let mut session = self.session.lock().await;
        session.ensure_unlocked()?;

        let item = session
            .item(index)
            .cloned()
            .ok_or_else(|| AppError::validation(format!("Line {} does not exist", index + 1)))?;

        if let (Some(voucher_id), Some(item_id)) = (session.voucher_id().map(str::to_string), item.id) {
            let voucher_deleted = self
                .store
                .delete_line_item(&voucher_id, &item_id, audit)
                .await?;
            if voucher_deleted {
                tracing::info!(voucher_id = %voucher_id, "Voucher removed with its last line");
            }
        }

        session.delete_item(index)
    }

    /// Posts the voucher. The ledger must balance first; once the store
    /// acknowledges, the session is locked before the lock is released.
    pub async fn post(&self, audit: &AuditStamp) -> Result<SalesVoucher> {
        audit.require("updatedBy")?;
        let mut session = self.session.lock().await;
        session.ensure_postable()?;

        let voucher_id = session
            .voucher_id()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Voucher has not been saved"))?;

        let projection = session.ledger(&self.projector);
        self.projector.verify(&projection)?;

        let voucher = self.store.post_voucher(&voucher_id, audit).await?;
        session.post()?;
        Ok(voucher)
    }

    pub async fn totals(&self) -> InvoiceTotals {
        self.session.lock().await.totals()
    }

    pub async fn ledger(&self) -> LedgerProjection {
        self.session.lock().await.ledger(&self.projector)
    }

    /// Writes `item` to the session's voucher. Without a voucher yet, the
    /// voucher is created together with `item` as its first line.
    async fn store_line(
        &self,
        session: &mut VoucherEditSession,
        item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<(String, LineItem)> {
        if let Some(voucher_id) = session.voucher_id().map(str::to_string) {
            let stored = self.store.persist_line_item(&voucher_id, item, audit).await?;
            return Ok((voucher_id, stored));
        }

        let header = session.header()?;
        let mut voucher = self.store.create_voucher(&header, item, audit).await?;
        let stored = voucher
            .items
            .pop()
            .ok_or_else(|| AppError::internal("Voucher created without its first line"))?;
        session.set_voucher_id(Some(voucher.id.clone()));
        Ok((voucher.id, stored))
    }
}
