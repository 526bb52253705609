use std::sync::Arc;

use crate::config::PricingConfig;
use crate::core::Result;
use crate::modules::pricing::repositories::PricingSource;
use crate::modules::vouchers::models::VoucherScope;
use crate::modules::vouchers::repositories::VoucherStore;
use crate::modules::vouchers::services::{LedgerProjector, VoucherService};

/// Collaborators shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub pricing: Arc<dyn PricingSource>,
    pub store: Arc<dyn VoucherStore>,
    pub config: PricingConfig,
}

impl AppState {
    pub fn new(
        pricing: Arc<dyn PricingSource>,
        store: Arc<dyn VoucherStore>,
        config: PricingConfig,
    ) -> Self {
        Self {
            pricing,
            store,
            config,
        }
    }

    pub fn projector(&self) -> LedgerProjector {
        LedgerProjector::new(self.config.ledger_tolerance)
    }

    /// Edit session for a stored voucher
    pub async fn open_voucher(&self, scope: &VoucherScope, voucher_id: &str) -> Result<VoucherService> {
        VoucherService::open_voucher(
            scope,
            voucher_id,
            Arc::clone(&self.pricing),
            Arc::clone(&self.store),
            self.projector(),
            self.config.default_customer_type,
        )
        .await
    }
}
