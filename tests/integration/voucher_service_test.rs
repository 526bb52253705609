// VoucherService against the in-memory pricing source and voucher store.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use helpers::*;
use rust_decimal_macros::dec;

use sales_voucher::core::{AppError, Result};
use sales_voucher::modules::pricing::models::{CustomerProfile, CustomerType};
use sales_voucher::modules::pricing::{InMemoryPricingSource, PricingSource};
use sales_voucher::modules::vouchers::models::{
    AuditStamp, LineItem, SalesVoucher, VoucherHeader, VoucherScope,
};
use sales_voucher::modules::vouchers::services::{
    LedgerProjector, SessionState, VoucherEditSession, VoucherService,
};
use sales_voucher::modules::vouchers::{InMemoryVoucherStore, VoucherStore};

fn service(
    session: VoucherEditSession,
    pricing: Arc<InMemoryPricingSource>,
    store: Arc<InMemoryVoucherStore>,
) -> VoucherService {
    VoucherService::new(session, pricing, store, LedgerProjector::default())
}

/// Header filled in and fg-1 / al4-1 selected with the given quantity
fn selected_session(quantity: rust_decimal::Decimal) -> VoucherEditSession {
    let mut session = header_session();
    session.select_finished_good(Some(finished_good())).unwrap();
    session.select_account_level4(Some(item())).unwrap();
    session.set_quantity(quantity).unwrap();
    session
}

async fn compose_priced(service: &VoucherService, quantity: rust_decimal::Decimal) {
    {
        let session = service.session();
        let mut session = session.lock().await;
        session.select_finished_good(Some(finished_good())).unwrap();
        session.select_account_level4(Some(item())).unwrap();
        session.set_quantity(quantity).unwrap();
    }
    service.refresh_pricing().await;
}

#[tokio::test]
async fn test_refresh_pricing_applies_every_lookup() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(selected_session(dec!(10)), pricing, store);

    let warnings = service.refresh_pricing().await;
    assert!(warnings.is_empty());

    let session = service.session();
    let session = session.lock().await;
    assert_eq!(session.form().rate, Some(dec!(5.00)));
    assert_eq!(session.form().rate_info.as_ref().unwrap().applicable_date, date(2024, 1, 1));
    assert_eq!(session.customer_type(), CustomerType::Registered);

    let preview = session.preview().unwrap();
    assert_eq!(preview.discount_total(), dec!(5.00));
    assert_eq!(preview.tax_total(), dec!(2.25));
    assert_eq!(preview.net_amount, dec!(47.25));
}

#[tokio::test]
async fn test_refresh_pricing_without_data_degrades() {
    let pricing = Arc::new(InMemoryPricingSource::new());
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(selected_session(dec!(10)), pricing, store);

    let warnings = service.refresh_pricing().await;

    // Rate and customer profile degrade; empty rule lists simply apply
    assert_eq!(warnings.len(), 2);
    let session = service.session();
    let session = session.lock().await;
    assert_eq!(session.form().rate, Some(rust_decimal::Decimal::ZERO));
    assert!(session.customer_profile().is_none());
}

#[tokio::test]
async fn test_commit_add_creates_voucher_once() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());

    compose_priced(&service, dec!(10)).await;
    let first = service.commit_add(&audit()).await.unwrap();
    compose_priced(&service, dec!(2)).await;
    let second = service.commit_add(&audit()).await.unwrap();

    assert!(first.id.is_some());
    assert_ne!(first.id, second.id);
    assert_eq!(store.len().await, 1);

    let voucher_id = service.session().lock().await.voucher_id().unwrap().to_string();
    let stored = store.find_voucher(&scope(), &voucher_id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 2);
    assert_eq!(stored.items[0].net_amount, dec!(47.25));
    assert_eq!(stored.created_by, "u-1");
    assert_eq!(service.totals().await.net_amount, dec!(56.70));
}

/// Store that cannot create vouchers
struct ReadOnlyStore(InMemoryVoucherStore);

#[async_trait]
impl VoucherStore for ReadOnlyStore {
    async fn create_voucher(
        &self,
        _header: &VoucherHeader,
        _first_item: &LineItem,
        _audit: &AuditStamp,
    ) -> Result<SalesVoucher> {
        Err(AppError::internal("connection reset"))
    }

    async fn find_voucher(&self, scope: &VoucherScope, voucher_id: &str) -> Result<Option<SalesVoucher>> {
        self.0.find_voucher(scope, voucher_id).await
    }

    async fn persist_line_item(
        &self,
        voucher_id: &str,
        item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<LineItem> {
        self.0.persist_line_item(voucher_id, item, audit).await
    }

    async fn delete_line_item(
        &self,
        voucher_id: &str,
        item_id: &str,
        audit: &AuditStamp,
    ) -> Result<bool> {
        self.0.delete_line_item(voucher_id, item_id, audit).await
    }

    async fn post_voucher(&self, voucher_id: &str, audit: &AuditStamp) -> Result<SalesVoucher> {
        self.0.post_voucher(voucher_id, audit).await
    }
}

#[tokio::test]
async fn test_failed_first_commit_leaves_session_unsaved() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(ReadOnlyStore(InMemoryVoucherStore::new()));
    let service = VoucherService::new(header_session(), pricing, store.clone(), LedgerProjector::default());

    compose_priced(&service, dec!(10)).await;
    let err = service.commit_add(&audit()).await.unwrap_err();

    assert!(matches!(err, AppError::Internal(_)));
    assert!(store.0.is_empty().await);
    let session = service.session();
    let session = session.lock().await;
    assert!(session.voucher_id().is_none());
    assert_eq!(session.items().count(), 0);
    assert_eq!(session.state(), SessionState::Composing);
}

#[tokio::test]
async fn test_duplicate_voucher_number_conflicts() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());

    let first = service(header_session(), pricing.clone(), store.clone());
    compose_priced(&first, dec!(1)).await;
    first.commit_add(&audit()).await.unwrap();

    let second = service(header_session(), pricing, store.clone());
    compose_priced(&second, dec!(1)).await;
    let err = second.commit_add(&audit()).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(second.session().lock().await.line_count(), 0);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_missing_voucher_number_is_rejected() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let mut session = VoucherEditSession::new(scope(), invoice_date());
    session.select_godown(Some(godown())).unwrap();
    session.select_debtor_account(Some(debtor())).unwrap();
    session.select_sub_account(Some(sub_account())).unwrap();
    let service = service(session, pricing, store.clone());

    compose_priced(&service, dec!(1)).await;
    let err = service.commit_add(&audit()).await.unwrap_err();

    assert_eq!(err.to_string(), "Validation error: Voucher number is required");
    assert!(store.is_empty().await);
    assert_eq!(service.session().lock().await.state(), SessionState::Composing);
}

#[tokio::test]
async fn test_commit_requires_user() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());
    compose_priced(&service, dec!(1)).await;

    let err = service.commit_add(&AuditStamp::new("  ")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_commit_update_replaces_stored_line() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());

    compose_priced(&service, dec!(10)).await;
    let added = service.commit_add(&audit()).await.unwrap();

    {
        let session = service.session();
        let mut session = session.lock().await;
        session.edit_item(0).unwrap();
        session.set_quantity(dec!(20)).unwrap();
    }
    let updated = service.commit_update(&AuditStamp::new("u-2")).await.unwrap();

    assert_eq!(updated.id, added.id);
    assert_eq!(updated.amount, dec!(100));
    assert!(updated.is_edited);

    let voucher_id = service.session().lock().await.voucher_id().unwrap().to_string();
    let stored = store.find_voucher(&scope(), &voucher_id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].net_amount, dec!(94.50));
    assert_eq!(stored.updated_by, "u-2");
}

#[tokio::test]
async fn test_commit_update_requires_editing() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store);
    compose_priced(&service, dec!(10)).await;

    let err = service.commit_update(&audit()).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_deleting_last_line_removes_voucher() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());

    compose_priced(&service, dec!(10)).await;
    service.commit_add(&audit()).await.unwrap();

    let deleted = service.commit_delete(0, &audit()).await.unwrap();

    assert!(deleted.voucher_emptied);
    assert!(store.is_empty().await);
    let session = service.session();
    let session = session.lock().await;
    assert!(session.voucher_id().is_none());
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_voucher_is_recreated_after_being_emptied() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());

    compose_priced(&service, dec!(10)).await;
    service.commit_add(&audit()).await.unwrap();
    service.commit_delete(0, &audit()).await.unwrap();

    compose_priced(&service, dec!(3)).await;
    service.commit_add(&audit()).await.unwrap();

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_post_locks_voucher_and_session() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing, store.clone());

    compose_priced(&service, dec!(10)).await;
    service.commit_add(&audit()).await.unwrap();

    let posted = service.post(&audit()).await.unwrap();
    assert!(posted.is_posted);
    assert!(posted.posted_at.is_some());

    let err = service.post(&audit()).await.unwrap_err();
    assert!(matches!(err, AppError::Locked(_)));

    assert!(matches!(service.commit_add(&audit()).await, Err(AppError::Locked(_))));
    assert!(matches!(service.commit_delete(0, &audit()).await, Err(AppError::Locked(_))));

    let stored = store.find_voucher(&scope(), &posted.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
}

#[tokio::test]
async fn test_post_requires_saved_voucher() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let mut session = header_session();
    compose_line(&mut session, dec!(1), dec!(5));
    session.add_item().unwrap();
    let service = service(session, pricing, store);

    let err = service.post(&audit()).await.unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Voucher has not been saved");
    assert!(!service.session().lock().await.is_posted());
}

#[tokio::test]
async fn test_open_voucher_restores_lines_and_overrides() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing.clone(), store.clone());

    compose_priced(&service, dec!(10)).await;
    service
        .session()
        .lock()
        .await
        .edit_discount_value("trade", dec!(10))
        .unwrap();
    service.commit_add(&audit()).await.unwrap();
    let voucher_id = service.session().lock().await.voucher_id().unwrap().to_string();

    let reopened = VoucherService::open_voucher(
        &scope(),
        &voucher_id,
        pricing as Arc<dyn PricingSource>,
        store as Arc<dyn VoucherStore>,
        LedgerProjector::default(),
        CustomerType::UnRegistered,
    )
    .await
    .unwrap();

    let session = reopened.session();
    let mut session = session.lock().await;
    assert_eq!(session.state(), SessionState::Composing);
    assert_eq!(session.line_count(), 1);
    assert_eq!(session.customer_profile(), Some(&CustomerProfile::registered()));

    session.edit_item(0).unwrap();
    let preview = session.preview().unwrap();
    assert_eq!(preview.discount_breakdown[0].value, dec!(10));
    assert_eq!(preview.discount_breakdown[0].rate, dec!(20));
    assert_eq!(preview.net_amount, dec!(42.00));
}

#[tokio::test]
async fn test_open_voucher_outside_scope_is_not_found() {
    let pricing = seeded_pricing().await;
    let store = Arc::new(InMemoryVoucherStore::new());
    let service = service(header_session(), pricing.clone(), store.clone());
    compose_priced(&service, dec!(1)).await;
    service.commit_add(&audit()).await.unwrap();
    let voucher_id = service.session().lock().await.voucher_id().unwrap().to_string();

    let other_scope = sales_voucher::modules::vouchers::models::VoucherScope::new("c-1", "l-2", "fy-24");
    let result = VoucherService::open_voucher(
        &other_scope,
        &voucher_id,
        pricing,
        store,
        LedgerProjector::default(),
        CustomerType::UnRegistered,
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}
