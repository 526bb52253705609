use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::voucher_store::VoucherStore;
use crate::core::{AppError, Result};
use crate::modules::vouchers::models::{AuditStamp, LineItem, SalesVoucher, VoucherHeader, VoucherScope};

/// Vouchers held in process, for tests and local runs
#[derive(Default)]
pub struct InMemoryVoucherStore {
    vouchers: RwLock<HashMap<String, SalesVoucher>>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.vouchers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vouchers.read().await.is_empty()
    }
}

fn missing_voucher(voucher_id: &str) -> AppError {
    AppError::not_found(format!("Voucher {} not found", voucher_id))
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn create_voucher(
        &self,
        header: &VoucherHeader,
        first_item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<SalesVoucher> {
        header.validate()?;
        let user = audit.require("createdBy")?.to_string();
        if let Some(item_id) = &first_item.id {
            return Err(AppError::not_found(format!("Line item {} not found", item_id)));
        }

        let mut vouchers = self.vouchers.write().await;
        let taken = vouchers.values().any(|existing| {
            existing.header.scope == header.scope
                && existing.header.voucher_number == header.voucher_number
        });
        if taken {
            return Err(AppError::conflict(format!(
                "Voucher number {} already exists",
                header.voucher_number
            )));
        }

        let mut stored = first_item.clone();
        stored.id = Some(Uuid::new_v4().to_string());
        stored.is_being_edited = false;

        let now = Utc::now();
        let voucher = SalesVoucher {
            id: Uuid::new_v4().to_string(),
            header: header.clone(),
            items: vec![stored],
            is_posted: false,
            created_by: user.clone(),
            updated_by: user,
            created_at: now,
            updated_at: now,
            posted_at: None,
        };
        vouchers.insert(voucher.id.clone(), voucher.clone());

        Ok(voucher)
    }

    async fn find_voucher(&self, scope: &VoucherScope, voucher_id: &str) -> Result<Option<SalesVoucher>> {
        Ok(self
            .vouchers
            .read()
            .await
            .get(voucher_id)
            .filter(|voucher| &voucher.header.scope == scope)
            .cloned())
    }

    async fn persist_line_item(
        &self,
        voucher_id: &str,
        item: &LineItem,
        audit: &AuditStamp,
    ) -> Result<LineItem> {
        let user = audit.require("updatedBy")?.to_string();

        let mut vouchers = self.vouchers.write().await;
        let voucher = vouchers
            .get_mut(voucher_id)
            .ok_or_else(|| missing_voucher(voucher_id))?;
        voucher.ensure_mutable()?;

        let mut stored = item.clone();
        stored.is_being_edited = false;
        match stored.id.clone() {
            Some(item_id) => {
                let slot = voucher
                    .items
                    .iter_mut()
                    .find(|existing| existing.id.as_deref() == Some(item_id.as_str()))
                    .ok_or_else(|| AppError::not_found(format!("Line item {} not found", item_id)))?;
                *slot = stored.clone();
            }
            None => {
                stored.id = Some(Uuid::new_v4().to_string());
                voucher.items.push(stored.clone());
            }
        }
        voucher.updated_by = user;
        voucher.updated_at = Utc::now();

        Ok(stored)
    }

    async fn delete_line_item(
        &self,
        voucher_id: &str,
        item_id: &str,
        audit: &AuditStamp,
    ) -> Result<bool> {
        let user = audit.require("updatedBy")?.to_string();

        let mut vouchers = self.vouchers.write().await;
        let voucher = vouchers
            .get_mut(voucher_id)
            .ok_or_else(|| missing_voucher(voucher_id))?;
        voucher.ensure_mutable()?;

        let position = voucher
            .items
            .iter()
            .position(|existing| existing.id.as_deref() == Some(item_id))
            .ok_or_else(|| AppError::not_found(format!("Line item {} not found", item_id)))?;
        voucher.items.remove(position);

        if voucher.items.is_empty() {
            vouchers.remove(voucher_id);
            return Ok(true);
        }
        voucher.updated_by = user;
        voucher.updated_at = Utc::now();
        Ok(false)
    }

    async fn post_voucher(&self, voucher_id: &str, audit: &AuditStamp) -> Result<SalesVoucher> {
        let user = audit.require("updatedBy")?.to_string();

        let mut vouchers = self.vouchers.write().await;
        let voucher = vouchers
            .get_mut(voucher_id)
            .ok_or_else(|| missing_voucher(voucher_id))?;
        voucher.ensure_mutable()?;
        if voucher.items.is_empty() {
            return Err(AppError::validation("Voucher must have at least one line item"));
        }

        let now = Utc::now();
        voucher.is_posted = true;
        voucher.posted_at = Some(now);
        voucher.updated_by = user;
        voucher.updated_at = now;

        Ok(voucher.clone())
    }
}
