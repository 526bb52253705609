use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::core::error::AppError;
use crate::middleware::RequestContext;
use crate::modules::vouchers::models::{InvoiceTotals, LedgerProjection, SalesVoucher};
use crate::state::AppState;

/// Stored voucher with its derived figures
#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    pub voucher: SalesVoucher,
    pub totals: InvoiceTotals,
    pub ledger: LedgerProjection,
}

#[derive(Debug, Serialize)]
pub struct DeleteItemResponse {
    pub item_id: String,
    pub voucher_deleted: bool,
}

fn voucher_response(state: &AppState, voucher: SalesVoucher) -> VoucherResponse {
    let ledger = state
        .projector()
        .project(&voucher.items, Some(&voucher.header.sub_account));
    VoucherResponse {
        totals: voucher.totals(),
        ledger,
        voucher,
    }
}

/// Get voucher by ID
/// GET /api/vouchers/{id}
pub async fn get_voucher(
    state: web::Data<AppState>,
    context: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let voucher_id = path.into_inner();
    let voucher = state
        .store
        .find_voucher(&context.scope, &voucher_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Voucher {} not found", voucher_id)))?;

    Ok(HttpResponse::Ok().json(voucher_response(&state, voucher)))
}

/// Post a voucher; no further changes are accepted afterwards
/// POST /api/vouchers/{id}/post
pub async fn post_voucher(
    state: web::Data<AppState>,
    context: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let voucher_id = path.into_inner();
    let service = state.open_voucher(&context.scope, &voucher_id).await?;
    let voucher = service.post(&context.audit).await?;

    Ok(HttpResponse::Ok().json(voucher_response(&state, voucher)))
}

/// Delete a line item; the voucher goes with its last line
/// DELETE /api/vouchers/{id}/items/{item_id}
pub async fn delete_item(
    state: web::Data<AppState>,
    context: RequestContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (voucher_id, item_id) = path.into_inner();
    let service = state.open_voucher(&context.scope, &voucher_id).await?;

    let index = {
        let session = service.session();
        let session = session.lock().await;
        let position = session
            .items()
            .position(|item| item.id.as_deref() == Some(item_id.as_str()));
        position.ok_or_else(|| AppError::not_found(format!("Line item {} not found", item_id)))?
    };

    let deleted = service.commit_delete(index, &context.audit).await?;

    Ok(HttpResponse::Ok().json(DeleteItemResponse {
        item_id,
        voucher_deleted: deleted.voucher_emptied,
    }))
}

/// Configure voucher routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/vouchers")
            .route("/{id}", web::get().to(get_voucher))
            .route("/{id}/post", web::post().to(post_voucher))
            .route("/{id}/items/{item_id}", web::delete().to(delete_item)),
    );
}
