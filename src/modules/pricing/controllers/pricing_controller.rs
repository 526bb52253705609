use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::core::SelectableOption;
use crate::modules::pricing::models::{CustomerProfile, TaxOverrides, TaxRuleSet};
use crate::modules::pricing::services::{DiscountInputs, TaxInputs};
use crate::modules::vouchers::models::{InvoiceTotals, LedgerProjection, LineItem};
use crate::modules::vouchers::services::{LineCalculator, LineDraft};
use crate::state::AppState;

/// Body of `POST /api/pricing/lines`
#[derive(Debug, Deserialize)]
pub struct ComputeLineRequest {
    pub line: LineDraft,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub discounts: DiscountInputs,
    #[serde(default)]
    pub tax_rule_sets: Vec<TaxRuleSet>,
    #[serde(default)]
    pub tax_overrides: TaxOverrides,
    /// Falls back to the configured default customer type
    #[serde(default)]
    pub customer: Option<CustomerProfile>,
}

/// Body of `POST /api/pricing/ledger`
#[derive(Debug, Deserialize)]
pub struct ProjectLedgerRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<SelectableOption>,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub totals: InvoiceTotals,
    pub ledger: LedgerProjection,
}

/// Price one line
/// POST /api/pricing/lines
pub async fn compute_line(
    state: web::Data<AppState>,
    request: web::Json<ComputeLineRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let customer = request
        .customer
        .unwrap_or_else(|| CustomerProfile::new(state.config.default_customer_type));
    let taxes = TaxInputs {
        rule_sets: request.tax_rule_sets,
        invoice_date: request.invoice_date,
        overrides: request.tax_overrides,
    };

    let item = LineCalculator::new().compute_line(
        &request.line,
        &request.discounts,
        &taxes,
        Some(&customer),
    )?;

    Ok(HttpResponse::Ok().json(item))
}

/// Debit/credit view of a set of lines
/// POST /api/pricing/ledger
pub async fn project_ledger(
    state: web::Data<AppState>,
    request: web::Json<ProjectLedgerRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let projector = state.projector();
    let ledger = projector.project(&request.items, request.customer.as_ref());

    Ok(HttpResponse::Ok().json(LedgerResponse {
        totals: InvoiceTotals::from_items(&request.items),
        ledger,
    }))
}

/// Configure pricing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pricing")
            .route("/lines", web::post().to(compute_line))
            .route("/ledger", web::post().to(project_ledger)),
    );
}
