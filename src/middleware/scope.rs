// Tenancy scope and audit user carried on every voucher request.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::core::AppError;
use crate::modules::vouchers::models::{AuditStamp, VoucherScope};

pub const COMPANY_HEADER: &str = "X-Company-Id";
pub const LOCATION_HEADER: &str = "X-Location-Id";
pub const FINANCIAL_YEAR_HEADER: &str = "X-Financial-Year-Id";
pub const USER_HEADER: &str = "X-User-Id";

/// Scope and audit stamp extracted from the request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scope: VoucherScope,
    pub audit: AuditStamp,
}

fn header(req: &HttpRequest, name: &str) -> Result<String, AppError> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation(format!("Missing {} header", name)))
}

impl RequestContext {
    pub fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
        let scope = VoucherScope::new(
            header(req, COMPANY_HEADER)?,
            header(req, LOCATION_HEADER)?,
            header(req, FINANCIAL_YEAR_HEADER)?,
        );
        // Read-only requests may omit the user; mutations check the stamp
        let user = header(req, USER_HEADER).unwrap_or_default();

        Ok(Self {
            scope,
            audit: AuditStamp::new(user),
        })
    }
}

impl FromRequest for RequestContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_headers(req))
    }
}
