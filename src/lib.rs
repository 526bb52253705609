//! Sales voucher pricing service
//!
//! Prices sales voucher lines through the discount and tax engines, keeps an
//! edit session per voucher and projects the voucher's debit/credit ledger.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;
pub mod state;

use actix_web::web;

// Re-export commonly used types
pub use modules::pricing;
pub use modules::vouchers;
pub use modules::vouchers::services::{compute_line, project_ledger};
pub use state::AppState;

/// Mounts every route; shared by the binary and the HTTP tests
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(modules::health::controllers::configure).service(
        web::scope("/api")
            .configure(modules::pricing::controllers::configure)
            .configure(modules::vouchers::controllers::configure),
    );
}
