pub mod edit_session;
pub mod fetch_guard;
pub mod ledger_projector;
pub mod line_calculator;
pub mod voucher_service;

pub use edit_session::{DeletedLine, LineForm, LineInputs, SessionState, VoucherEditSession};
pub use fetch_guard::{FetchKind, FetchOutcome, FetchTicket, FetchTracker, FetchWarning};
pub use ledger_projector::{project_ledger, LedgerProjector, DEFAULT_CUSTOMER_TITLE};
pub use line_calculator::{compute_line, LineCalculator, LineDraft};
pub use voucher_service::{SharedSession, VoucherService};
