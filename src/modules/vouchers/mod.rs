// Vouchers module: sales voucher lines, edit session, ledger view and storage

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{LineItem, SalesVoucher, VoucherHeader, VoucherScope};
pub use repositories::{InMemoryVoucherStore, MySqlVoucherStore, VoucherStore};
pub use services::{VoucherEditSession, VoucherService};
