pub mod in_memory;
pub mod mysql;
pub mod voucher_store;

pub use in_memory::InMemoryVoucherStore;
pub use mysql::MySqlVoucherStore;
pub use voucher_store::VoucherStore;
