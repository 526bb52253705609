pub mod in_memory;
pub mod mysql;
pub mod pricing_source;

pub use in_memory::InMemoryPricingSource;
pub use mysql::MySqlPricingSource;
pub use pricing_source::PricingSource;
