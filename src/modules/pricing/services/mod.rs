pub mod discount_engine;
pub mod rate_resolver;
pub mod tax_engine;

pub use discount_engine::{DiscountEngine, DiscountInputs, DiscountOutcome};
pub use rate_resolver::RateResolver;
pub use tax_engine::{TaxEngine, TaxInputs, TaxOutcome};
