// Pricing module: rates, discount and tax rule engines and their lookups

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{CustomerProfile, CustomerType, DiscountRuleSet, RateEntry, TaxRuleSet};
pub use repositories::{InMemoryPricingSource, MySqlPricingSource, PricingSource};
pub use services::{DiscountEngine, TaxEngine};
