mod customer;
mod discount;
mod rate;
mod tax;

pub use customer::{customer_type_of, CustomerProfile, CustomerType};
pub use discount::{
    DiscountBreakdownEntry, DiscountOverride, DiscountOverrides, DiscountRule, DiscountRuleSet,
    DiscountType,
};
pub use rate::RateEntry;
pub use tax::{
    TaxBreakdownEntry, TaxOverride, TaxOverrides, TaxRule, TaxRuleSet, TaxType, TransactionType,
};
