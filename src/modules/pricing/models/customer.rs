use serde::{Deserialize, Serialize};

/// Tax-authority registration status of a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CustomerType {
    #[serde(rename = "registered")]
    Registered,
    #[default]
    #[serde(rename = "un-registered")]
    UnRegistered,
}

impl std::fmt::Display for CustomerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerType::Registered => write!(f, "registered"),
            CustomerType::UnRegistered => write!(f, "un-registered"),
        }
    }
}

impl std::str::FromStr for CustomerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "registered" => Ok(CustomerType::Registered),
            "un-registered" | "unregistered" => Ok(CustomerType::UnRegistered),
            _ => Err(format!("Invalid customer type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    #[serde(default)]
    pub customer_type: CustomerType,
}

impl CustomerProfile {
    pub fn new(customer_type: CustomerType) -> Self {
        Self { customer_type }
    }

    pub fn registered() -> Self {
        Self::new(CustomerType::Registered)
    }

    pub fn unregistered() -> Self {
        Self::new(CustomerType::UnRegistered)
    }
}

/// Customer type for an optional profile; absent profiles are un-registered
pub fn customer_type_of(profile: Option<&CustomerProfile>) -> CustomerType {
    profile.map(|p| p.customer_type).unwrap_or_default()
}
