// Stale-response guard for the asynchronous pricing lookups.
//
// Every lookup is issued with a ticket carrying a monotonic sequence and the
// fingerprint of the selectors it was issued for. A response is applied only
// if its ticket is still the newest for its kind and the selectors have not
// moved on since.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Rate,
    DiscountRules,
    TaxRules,
    CustomerProfile,
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchKind::Rate => write!(f, "rate"),
            FetchKind::DiscountRules => write!(f, "discount rules"),
            FetchKind::TaxRules => write!(f, "tax rules"),
            FetchKind::CustomerProfile => write!(f, "customer profile"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTicket {
    pub kind: FetchKind,
    pub sequence: u64,
    pub fingerprint: String,
}

/// User-visible notice that a lookup degraded or failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWarning {
    pub kind: FetchKind,
    pub message: String,
}

impl FetchWarning {
    pub fn new(kind: FetchKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What happened to a lookup response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Applied,
    /// Nothing was found; the documented fallback was applied
    Degraded { warning: FetchWarning },
    /// The lookup failed; previous values were kept
    Failed { warning: FetchWarning },
    /// The response arrived after the selectors changed and was dropped
    Discarded,
}

impl FetchOutcome {
    pub fn warning(&self) -> Option<&FetchWarning> {
        match self {
            FetchOutcome::Degraded { warning } | FetchOutcome::Failed { warning } => Some(warning),
            FetchOutcome::Applied | FetchOutcome::Discarded => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FetchTracker {
    next_sequence: u64,
    latest: HashMap<FetchKind, u64>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier ticket of `kind`
    pub fn issue(&mut self, kind: FetchKind, fingerprint: String) -> FetchTicket {
        self.next_sequence += 1;
        self.latest.insert(kind, self.next_sequence);
        FetchTicket {
            kind,
            sequence: self.next_sequence,
            fingerprint,
        }
    }

    /// Whether a response for `ticket` may still be applied
    pub fn is_current(&self, ticket: &FetchTicket, current_fingerprint: Option<&str>) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.sequence)
            && current_fingerprint == Some(ticket.fingerprint.as_str())
    }

    /// Supersedes every outstanding ticket
    pub fn invalidate_all(&mut self) {
        self.next_sequence += 1;
        self.latest.clear();
    }
}
