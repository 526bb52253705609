use chrono::NaiveDate;

use crate::modules::pricing::models::RateEntry;

/// Picks the unit rate that prices a sale on a given date
pub struct RateResolver;

impl RateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Latest active entry with `applicable_date <= as_of`.
    ///
    /// When two entries share the latest date the first one in `history`
    /// wins.
    pub fn latest_applicable<'a>(
        &self,
        history: &'a [RateEntry],
        as_of: NaiveDate,
    ) -> Option<&'a RateEntry> {
        history
            .iter()
            .filter(|entry| entry.applies_on(as_of))
            .fold(None, |best: Option<&RateEntry>, entry| match best {
                Some(current) if current.applicable_date >= entry.applicable_date => Some(current),
                _ => Some(entry),
            })
    }
}

impl Default for RateResolver {
    fn default() -> Self {
        Self::new()
    }
}
