//! Group-by reducers that turn raw report rows into chart-ready summaries.
//!
//! Groups are kept in first-seen order and the chart data is the first
//! [`CHART_GROUP_LIMIT`] of them. Nothing is sorted by magnitude.

pub mod search;
pub mod traffic;

use std::collections::HashMap;

/// Maximum number of groups emitted for chart data.
pub const CHART_GROUP_LIMIT: usize = 10;

/// Maximum number of raw rows emitted for the table.
pub const TABLE_ROW_LIMIT: usize = 20;

/// Key used for rows that carry no first dimension value.
pub const UNKNOWN_KEY: &str = "(unknown)";

/// Insertion-ordered accumulator map.
pub(crate) struct Grouped<S> {
    index: HashMap<String, usize>,
    groups: Vec<(String, S)>,
}

impl<S: Default> Grouped<S> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Accumulator for `key`, created empty on first sight.
    pub(crate) fn entry(&mut self, key: &str) -> &mut S {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                let slot = self.groups.len();
                self.index.insert(key.to_string(), slot);
                self.groups.push((key.to_string(), S::default()));
                slot
            }
        };
        &mut self.groups[slot].1
    }

    pub(crate) fn into_groups(self) -> Vec<(String, S)> {
        self.groups
    }
}
