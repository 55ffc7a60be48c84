//! Set reconciliation for unordered string collections.

use std::collections::{HashMap, HashSet};

/// Membership changes needed to turn an observed set into a desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDelta {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl SetDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of single-member calls needed to apply the delta.
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Compute which members to add and remove.
///
/// Each distinct desired entry counts +1 and each distinct observed entry
/// counts -1. Positive tallies are additions, negative are removals.
/// Duplicates within one side count once. Output order follows first
/// appearance (desired first, then observed) so repeated runs issue calls in
/// the same order.
pub fn diff(desired: &[String], observed: &[String]) -> SetDelta {
    let mut tally: HashMap<&str, i64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (items, weight) in [(desired, 1), (observed, -1)] {
        let mut seen: HashSet<&str> = HashSet::new();
        for item in items {
            if !seen.insert(item.as_str()) {
                continue;
            }
            let entry = tally.entry(item.as_str()).or_insert_with(|| {
                order.push(item.as_str());
                0
            });
            *entry += weight;
        }
    }

    let mut delta = SetDelta::default();
    for item in order {
        match tally[item] {
            n if n > 0 => delta.to_add.push(item.to_string()),
            n if n < 0 => delta.to_remove.push(item.to_string()),
            _ => {}
        }
    }
    delta
}
