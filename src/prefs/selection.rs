use std::collections::BTreeSet;

use serde::Serialize;

use crate::api::Category;

/// Set of selected category ids.
///
/// Not pruned when the catalog changes, so it may hold ids the catalog no
/// longer lists; see [`CategorySelection::stale`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategorySelection(BTreeSet<i64>);

impl CategorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if unselected, unselect it otherwise.
    ///
    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Selected ids missing from `catalog`.
    pub fn stale(&self, catalog: &[Category]) -> Vec<i64> {
        self.iter()
            .filter(|id| !catalog.iter().any(|c| c.id == *id))
            .collect()
    }
}

impl FromIterator<i64> for CategorySelection {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
