//! Result presentation: sorting, expansion and favorite membership
//!
//! [`ResultsView`] is the derived view state for one result list. It is built
//! when a search succeeds and dropped with it; nothing here outlives the
//! results it was built from. Expansion is tracked by identity key so it
//! survives re-sorting. Results sharing a key (the same place offered from
//! different source cities) are told apart by their arrival order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use wander_common::models::{Destination, DestinationKey};
use wander_common::Error;

use crate::error::ClientResult;
use crate::favorites::{FavoritesSlot, FavoritesStore, SaveOutcome};

/// Sort order for displayed results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Highest rating first
    #[default]
    Rating,
    /// Cheapest first
    AvgCostINR,
    /// Most popular first, missing scores count as 0
    PopularityScore,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Rating => "rating",
            SortKey::AvgCostINR => "cost",
            SortKey::PopularityScore => "popularity",
        }
    }

    fn compare(&self, a: &Destination, b: &Destination) -> Ordering {
        match self {
            SortKey::Rating => b.rating.total_cmp(&a.rating),
            SortKey::AvgCostINR => a.avg_cost_inr.total_cmp(&b.avg_cost_inr),
            SortKey::PopularityScore => b
                .popularity_score
                .unwrap_or(0.0)
                .total_cmp(&a.popularity_score.unwrap_or(0.0)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rating" => Ok(SortKey::Rating),
            "cost" | "avgcostinr" => Ok(SortKey::AvgCostINR),
            "popularity" | "popularityscore" => Ok(SortKey::PopularityScore),
            other => Err(Error::InvalidInput(format!(
                "unknown sort key '{}' (expected rating, cost or popularity)",
                other
            ))),
        }
    }
}

/// Stable sort of `results` by `key` into a new list
///
/// Ties keep their input order; the input is left untouched.
pub fn sort(results: &[Destination], key: SortKey) -> Vec<Destination> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| key.compare(a, b));
    sorted
}

/// What a completed search shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Search completed with zero results; not an error
    Empty,
    Results(usize),
}

/// One displayed result with its derived flags
#[derive(Debug, Clone)]
pub struct ResultCard<'a> {
    /// 1-based position in the displayed order
    pub position: usize,
    pub destination: &'a Destination,
    pub expanded: bool,
    pub saved: bool,
}

/// Identity key plus how many earlier results share it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExpansionKey {
    key: DestinationKey,
    occurrence: usize,
}

/// View state for one result list
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    results: Vec<Destination>,
    sort_key: SortKey,
    displayed: Vec<Destination>,
    displayed_keys: Vec<ExpansionKey>,
    expanded: HashSet<ExpansionKey>,
}

impl ResultsView {
    /// View over `results` in the default (rating) order
    pub fn new(results: Vec<Destination>) -> Self {
        let mut view = Self {
            results,
            sort_key: SortKey::default(),
            displayed: Vec::new(),
            displayed_keys: Vec::new(),
            expanded: HashSet::new(),
        };
        view.arrange();
        view
    }

    /// Rebuild the displayed order from the received order
    fn arrange(&mut self) {
        let mut seen: HashMap<DestinationKey, usize> = HashMap::new();
        let keys: Vec<ExpansionKey> = self
            .results
            .iter()
            .map(|d| {
                let key = d.key();
                let count = seen.entry(key.clone()).or_insert(0);
                let occurrence = *count;
                *count += 1;
                ExpansionKey { key, occurrence }
            })
            .collect();

        let mut order: Vec<usize> = (0..self.results.len()).collect();
        order.sort_by(|&a, &b| self.sort_key.compare(&self.results[a], &self.results[b]));

        self.displayed = order.iter().map(|&i| self.results[i].clone()).collect();
        self.displayed_keys = order.into_iter().map(|i| keys[i].clone()).collect();
    }

    /// Results as received from the service
    pub fn results(&self) -> &[Destination] {
        &self.results
    }

    /// Results in display order
    pub fn displayed(&self) -> &[Destination] {
        &self.displayed
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Re-sort from the received order
    pub fn set_sort_key(&mut self, key: SortKey) {
        if key != self.sort_key {
            self.sort_key = key;
            self.arrange();
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn presentation(&self) -> Presentation {
        if self.results.is_empty() {
            Presentation::Empty
        } else {
            Presentation::Results(self.results.len())
        }
    }

    /// Flip expansion of the displayed item at `index` (0-based)
    ///
    /// Returns the new expansion flag, or `None` when `index` is out of range.
    pub fn toggle_expansion(&mut self, index: usize) -> Option<bool> {
        let key = self.displayed_keys.get(index)?;
        if self.expanded.remove(key) {
            Some(false)
        } else {
            self.expanded.insert(key.clone());
            Some(true)
        }
    }

    /// Expand or collapse the displayed item at `index` (0-based)
    ///
    /// Returns `false` when `index` is out of range.
    pub fn set_expanded(&mut self, index: usize, expanded: bool) -> bool {
        let Some(key) = self.displayed_keys.get(index) else {
            return false;
        };
        if expanded {
            self.expanded.insert(key.clone());
        } else {
            self.expanded.remove(key);
        }
        true
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.displayed_keys
            .get(index)
            .map(|key| self.expanded.contains(key))
            .unwrap_or(false)
    }

    /// Number of distinct expanded destinations
    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_saved<S: FavoritesSlot>(&self, index: usize, store: &FavoritesStore<S>) -> bool {
        self.displayed
            .get(index)
            .map(|d| store.is_saved(d))
            .unwrap_or(false)
    }

    /// Bookmark the displayed item at `index` (0-based)
    ///
    /// Returns `None` when `index` is out of range.
    pub fn save<S: FavoritesSlot>(
        &self,
        index: usize,
        store: &mut FavoritesStore<S>,
    ) -> ClientResult<Option<SaveOutcome>> {
        match self.displayed.get(index) {
            Some(destination) => Ok(Some(store.save(destination)?)),
            None => Ok(None),
        }
    }

    /// Displayed items with their expansion and favorite flags
    pub fn cards<'a, S: FavoritesSlot>(&'a self, store: &FavoritesStore<S>) -> Vec<ResultCard<'a>> {
        self.displayed
            .iter()
            .zip(&self.displayed_keys)
            .enumerate()
            .map(|(index, (destination, key))| ResultCard {
                position: index + 1,
                destination,
                expanded: self.expanded.contains(key),
                saved: store.is_saved(destination),
            })
            .collect()
    }
}
