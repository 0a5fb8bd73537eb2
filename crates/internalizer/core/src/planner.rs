//! Move planning: the narrowest directory that covers every importer.
//!
//! For a path `p` imported by the set `I(p)`, the longest common segment
//! prefix of `{p} ∪ I(p)` is the deepest directory whose subtree contains
//! all of them. Placing `p` under `<prefix>/<marker>/` keeps it reachable
//! from exactly that subtree.

use crate::aggregate::ImporterSets;
use crate::graph::SEPARATOR;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default restricted-directory segment.
pub const DEFAULT_MARKER: &str = "internal";

/// Proposed renames, keyed by current package path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MovePlan {
    moves: BTreeMap<String, String>,
}

impl MovePlan {
    /// The proposed path for `path`, if it should move.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.moves.get(path).map(String::as_str)
    }

    /// `(original, proposed)` pairs sorted by original path.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.moves.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.moves
    }
}

impl FromIterator<(String, String)> for MovePlan {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            moves: iter.into_iter().collect(),
        }
    }
}

/// Split a package path into its segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).collect()
}

/// Longest common prefix of a set of segment sequences.
///
/// Slices order lexicographically with a strict prefix sorting before its
/// extensions, so the common prefix of the minimum and maximum is the
/// common prefix of the whole set. An empty input yields an empty prefix.
pub fn longest_common_prefix<'a, S: AsRef<[&'a str]>>(seqs: &[S]) -> Vec<&'a str> {
    let mut iter = seqs.iter().map(|s| s.as_ref());
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let (min, max) = iter.fold((first, first), |(min, max), s| (min.min(s), max.max(s)));
    min.iter()
        .zip(max)
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a)
        .collect()
}

/// Computes move proposals for a given restricted-directory marker.
#[derive(Debug, Clone)]
pub struct Planner {
    marker: String,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl Planner {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Build the move plan for every path with a recorded importer set.
    pub fn plan(&self, importers: &ImporterSets) -> MovePlan {
        let plan: MovePlan = importers
            .iter()
            .filter_map(|(path, set)| {
                self.plan_path(path, set)
                    .map(|target| (path.clone(), target))
            })
            .collect();
        tracing::info!(
            "Planned {} moves out of {} imported paths",
            plan.len(),
            importers.len()
        );
        plan
    }

    /// The proposed new path for `path`, or `None` when it is already scoped.
    pub fn plan_path(&self, path: &str, importers: &BTreeSet<String>) -> Option<String> {
        if importers.is_empty() {
            return None;
        }

        let mut seqs = Vec::with_capacity(importers.len() + 1);
        seqs.push(segments(path));
        seqs.extend(importers.iter().map(|p| segments(p)));
        let lcp = longest_common_prefix(&seqs);

        let prefix = lcp.join(SEPARATOR.to_string().as_str());
        if prefix == path {
            return None;
        }
        if lcp.last() == Some(&self.marker.as_str()) {
            tracing::trace!("{} already sits in a {} directory", path, self.marker);
            return None;
        }

        let rest = path[prefix.len()..].trim_start_matches(SEPARATOR);
        if rest.split(SEPARATOR).next() == Some(self.marker.as_str()) {
            tracing::trace!("{} is already scoped under {}", path, prefix);
            return None;
        }

        let target = if prefix.is_empty() {
            format!("{}/{rest}", self.marker)
        } else {
            format!("{prefix}/{}/{rest}", self.marker)
        };
        tracing::debug!("{} -> {} (covering {} importers)", path, target, importers.len());
        Some(target)
    }
}
