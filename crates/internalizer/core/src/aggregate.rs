//! Importer sets: who imports each package or any package beneath it.

use crate::graph::Graph;
use std::collections::{BTreeMap, BTreeSet};

/// Map from a package path (or an ancestor prefix of one) to the distinct
/// paths of the packages importing it or anything nested under it.
pub type ImporterSets = BTreeMap<String, BTreeSet<String>>;

/// Collect importer sets for every imported path and its ancestors.
///
/// An edge `P -> Q` registers `P` against `Q` and against every ancestor
/// of `Q` below the module root. A path that nothing imports has no entry.
pub fn collect_importers(graph: &Graph) -> ImporterSets {
    let mut sets = ImporterSets::new();
    for pkg in graph.walk() {
        for imported in pkg.imports.keys() {
            for prefix in graph.prefixes(imported) {
                sets.entry(prefix.to_string())
                    .or_default()
                    .insert(pkg.path.clone());
            }
        }
    }
    tracing::debug!("Collected importer sets for {} paths", sets.len());
    sets
}
