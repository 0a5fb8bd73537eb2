//! Package graph: a tree of packages plus import edges between them.
//!
//! Nodes live in an arena owned by [`Graph`] and refer to each other by
//! [`PackageId`]. The `children` maps form a tree rooted at the module
//! package; `imports` maps are plain references into the same arena.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Separator between package path segments.
pub const SEPARATOR: char = '/';

/// Index of a package inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) usize);

/// One node of the module's package hierarchy.
#[derive(Debug, Clone)]
pub struct Package {
    /// Fully qualified import path.
    pub path: String,
    /// Whether this is the module's top-level package.
    pub is_root: bool,
    /// Source files in this package, in walk order.
    pub files: Vec<PathBuf>,
    /// Child packages, keyed by their full path.
    pub children: BTreeMap<String, PackageId>,
    /// First-party imports, keyed by imported path.
    pub imports: BTreeMap<String, PackageId>,
}

impl Package {
    pub(crate) fn new(path: String, is_root: bool) -> Self {
        Self {
            path,
            is_root,
            files: Vec::new(),
            children: BTreeMap::new(),
            imports: BTreeMap::new(),
        }
    }
}

/// The package graph of one module. Read-only once built.
#[derive(Debug, Clone)]
pub struct Graph {
    module: String,
    packages: Vec<Package>,
    index: HashMap<String, PackageId>,
}

impl Graph {
    pub(crate) fn from_parts(
        module: String,
        packages: Vec<Package>,
        index: HashMap<String, PackageId>,
    ) -> Self {
        Self {
            module,
            packages,
            index,
        }
    }

    /// The module path (also the root package's path).
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn root(&self) -> &Package {
        &self.packages[ROOT.0]
    }

    pub fn get(&self, path: &str) -> Option<&Package> {
        self.index.get(path).map(|id| &self.packages[id.0])
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Number of packages in the graph, the root included.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// All package paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.index.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Preorder traversal of the package tree, starting at the root.
    ///
    /// Siblings are visited in path order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            graph: self,
            stack: vec![ROOT],
        }
    }

    /// The module-relative ancestor prefixes of `path`; see [`module_prefixes`].
    pub fn prefixes<'p>(&self, path: &'p str) -> impl Iterator<Item = &'p str> + use<'p> {
        module_prefixes(&self.module, path)
    }
}

/// The module-relative ancestor prefixes of `path`, shortest first.
///
/// For `example.com/b/c` in module `example.com` this yields
/// `example.com/b` then `example.com/b/c`. The module root itself is
/// never yielded, and paths outside the module yield nothing.
pub fn module_prefixes<'p>(module: &str, path: &'p str) -> impl Iterator<Item = &'p str> + use<'p> {
    let start = relative_start(module, path).unwrap_or(path.len());
    path[start..]
        .match_indices(SEPARATOR)
        .map(move |(i, _)| start + i)
        .chain(std::iter::once(path.len()))
        .filter(move |&end| end > start)
        .map(move |end| &path[..end])
}

/// Byte offset where the module-relative part of `path` starts, if `path`
/// lies strictly inside `module`.
fn relative_start(module: &str, path: &str) -> Option<usize> {
    let rest = path.strip_prefix(module)?;
    let rest = rest.strip_prefix(SEPARATOR)?;
    (!rest.is_empty()).then_some(module.len() + 1)
}

/// Whether `path` is `module` or nested beneath it.
pub fn is_within(module: &str, path: &str) -> bool {
    match path.strip_prefix(module) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

pub(crate) const ROOT: PackageId = PackageId(0);

/// Iterator returned by [`Graph::walk`].
pub struct Walk<'g> {
    graph: &'g Graph,
    stack: Vec<PackageId>,
}

impl<'g> Iterator for Walk<'g> {
    type Item = &'g Package;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let pkg = self.graph.package(id);
        self.stack.extend(pkg.children.values().rev().copied());
        Some(pkg)
    }
}
