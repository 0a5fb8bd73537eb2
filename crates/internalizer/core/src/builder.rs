//! Graph construction from a module directory.

use crate::error::{BuildError, Result};
use crate::graph::{self, Graph, Package, PackageId, ROOT, SEPARATOR};
use crate::{gomod, imports};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Component, Path};
use walkdir::{DirEntry, WalkDir};

/// Directory names the Go toolchain never treats as packages of the module.
pub const GO_IGNORED_DIRS: &[&str] = &["vendor", "testdata"];

/// Source file extension.
const GO_EXT: &str = "go";

/// Options controlling which parts of the tree are visited.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Globs matched against `/`-separated paths relative to the module root.
    pub exclude: Vec<String>,
    /// Visit `vendor`, `testdata` and `.`/`_`-prefixed entries too.
    pub include_ignored_dirs: bool,
}

/// Build the package graph for the module rooted at `module_dir`.
pub fn build_graph(module_dir: &Path, opts: &WalkOptions) -> Result<Graph> {
    let module = gomod::read_module_path(module_dir)?;
    tracing::debug!("Module {} at {}", module, module_dir.display());

    let excludes = build_excludes(&opts.exclude)?;
    let mut builder = GraphBuilder::new(module);

    let walker = WalkDir::new(module_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| keep_entry(e, module_dir, opts, &excludes));

    let mut file_count = 0usize;
    for entry in walker {
        let entry = entry.map_err(|source| walk_error(module_dir, source))?;
        if !is_source_file(&entry) {
            continue;
        }

        let rel_dir = entry
            .path()
            .parent()
            .and_then(|dir| dir.strip_prefix(module_dir).ok())
            .unwrap_or_else(|| Path::new(""));
        let pkg_path = package_path(builder.module(), rel_dir);
        builder.add_source_file(&pkg_path, entry.path())?;
        file_count += 1;
    }

    let graph = builder.finish();
    tracing::info!(
        "Built graph for {}: {} packages from {} files",
        graph.module(),
        graph.package_count(),
        file_count
    );
    Ok(graph)
}

/// Exclusive owner of a graph under construction.
///
/// Package creation is idempotent: asking for a path that already exists
/// returns the existing node.
#[derive(Debug)]
pub struct GraphBuilder {
    module: String,
    packages: Vec<Package>,
    index: HashMap<String, PackageId>,
}

impl GraphBuilder {
    pub fn new(module: impl Into<String>) -> Self {
        let module = module.into();
        Self {
            packages: vec![Package::new(module.clone(), true)],
            index: HashMap::from([(module.clone(), ROOT)]),
            module,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Return the package at `path`, creating it and any missing ancestors.
    ///
    /// Returns `None` for paths outside the module.
    pub fn get_or_create(&mut self, path: &str) -> Option<PackageId> {
        if !graph::is_within(&self.module, path) {
            return None;
        }

        let mut cur = ROOT;
        for prefix in graph::module_prefixes(&self.module, path) {
            cur = match self.index.get(prefix) {
                Some(&id) => id,
                None => {
                    let id = PackageId(self.packages.len());
                    self.packages.push(Package::new(prefix.to_string(), false));
                    self.packages[cur.0].children.insert(prefix.to_string(), id);
                    self.index.insert(prefix.to_string(), id);
                    id
                }
            };
        }
        Some(cur)
    }

    /// Record an import edge; third-party, standard library and non-canonical
    /// imports are dropped. Returns whether the edge is first-party.
    pub fn add_import(&mut self, from: PackageId, import_path: &str) -> bool {
        if !is_canonical(import_path) {
            tracing::debug!("Skipping non-canonical import {}", import_path);
            return false;
        }
        let Some(target) = self.get_or_create(import_path) else {
            return false;
        };
        self.packages[from.0]
            .imports
            .entry(import_path.to_string())
            .or_insert(target);
        true
    }

    /// Attach `file` to the package at `pkg_path` and wire up its imports.
    pub fn add_source_file(&mut self, pkg_path: &str, file: &Path) -> Result<PackageId> {
        tracing::debug!("Visiting {} ({})", file.display(), pkg_path);
        let id = self.get_or_create(pkg_path).unwrap_or(ROOT);
        self.packages[id.0].files.push(file.to_path_buf());

        for import_path in imports::read_imports(file)? {
            if !self.add_import(id, &import_path) {
                tracing::trace!("Skipping non-module import {}", import_path);
            }
        }
        Ok(id)
    }

    pub fn finish(self) -> Graph {
        Graph::from_parts(self.module, self.packages, self.index)
    }
}

/// Package path for files in `rel_dir` (relative to the module root).
fn package_path(module: &str, rel_dir: &Path) -> String {
    let mut path = module.to_string();
    for component in rel_dir.components() {
        if let Component::Normal(seg) = component {
            path.push(SEPARATOR);
            path.push_str(&seg.to_string_lossy());
        }
    }
    path
}

/// No empty, `.` or `..` segments.
fn is_canonical(import_path: &str) -> bool {
    import_path
        .split(SEPARATOR)
        .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == GO_EXT)
}

/// Regular `.go` files, and symlinks that resolve to one. Symlinked
/// directories are never descended into.
fn is_source_file(entry: &DirEntry) -> bool {
    let file_like = entry.file_type().is_file()
        || (entry.path_is_symlink() && entry.path().is_file());
    file_like && is_go_file(entry.path())
}

fn walk_error(module_dir: &Path, source: walkdir::Error) -> BuildError {
    BuildError::Walk {
        path: source
            .path()
            .map_or_else(|| module_dir.to_path_buf(), Path::to_path_buf),
        source,
    }
}

fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| BuildError::InvalidExclude {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| BuildError::InvalidExclude {
        pattern: patterns.join(","),
        source,
    })
}

fn keep_entry(entry: &DirEntry, root: &Path, opts: &WalkOptions, excludes: &GlobSet) -> bool {
    if entry.depth() == 0 {
        return true;
    }

    let name = entry.file_name().to_string_lossy();
    let is_dir = entry.file_type().is_dir();

    if !opts.include_ignored_dirs
        && (name.starts_with('.')
            || name.starts_with('_')
            || (is_dir && GO_IGNORED_DIRS.contains(&&*name)))
    {
        tracing::debug!("Skipping ignored {}", entry.path().display());
        return false;
    }

    if is_dir && entry.path().join(gomod::GO_MOD).is_file() {
        tracing::debug!("Skipping nested module {}", entry.path().display());
        return false;
    }

    let rel = relative_slash_path(entry.path(), root);
    if excludes.is_match(&rel) {
        tracing::debug!("Excluded {}", rel);
        return false;
    }
    true
}

fn relative_slash_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn get_or_create_builds_ancestors_once() {
        let mut b = GraphBuilder::new("example.com");
        let d = b.get_or_create("example.com/b/c/d").unwrap();
        let again = b.get_or_create("example.com/b/c/d").unwrap();
        assert_eq!(d, again);
        b.get_or_create("example.com/b/e").unwrap();

        let g = b.finish();
        assert_eq!(
            g.paths(),
            vec![
                "example.com",
                "example.com/b",
                "example.com/b/c",
                "example.com/b/c/d",
                "example.com/b/e",
            ]
        );
        let b_pkg = g.get("example.com/b").unwrap();
        assert_eq!(
            b_pkg.children.keys().collect::<Vec<_>>(),
            vec!["example.com/b/c", "example.com/b/e"]
        );
        assert!(g.root().is_root);
        assert!(!b_pkg.is_root);
    }

    #[test]
    fn get_or_create_rejects_foreign_paths() {
        let mut b = GraphBuilder::new("example.com");
        assert_eq!(b.get_or_create("example.community/x"), None);
        assert_eq!(b.get_or_create("fmt"), None);
        assert_eq!(b.get_or_create("example.com"), Some(ROOT));
    }

    #[test]
    fn duplicate_imports_collapse() {
        let mut b = GraphBuilder::new("example.com");
        let from = b.get_or_create("example.com/x").unwrap();
        assert!(b.add_import(from, "example.com/y"));
        assert!(b.add_import(from, "example.com/y"));
        assert!(!b.add_import(from, "github.com/other/lib"));
        let g = b.finish();
        let x = g.get("example.com/x").unwrap();
        assert_eq!(x.imports.len(), 1);
        assert_eq!(g.package(x.imports["example.com/y"]).path, "example.com/y");
    }

    #[test]
    fn non_canonical_imports_create_no_packages() {
        let mut b = GraphBuilder::new("example.com");
        let from = b.get_or_create("example.com/x").unwrap();
        for odd in ["example.com//b", "example.com/b/", "example.com/./b", "example.com/b/.."] {
            assert!(!b.add_import(from, odd), "{odd}");
        }
        let g = b.finish();
        assert_eq!(g.paths(), vec!["example.com", "example.com/x"]);
        assert!(g.get("example.com/x").unwrap().imports.is_empty());
    }

    #[test]
    fn package_path_joins_segments() {
        assert_eq!(package_path("m.io/x", Path::new("")), "m.io/x");
        assert_eq!(package_path("m.io/x", Path::new("a/b")), "m.io/x/a/b");
    }

    #[test]
    fn skips_ignored_and_nested_module_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "a/a.go", "package a\n");
        write(root, "vendor/v/v.go", "package v\n");
        write(root, "a/testdata/t.go", "package t\n");
        write(root, "_scratch/s.go", "package s\n");
        write(root, ".hidden/h.go", "package h\n");
        write(root, "sub/go.mod", "module example.com/sub\n");
        write(root, "sub/s.go", "package sub\n");
        write(root, "a/README.md", "not go\n");

        let g = build_graph(root, &WalkOptions::default()).unwrap();
        assert_eq!(g.paths(), vec!["example.com", "example.com/a"]);
        assert_eq!(g.get("example.com/a").unwrap().files, vec![root.join("a/a.go")]);
    }

    #[test]
    fn include_ignored_dirs_visits_everything_but_nested_modules() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "vendor/v/v.go", "package v\n");
        write(root, "sub/go.mod", "module example.com/sub\n");
        write(root, "sub/s.go", "package sub\n");

        let opts = WalkOptions {
            include_ignored_dirs: true,
            ..Default::default()
        };
        let g = build_graph(root, &opts).unwrap();
        assert_eq!(
            g.paths(),
            vec!["example.com", "example.com/vendor", "example.com/vendor/v"]
        );
    }

    #[test]
    fn exclude_globs_apply_to_relative_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "a/a.go", "package a\n");
        write(root, "gen/g.go", "package gen\n");
        write(root, "a/a_test.go", "package a\n");

        let opts = WalkOptions {
            exclude: vec!["gen".into(), "**/*_test.go".into()],
            ..Default::default()
        };
        let g = build_graph(root, &opts).unwrap();
        assert_eq!(g.paths(), vec!["example.com", "example.com/a"]);
        assert_eq!(g.get("example.com/a").unwrap().files.len(), 1);
    }

    #[test]
    fn invalid_exclude_glob() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com\n");
        let opts = WalkOptions {
            exclude: vec!["a/[".into()],
            ..Default::default()
        };
        let err = build_graph(temp.path(), &opts).unwrap_err();
        assert!(matches!(err, BuildError::InvalidExclude { .. }));
    }

    #[test]
    fn root_level_files_belong_to_module_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(
            root,
            "main.go",
            "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/lib\"\n)\n",
        );

        let g = build_graph(root, &WalkOptions::default()).unwrap();
        assert_eq!(g.root().files, vec![root.join("main.go")]);
        assert!(g.root().imports.contains_key("example.com/lib"));
        assert!(g.contains("example.com/lib"));
        assert!(g.get("example.com/lib").unwrap().files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_sources_are_read() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "a/a.go", "package a\n");
        write(root, "shared/b.go", "package b\nimport \"example.com/a\"\n");
        std::fs::create_dir_all(root.join("b")).unwrap();
        std::os::unix::fs::symlink(root.join("shared/b.go"), root.join("b/b.go")).unwrap();
        // A linked directory is not walked.
        std::os::unix::fs::symlink(root.join("a"), root.join("alias")).unwrap();

        let g = build_graph(root, &WalkOptions::default()).unwrap();
        assert!(g.contains("example.com/b"));
        assert!(!g.contains("example.com/alias"));
        assert!(g.get("example.com/b").unwrap().imports.contains_key("example.com/a"));
        assert_eq!(g.get("example.com/b").unwrap().files, vec![root.join("b/b.go")]);
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_not_a_source() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::os::unix::fs::symlink(root.join("missing.go"), root.join("a/gone.go")).unwrap();

        let g = build_graph(root, &WalkOptions::default()).unwrap();
        assert_eq!(g.paths(), vec!["example.com"]);
    }

    #[test]
    fn walk_error_names_the_failing_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        let source = WalkDir::new(&missing).into_iter().next().unwrap().unwrap_err();

        let err = walk_error(temp.path(), source);
        assert!(matches!(err, BuildError::Walk { .. }));
        assert_eq!(err.path(), Some(missing.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_aborts_the_walk() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "locked/l.go", "package locked\n");
        let locked = root.join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = build_graph(root, &WalkOptions::default());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, BuildError::Walk { .. }));
        assert_eq!(err.path(), Some(locked.as_path()));
    }

    #[test]
    fn parse_failure_aborts_with_file_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com\n");
        write(root, "a/bad.go", "import \"x\"\n");

        let err = build_graph(root, &WalkOptions::default()).unwrap_err();
        assert_eq!(err.path(), Some(root.join("a/bad.go").as_path()));
    }
}
