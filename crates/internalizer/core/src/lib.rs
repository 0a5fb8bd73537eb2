//! Import-graph analysis for Go modules.
//!
//! Given a module directory, this builds the graph of first-party package
//! imports and proposes which packages can move under an `internal/`
//! directory so that only the subtree actually using them can import them.
//!
//! The pipeline runs strictly forward:
//! [`builder::build_graph`] → [`aggregate::collect_importers`] →
//! [`planner::Planner::plan`].

pub mod aggregate;
pub mod builder;
pub mod config;
pub mod error;
pub mod gomod;
pub mod graph;
pub mod imports;
pub mod planner;

pub use aggregate::{ImporterSets, collect_importers};
pub use builder::{GraphBuilder, WalkOptions, build_graph};
pub use config::InternalizerConfig;
pub use error::{BuildError, Result};
pub use graph::{Graph, Package, PackageId};
pub use planner::{DEFAULT_MARKER, MovePlan, Planner};

use std::path::Path;

/// Options for a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub walk: WalkOptions,
    pub marker: String,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            walk: WalkOptions::default(),
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl From<&InternalizerConfig> for AnalyzeOptions {
    fn from(cfg: &InternalizerConfig) -> Self {
        Self {
            walk: WalkOptions {
                exclude: cfg.exclude.clone(),
                include_ignored_dirs: cfg.include_ignored_dirs,
            },
            marker: cfg.marker.clone(),
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub graph: Graph,
    pub importers: ImporterSets,
    pub plan: MovePlan,
}

/// Build the graph for `module_dir` and plan its moves.
pub fn analyze(module_dir: &Path, opts: &AnalyzeOptions) -> Result<Analysis> {
    let graph = build_graph(module_dir, &opts.walk)?;
    let importers = collect_importers(&graph);
    let planner = Planner::new(opts.marker.clone());
    tracing::debug!("Planning moves under {}/ directories", planner.marker());
    let plan = planner.plan(&importers);
    Ok(Analysis {
        graph,
        importers,
        plan,
    })
}
