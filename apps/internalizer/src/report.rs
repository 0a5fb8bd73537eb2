//! Rendering a move plan for people and for tools.

use anyhow::Result;
use internalizer_core::Analysis;
use internalizer_core::graph::is_within;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct MoveEntry<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub importers: Vec<&'a str>,
}

/// The moves worth showing, sorted by original path.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub module: &'a str,
    pub moves: Vec<MoveEntry<'a>>,
    #[serde(skip)]
    elided: usize,
}

impl<'a> Report<'a> {
    /// Moves whose new path sits under one of `accepted` are left out.
    pub fn new(analysis: &'a Analysis, accepted: &[String]) -> Self {
        let mut elided = 0;
        let moves = analysis
            .plan
            .iter()
            .filter(|(_, to)| {
                let hide = is_accepted(to, accepted);
                if hide {
                    elided += 1;
                }
                !hide
            })
            .map(|(from, to)| MoveEntry {
                from,
                to,
                importers: analysis
                    .importers
                    .get(from)
                    .map(|set| set.iter().map(String::as_str).collect())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            module: analysis.graph.module(),
            moves,
            elided,
        }
    }

    /// Number of moves hidden by accepted prefixes.
    pub fn elided(&self) -> usize {
        self.elided
    }

    pub fn write_text<W: Write>(&self, w: &mut W, explain: bool) -> std::io::Result<()> {
        for entry in &self.moves {
            writeln!(w, "{} -> {}", entry.from, entry.to)?;
            if explain {
                for importer in &entry.importers {
                    writeln!(w, "    imported by {importer}")?;
                }
            }
        }
        Ok(())
    }

    pub fn write_json<W: Write>(&self, w: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *w, self)?;
        writeln!(w)?;
        Ok(())
    }
}

fn is_accepted(target: &str, accepted: &[String]) -> bool {
    accepted
        .iter()
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .any(|p| is_within(p, target))
}
