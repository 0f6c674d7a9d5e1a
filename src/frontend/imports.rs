//! Collects the modules a program depends on. Resolving and compiling them is
//! up to the caller.

use std::path::{Path, PathBuf};

use super::{
    ast::{
        visit::{walk_node, walk_program, Visitor},
        Node, NodeKind, Program,
    },
    intern::InternedSymbol,
    SourceLocation,
};

pub const SOURCE_EXTENSION: &str = "sprig";

/// One `(import ...)` form
#[derive(Debug, Clone, PartialEq)]
pub struct Require {
    pub name: String,
    pub alias: InternedSymbol,
    /// Where the module's source is expected, next to the importing file
    pub location: PathBuf,
    pub source: SourceLocation,
}

/// Finds every import in `program`, in source order
pub fn collect_requires(program: &Program, importer: &Path) -> Vec<Require> {
    let mut collector = RequireCollector {
        directory: importer.parent().unwrap_or(Path::new("")),
        requires: Vec::new(),
    };

    walk_program(&mut collector, program);

    log::debug!(
        "{} imports {} module(s)",
        importer.display(),
        collector.requires.len()
    );

    collector.requires
}

struct RequireCollector<'a> {
    directory: &'a Path,
    requires: Vec<Require>,
}

impl<'ast> Visitor<'ast> for RequireCollector<'_> {
    fn visit_node(&mut self, node: &'ast Node) {
        if let NodeKind::Import { name, alias } = &node.kind {
            self.requires.push(Require {
                name: name.clone(),
                alias: *alias,
                location: self
                    .directory
                    .join(format!("{name}.{SOURCE_EXTENSION}")),
                source: node.location.clone(),
            });
        }

        walk_node(self, node)
    }
}
