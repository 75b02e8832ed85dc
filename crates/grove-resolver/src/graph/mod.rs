//! Dependency graph of pinned packages using petgraph
//!
//! Built from a completed resolution. Cycles are legal between pinned
//! packages, so they are reported rather than rejected.

use dashmap::DashMap;
use grove_core::ResolvedPackage;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Directed graph of import paths; an edge points from a package to one of
/// its dependencies
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: DashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: DashMap::new(),
        }
    }

    /// Graph of `packages` and the dependency lists they record.
    ///
    /// Dependencies that were not pinned (skipped after a failure) still get
    /// a node so edges are never dropped.
    pub fn from_packages(packages: &[ResolvedPackage]) -> Self {
        let mut graph = Self::new();
        for package in packages {
            graph.add_package(&package.import_path);
        }
        for package in packages {
            for dependency in &package.dependencies {
                graph.add_dependency(&package.import_path, dependency);
            }
        }
        graph
    }

    /// Add a package node, returning the existing one if present
    pub fn add_package(&mut self, import_path: &str) -> NodeIndex {
        if let Some(existing) = self.node_map.get(import_path) {
            return *existing;
        }
        let index = self.graph.add_node(import_path.to_string());
        self.node_map.insert(import_path.to_string(), index);
        index
    }

    /// Add an edge `from -> to`, creating either node as needed
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from = self.add_package(from);
        let to = self.add_package(to);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, import_path: &str) -> bool {
        self.node_map.contains_key(import_path)
    }

    /// Direct dependencies of a package, sorted
    pub fn dependencies_of(&self, import_path: &str) -> Vec<String> {
        let Some(index) = self.node_map.get(import_path).map(|i| *i) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors(index)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        names.sort();
        names
    }

    /// Every dependency cycle, each rotated to start at its smallest path.
    ///
    /// Cycles are listed in sorted order so reports are stable.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .map_or(false, |&n| self.graph.contains_edge(n, n))
            })
            .map(|component| {
                let mut names: Vec<String> = component
                    .into_iter()
                    .filter_map(|n| self.graph.node_weight(n).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Format cycle as "a -> b -> a"
    pub fn format_cycle(cycle: &[String]) -> String {
        match cycle.first() {
            None => "no cycle".to_string(),
            Some(first) => {
                let mut names = cycle.to_vec();
                names.push(first.clone());
                names.join(" -> ")
            },
        }
    }

    /// Get number of packages in the graph
    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get number of dependency edges in the graph
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
