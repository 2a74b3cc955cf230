//! DAG building and topological ordering over table references

use crate::error::{LeaError, LeaResult};
use crate::script::Script;
use crate::table_ref::TableRef;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A directed acyclic graph of script dependencies.
///
/// Edges point from a dependency to its dependents, so a topological sort
/// yields dependencies first. Each node stores its script.
#[derive(Debug)]
pub struct ScriptDag {
    graph: DiGraph<TableRef, ()>,
    node_map: HashMap<TableRef, NodeIndex>,
    scripts: HashMap<TableRef, Script>,
}

impl ScriptDag {
    /// Build the DAG from parsed scripts.
    ///
    /// Dependency edges are only materialised when the referenced table is
    /// itself produced by a script; references to pre-existing warehouse
    /// tables are implicit roots and create no edges. Rejects duplicate
    /// table references and cycles.
    pub fn build(scripts: Vec<Script>) -> LeaResult<Self> {
        let mut dag = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            scripts: HashMap::new(),
        };

        for script in &scripts {
            if dag.scripts.contains_key(&script.table_ref) {
                return Err(LeaError::DuplicateScript {
                    table_ref: script.table_ref.to_string(),
                });
            }
            dag.add_node(script.table_ref.clone());
            dag.scripts.insert(script.table_ref.clone(), script.clone());
        }

        for script in &scripts {
            for dependency in &script.dependencies {
                if dag.scripts.contains_key(dependency) {
                    dag.add_edge(dependency, &script.table_ref);
                }
            }
        }

        dag.validate()?;
        Ok(dag)
    }

    fn add_node(&mut self, table_ref: TableRef) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&table_ref) {
            idx
        } else {
            let idx = self.graph.add_node(table_ref.clone());
            self.node_map.insert(table_ref, idx);
            idx
        }
    }

    fn add_edge(&mut self, from: &TableRef, to: &TableRef) {
        let from_idx = self.node_map[from];
        let to_idx = self.node_map[to];
        self.graph.add_edge(from_idx, to_idx, ());
    }

    /// Validate the graph has no cycles.
    pub fn validate(&self) -> LeaResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(LeaError::Cycle {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Walk forward from a node in the cycle for error reporting.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());
            if target == start || visited.contains(&target) {
                break;
            }
            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Table references in topological order (dependencies first).
    pub fn topological_order(&self) -> LeaResult<Vec<TableRef>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(LeaError::Cycle {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Direct dependencies of a node.
    pub fn dependencies(&self, table_ref: &TableRef) -> Vec<TableRef> {
        match self.node_map.get(table_ref) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, petgraph::Direction::Incoming)
                .map(|e| self.graph[e.source()].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Direct dependents of a node.
    pub fn dependents(&self, table_ref: &TableRef) -> Vec<TableRef> {
        match self.node_map.get(table_ref) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, petgraph::Direction::Outgoing)
                .map(|e| self.graph[e.target()].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// All transitive dependencies of a node.
    pub fn ancestors(&self, table_ref: &TableRef) -> BTreeSet<TableRef> {
        let mut result = BTreeSet::new();
        if let Some(&idx) = self.node_map.get(table_ref) {
            self.collect(idx, petgraph::Direction::Incoming, &mut result);
        }
        result
    }

    /// All transitive dependents of a node.
    pub fn descendants(&self, table_ref: &TableRef) -> BTreeSet<TableRef> {
        let mut result = BTreeSet::new();
        if let Some(&idx) = self.node_map.get(table_ref) {
            self.collect(idx, petgraph::Direction::Outgoing, &mut result);
        }
        result
    }

    fn collect(
        &self,
        idx: NodeIndex,
        direction: petgraph::Direction,
        result: &mut BTreeSet<TableRef>,
    ) {
        for edge in self.graph.edges_directed(idx, direction) {
            let next = match direction {
                petgraph::Direction::Incoming => edge.source(),
                petgraph::Direction::Outgoing => edge.target(),
            };
            if result.insert(self.graph[next].clone()) {
                self.collect(next, direction, result);
            }
        }
    }

    /// All table references in the graph.
    pub fn table_refs(&self) -> impl Iterator<Item = &TableRef> {
        self.scripts.keys()
    }

    /// Look up the script stored at a node.
    pub fn script(&self, table_ref: &TableRef) -> Option<&Script> {
        self.scripts.get(table_ref)
    }

    /// Whether a node exists in the graph.
    pub fn contains(&self, table_ref: &TableRef) -> bool {
        self.node_map.contains_key(table_ref)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
