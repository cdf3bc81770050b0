//! Parent/child hierarchy of planned tables

use std::collections::HashMap;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::dot::Dot;
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Direction, Graph};

use super::PlanError;
use crate::models::PARENT_COLUMN;

/// Directed graph with an edge from every parent table to each of its
/// children. Built once by the planner and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ParentGraph {
    graph: Graph<String, &'static str, Directed>,
    nodes: HashMap<String, NodeIndex>,
}

impl ParentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` under `parent`. The parent must already be present.
    pub(crate) fn add_table(&mut self, table: &str, parent: Option<&str>) -> Result<(), PlanError> {
        if self.nodes.contains_key(table) {
            return Err(PlanError::TableCollision {
                table: table.to_string(),
            });
        }

        let parent_node = match parent {
            Some(name) => Some(*self.nodes.get(name).ok_or_else(|| PlanError::UnknownParent {
                table: table.to_string(),
                parent: name.to_string(),
            })?),
            None => None,
        };

        let node = self.graph.add_node(table.to_string());
        self.nodes.insert(table.to_string(), node);
        if let Some(parent_node) = parent_node {
            self.graph.add_edge(parent_node, node, PARENT_COLUMN);
        }
        Ok(())
    }

    pub fn contains(&self, table: &str) -> bool {
        self.nodes.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of `table`, `None` for the root or an unknown table
    pub fn parent(&self, table: &str) -> Option<&str> {
        let node = *self.nodes.get(table)?;
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
            .map(|p| self.graph[p].as_str())
    }

    /// Direct children of `table`, sorted by name
    pub fn children(&self, table: &str) -> Vec<&str> {
        let Some(&node) = self.nodes.get(table) else {
            return Vec::new();
        };
        let mut children: Vec<&str> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|c| self.graph[c].as_str())
            .collect();
        children.sort_unstable();
        children
    }

    /// Table names with every parent ahead of its children
    pub fn creation_order(&self) -> Result<Vec<&str>, PlanError> {
        let order = toposort(&self.graph, None).map_err(|cycle| PlanError::Cycle {
            table: self.graph[cycle.node_id()].clone(),
        })?;
        Ok(order.into_iter().map(|n| self.graph[n].as_str()).collect())
    }

    /// Render the hierarchy as a Graphviz digraph
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.graph))
    }
}

impl fmt::Display for ParentGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.graph.node_indices() {
            let table = &self.graph[node];
            match self.parent(table) {
                Some(parent) => writeln!(f, "{} -> {}", table, parent)?,
                None => writeln!(f, "{}", table)?,
            }
        }
        Ok(())
    }
}
