//! Dependency DAG over the warehouse contract
//!
//! Edges run from a referenced table to the table holding the foreign key,
//! so a topological order loads every table after the ones it references.

use crate::error::{CoreError, CoreResult};
use crate::schema::WarehouseContract;
use crate::table_name::TableName;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A directed acyclic graph of table dependencies
#[derive(Debug)]
pub struct TableDag {
    graph: DiGraph<TableName, ()>,
    node_map: HashMap<TableName, NodeIndex>,
}

impl TableDag {
    /// Build the DAG from the contract's foreign keys and reject cycles
    pub fn build(contract: &WarehouseContract) -> CoreResult<Self> {
        let mut dag = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        };

        for table in contract.tables() {
            dag.add_table(&table.name);
        }
        for table in contract.tables() {
            for dep in table.dependencies() {
                // Self-references carry no ordering constraint
                if dep != &table.name {
                    let from = dag.add_table(dep);
                    let to = dag.add_table(&table.name);
                    dag.graph.update_edge(from, to, ());
                }
            }
        }

        dag.validate()?;
        Ok(dag)
    }

    fn add_table(&mut self, name: &TableName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name.clone(), idx);
        idx
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path starting from a node for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());
            if target == start || !visited.insert(target) {
                break;
            }
            current = target;
        }

        path.join(" -> ")
    }

    /// Deterministic topological order.
    ///
    /// Among tables that are ready at the same time, the one with the lower
    /// kind rank (time, dimension, bridge, fact) goes first, then the one
    /// declared first in the contract.
    pub fn load_order(&self, contract: &WarehouseContract) -> CoreResult<Vec<TableName>> {
        self.validate()?;

        let priority = |idx: NodeIndex| {
            let name = &self.graph[idx];
            let rank = contract
                .table(name.as_str())
                .map(|t| t.kind.rank())
                .unwrap_or(u8::MAX);
            (rank, contract.declaration_index(name.as_str()), idx.index())
        };

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.edges_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(u8, usize, usize)>> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&idx, _)| Reverse(priority(idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, _, raw))) = ready.pop() {
            let idx = NodeIndex::new(raw);
            order.push(self.graph[idx].clone());
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                if let Some(d) = in_degree.get_mut(&target) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(priority(target)));
                    }
                }
            }
        }

        Ok(order)
    }

    /// Tables the given table references directly
    pub fn dependencies(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, Direction::Incoming)
    }

    /// Tables referencing the given table directly
    pub fn dependents(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, Direction::Outgoing)
    }

    fn neighbors(&self, table: &str, direction: Direction) -> Vec<TableName> {
        let Some(&idx) = self.node_map.get(table) else {
            return Vec::new();
        };
        let mut names: Vec<TableName> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Incoming => self.graph[e.source()].clone(),
                Direction::Outgoing => self.graph[e.target()].clone(),
            })
            .collect();
        names.sort();
        names
    }

    pub fn contains(&self, table: &str) -> bool {
        self.node_map.contains_key(table)
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
