//! Lineage graph: tables, jobs and functions connected by reads, writes and calls

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt;

use crate::collector::LineageResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineageNode {
    Job(String),
    Table(String),
    Function(String),
}

impl LineageNode {
    fn id(&self) -> String {
        match self {
            LineageNode::Job(name) => format!("job:{}", name),
            LineageNode::Table(name) => format!("table:{}", name),
            LineageNode::Function(name) => format!("function:{}", name),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            LineageNode::Job(_) => "box",
            LineageNode::Table(_) => "cylinder",
            LineageNode::Function(_) => "ellipse",
        }
    }
}

impl fmt::Display for LineageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineageNode::Job(name) | LineageNode::Table(name) | LineageNode::Function(name) => {
                write!(f, "{}", name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageEdge {
    /// table -> job
    Reads,
    /// job -> table
    Writes,
    /// job -> function
    Calls,
}

/// Directed lineage graph built from a [`LineageResult`]
#[derive(Debug, Default)]
pub struct LineageGraph {
    graph: DiGraph<LineageNode, LineageEdge>,
    node_map: HashMap<LineageNode, NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_result(result: &LineageResult) -> Self {
        let mut graph = Self::new();
        for (job, tables) in result.input_tables() {
            let job_node = LineageNode::Job(job.to_string());
            for table in tables {
                graph.add_edge(LineageNode::Table(table.clone()), job_node.clone(), LineageEdge::Reads);
            }
        }
        for (job, tables) in result.output_tables() {
            let job_node = LineageNode::Job(job.to_string());
            for table in tables {
                graph.add_edge(job_node.clone(), LineageNode::Table(table.clone()), LineageEdge::Writes);
            }
        }
        for (job, functions) in result.functions() {
            let job_node = LineageNode::Job(job.to_string());
            for function in functions {
                graph.add_edge(
                    job_node.clone(),
                    LineageNode::Function(function.clone()),
                    LineageEdge::Calls,
                );
            }
        }
        graph
    }

    fn add_node(&mut self, node: LineageNode) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node, idx);
        idx
    }

    pub fn add_edge(&mut self, from: LineageNode, to: LineageNode, edge: LineageEdge) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, edge);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Jobs writing `table`, i.e. its upstream jobs
    pub fn writers_of(&self, table: &str) -> Vec<String> {
        self.neighbors(&LineageNode::Table(table.to_string()), Direction::Incoming)
    }

    /// Jobs reading `table`, i.e. its downstream jobs
    pub fn readers_of(&self, table: &str) -> Vec<String> {
        self.neighbors(&LineageNode::Table(table.to_string()), Direction::Outgoing)
    }

    fn neighbors(&self, node: &LineageNode, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.node_map.get(node) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].to_string())
            .collect();
        names.sort();
        names
    }

    /// Graphviz rendering
    pub fn to_dot(&self) -> String {
        let mut result = String::from("digraph lineage {\n");
        result.push_str("  rankdir=LR;\n");

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            result.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}];\n",
                escape(&node.id()),
                escape(&node.to_string()),
                node.shape()
            ));
        }

        for edge in self.graph.edge_references() {
            let style = match edge.weight() {
                LineageEdge::Reads | LineageEdge::Writes => "solid",
                LineageEdge::Calls => "dashed",
            };
            result.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}];\n",
                escape(&self.graph[edge.source()].id()),
                escape(&self.graph[edge.target()].id()),
                style
            ));
        }

        result.push_str("}\n");
        result
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
