use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Predecessor must finish before the successor starts.
    Precedence,
    /// The successor's duration ends where the source starts.
    DurationReference,
}

/// Dependency DAG over activity indices: edges point from the activity that
/// must be computed first to the one that depends on it.
pub struct ActivityDag {
    pub graph: DiGraph<usize, EdgeKind>,
    pub nodes: Vec<NodeIndex>,
}

impl ActivityDag {
    pub fn build(predecessors: &[Vec<usize>], references: &[Option<usize>]) -> Self {
        let mut graph: DiGraph<usize, EdgeKind> = DiGraph::new();

        // Add nodes first
        let nodes: Vec<NodeIndex> = (0..predecessors.len())
            .map(|idx| graph.add_node(idx))
            .collect();

        for (idx, preds) in predecessors.iter().enumerate() {
            for &pred in preds {
                graph.add_edge(nodes[pred], nodes[idx], EdgeKind::Precedence);
            }
        }
        for (idx, reference) in references.iter().enumerate() {
            if let Some(target) = reference {
                graph.add_edge(nodes[*target], nodes[idx], EdgeKind::DurationReference);
            }
        }

        Self { graph, nodes }
    }

    /// Activity indices in dependency order, or the index of an activity on a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>, usize> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|node| self.graph[node]).collect())
            .map_err(|cycle| self.graph[cycle.node_id()])
    }
}
