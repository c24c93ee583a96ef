//! Bipartite max-flow on a petgraph network.
//!
//! Shared by the negative-wait-group and unlock-before-lock analyses:
//! source → every demand (capacity 1), supply → sink (its capacity),
//! demand → supply where the happens-before edge exists. Augmenting
//! paths are found with BFS (Edmonds-Karp); the round count is bounded
//! so pathological inputs terminate as inconclusive instead of spinning.

use std::collections::VecDeque;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use skein_core::constants::MAX_FLOW_ITERATION_FACTOR;

/// Node roles in the flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowNode {
    Source,
    Sink,
    /// A done/unlock, index into the caller's list.
    Demand(usize),
    /// An add/lock, index into the caller's list.
    Supply(usize),
}

/// The iteration bound was hit; the analysis is inconclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOverflow;

/// Result of a completed max-flow run.
#[derive(Debug)]
pub struct FlowOutcome {
    pub max_flow: u64,
    /// Demands on the source side of the min cut (not fully covered).
    pub uncovered_demands: Vec<usize>,
    /// Supplies that cannot reach the sink in the residual graph.
    pub cut_supplies: Vec<usize>,
}

/// Bipartite flow network under construction.
pub struct BipartiteFlow {
    graph: DiGraph<FlowNode, u32>,
    source: NodeIndex,
    sink: NodeIndex,
    demands: Vec<NodeIndex>,
    supplies: Vec<NodeIndex>,
}

impl BipartiteFlow {
    /// A network with `demand_count` unit demands and one supply node
    /// per capacity entry.
    pub fn new(demand_count: usize, supply_capacities: &[u32]) -> Self {
        let mut graph = DiGraph::new();
        let source = graph.add_node(FlowNode::Source);
        let sink = graph.add_node(FlowNode::Sink);
        let demands: Vec<NodeIndex> = (0..demand_count)
            .map(|i| {
                let node = graph.add_node(FlowNode::Demand(i));
                graph.add_edge(source, node, 1);
                node
            })
            .collect();
        let supplies: Vec<NodeIndex> = supply_capacities
            .iter()
            .enumerate()
            .map(|(i, &capacity)| {
                let node = graph.add_node(FlowNode::Supply(i));
                graph.add_edge(node, sink, capacity);
                node
            })
            .collect();
        Self {
            graph,
            source,
            sink,
            demands,
            supplies,
        }
    }

    /// Add the happens-before edge demand → supply (capacity 1).
    pub fn connect(&mut self, demand: usize, supply: usize) {
        self.graph
            .add_edge(self.demands[demand], self.supplies[supply], 1);
    }

    /// Run Edmonds-Karp. Errors when the bounded round count is hit.
    pub fn run(&mut self) -> Result<FlowOutcome, FlowOverflow> {
        let edge_count = self.graph.edge_count();
        let bound = MAX_FLOW_ITERATION_FACTOR
            .saturating_mul((edge_count as u64).saturating_pow(3))
            .max(1);

        let mut flow = vec![0u32; edge_count];
        let mut total = 0u64;
        let mut rounds = 0u64;

        loop {
            rounds += 1;
            if rounds > bound {
                return Err(FlowOverflow);
            }
            let Some(path) = self.augmenting_path(&flow) else {
                break;
            };
            let bottleneck = path
                .iter()
                .map(|&(edge, forward)| {
                    let capacity = self.graph[edge];
                    if forward {
                        capacity - flow[edge.index()]
                    } else {
                        flow[edge.index()]
                    }
                })
                .min()
                .expect("augmenting path is non-empty");
            for &(edge, forward) in &path {
                if forward {
                    flow[edge.index()] += bottleneck;
                } else {
                    flow[edge.index()] -= bottleneck;
                }
            }
            total += bottleneck as u64;
        }

        let source_side = self.residual_reachable_from(&flow, self.source);
        let sink_side = self.residual_reachable_from(&flow, self.sink);
        let uncovered_demands = self
            .demands
            .iter()
            .enumerate()
            .filter(|(_, node)| source_side[node.index()])
            .map(|(i, _)| i)
            .collect();
        let cut_supplies = self
            .supplies
            .iter()
            .enumerate()
            .filter(|(_, node)| !sink_side[node.index()])
            .map(|(i, _)| i)
            .collect();

        Ok(FlowOutcome {
            max_flow: total,
            uncovered_demands,
            cut_supplies,
        })
    }

    /// BFS over the residual graph, returning the edge path source → sink.
    fn augmenting_path(
        &self,
        flow: &[u32],
    ) -> Option<Vec<(petgraph::graph::EdgeIndex, bool)>> {
        let mut parent: Vec<Option<(NodeIndex, petgraph::graph::EdgeIndex, bool)>> =
            vec![None; self.graph.node_count()];
        let mut queue = VecDeque::new();
        queue.push_back(self.source);
        parent[self.source.index()] = Some((self.source, petgraph::graph::EdgeIndex::end(), true));

        while let Some(node) = queue.pop_front() {
            if node == self.sink {
                break;
            }
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                if parent[target.index()].is_none() && flow[edge.id().index()] < *edge.weight() {
                    parent[target.index()] = Some((node, edge.id(), true));
                    queue.push_back(target);
                }
            }
            for edge in self.graph.edges_directed(node, Direction::Incoming) {
                let origin = edge.source();
                if parent[origin.index()].is_none() && flow[edge.id().index()] > 0 {
                    parent[origin.index()] = Some((node, edge.id(), false));
                    queue.push_back(origin);
                }
            }
        }

        parent[self.sink.index()]?;
        let mut path = Vec::new();
        let mut node = self.sink;
        while node != self.source {
            let (prev, edge, forward) = parent[node.index()].expect("path is connected");
            path.push((edge, forward));
            node = prev;
        }
        path.reverse();
        Some(path)
    }

    /// Nodes reachable from `start` in the residual graph: an edge with
    /// remaining capacity is walked forwards, an edge carrying flow is
    /// walked backwards.
    fn residual_reachable_from(&self, flow: &[u32], start: NodeIndex) -> Vec<bool> {
        let mut seen = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::new();
        seen[start.index()] = true;
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let target = edge.target();
                if !seen[target.index()] && flow[edge.id().index()] < *edge.weight() {
                    seen[target.index()] = true;
                    queue.push_back(target);
                }
            }
            for edge in self.graph.edges_directed(node, Direction::Incoming) {
                let origin = edge.source();
                if !seen[origin.index()] && flow[edge.id().index()] > 0 {
                    seen[origin.index()] = true;
                    queue.push_back(origin);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_coverage() {
        // Two demands, one supply of capacity 2, both connected.
        let mut flow = BipartiteFlow::new(2, &[2]);
        flow.connect(0, 0);
        flow.connect(1, 0);
        let outcome = flow.run().unwrap();
        assert_eq!(outcome.max_flow, 2);
        assert!(outcome.uncovered_demands.is_empty());
    }

    #[test]
    fn test_undercapacity_supply() {
        // Two demands share one unit of supply: coverage can be rerouted
        // between them, so both sit on the source side of the cut.
        let mut flow = BipartiteFlow::new(2, &[1]);
        flow.connect(0, 0);
        flow.connect(1, 0);
        let outcome = flow.run().unwrap();
        assert_eq!(outcome.max_flow, 1);
        assert_eq!(outcome.uncovered_demands, vec![0, 1]);
    }

    #[test]
    fn test_unconnected_demand() {
        let mut flow = BipartiteFlow::new(2, &[2]);
        flow.connect(0, 0);
        let outcome = flow.run().unwrap();
        assert_eq!(outcome.max_flow, 1);
        assert_eq!(outcome.uncovered_demands, vec![1]);
    }

    #[test]
    fn test_flow_cancellation() {
        // Demand 0 connects to both supplies, demand 1 only to supply 0.
        // A greedy first path through (0, supply 0) must be rerouted.
        let mut flow = BipartiteFlow::new(2, &[1, 1]);
        flow.connect(0, 0);
        flow.connect(0, 1);
        flow.connect(1, 0);
        let outcome = flow.run().unwrap();
        assert_eq!(outcome.max_flow, 2);
        assert!(outcome.uncovered_demands.is_empty());
    }
}
