//! Gate-to-gate connectivity graph and combinational cycle detection.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::gate_type::GateKind;
use crate::ids::{GateId, NetId};
use crate::netlist::Netlist;

/// A directed graph with one node per gate and an edge `a -> b` labelled with
/// the net for every net driven by `a` and read by `b`.
pub struct GateGraph {
    graph: DiGraph<GateId, NetId>,
    nodes: HashMap<GateId, NodeIndex>,
}

impl GateGraph {
    /// Builds the connectivity graph of every gate in the netlist.
    pub fn build(netlist: &Netlist) -> Self {
        Self::build_filtered(netlist, |_| true)
    }

    /// Builds the graph restricted to combinational gates. Sequential
    /// elements break feedback paths, so cycles here are true combinational loops.
    pub fn combinational(netlist: &Netlist) -> Self {
        Self::build_filtered(netlist, |kind| kind == GateKind::Combinational)
    }

    fn build_filtered(netlist: &Netlist, keep: impl Fn(GateKind) -> bool) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for gate in netlist.gates() {
            if keep(netlist.gate_type(gate.gate_type).kind()) {
                nodes.insert(gate.id, graph.add_node(gate.id));
            }
        }
        for net in netlist.nets() {
            let Some(source) = &net.source else { continue };
            let Some(&from) = nodes.get(&source.gate) else {
                continue;
            };
            for dest in &net.destinations {
                if let Some(&to) = nodes.get(&dest.gate) {
                    graph.add_edge(from, to, net.id);
                }
            }
        }
        Self { graph, nodes }
    }

    /// Returns the number of gates in the graph.
    pub fn gate_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns every cycle as a sorted set of gates: strongly connected
    /// components with more than one gate, or a single gate feeding itself.
    pub fn cycles(&self) -> Vec<Vec<GateId>> {
        let mut cycles: Vec<Vec<GateId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut gates: Vec<GateId> = scc.into_iter().map(|n| self.graph[n]).collect();
                gates.sort();
                gates
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Returns the cycles that contain at least one of `gates`.
    pub fn cycles_through(&self, gates: &[GateId]) -> Vec<Vec<GateId>> {
        self.cycles()
            .into_iter()
            .filter(|cycle| gates.iter().any(|g| cycle.binary_search(g).is_ok()))
            .collect()
    }

    /// Returns the nets carried on edges inside `cycle`.
    pub fn cycle_nets(&self, cycle: &[GateId]) -> Vec<NetId> {
        let mut nets = BTreeSet::new();
        for gate in cycle {
            let Some(&node) = self.nodes.get(gate) else {
                continue;
            };
            for edge in self.graph.edges(node) {
                use petgraph::visit::EdgeRef;
                if cycle.binary_search(&self.graph[edge.target()]).is_ok() {
                    nets.insert(*edge.weight());
                }
            }
        }
        nets.into_iter().collect()
    }
}
