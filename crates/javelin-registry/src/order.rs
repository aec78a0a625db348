//! Emission ordering of struct definitions.
//!
//! Embedded-by-value types must be defined before the structs that embed
//! them, so the registry records a `producer -> dependency` edge for
//! every such embedding and replays the graph in dependency order when
//! the definitions are rendered. Cycles cannot deadlock the walk: the
//! post-order traversal marks a node before descending, so a back edge
//! is simply skipped and one member of the cycle comes out first.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsPostOrder, Walker};
use rustc_hash::FxHashMap;

use crate::descriptor::DescriptorId;

/// Records definition-order constraints between registered types.
#[derive(Debug, Default)]
pub struct DependencyOrderer {
    graph: DiGraph<DescriptorId, ()>,
    nodes: FxHashMap<DescriptorId, NodeIndex>,
    /// Registration order, used for everything the graph does not
    /// constrain.
    discovered: Vec<DescriptorId>,
}

impl DependencyOrderer {
    pub fn new() -> Self {
        DependencyOrderer::default()
    }

    /// Notes that `id` exists, without constraints.
    pub fn discover(&mut self, id: DescriptorId) {
        self.discovered.push(id);
    }

    /// Notes that `producer`'s definition embeds `dependency`'s, so the
    /// dependency must be emitted first.
    pub fn require(&mut self, producer: DescriptorId, dependency: DescriptorId) {
        let p = self.node(producer);
        let d = self.node(dependency);
        // post-order visits the edge target first
        if self.graph.find_edge(p, d).is_none() {
            self.graph.add_edge(p, d, ());
        }
    }

    fn node(&mut self, id: DescriptorId) -> NodeIndex {
        match self.nodes.get(&id) {
            Some(&n) => n,
            None => {
                let n = self.graph.add_node(id);
                self.nodes.insert(id, n);
                n
            }
        }
    }

    /// Every discovered descriptor, dependencies before their producers,
    /// unconstrained types in registration order.
    pub fn order(&self) -> Vec<DescriptorId> {
        let mut out = Vec::with_capacity(self.discovered.len());
        let mut seen = vec![false; self.discovered.len().max(1)];
        let mut mark = |id: DescriptorId, out: &mut Vec<DescriptorId>| {
            let slot = id.index();
            if slot >= seen.len() {
                seen.resize(slot + 1, false);
            }
            if !seen[slot] {
                seen[slot] = true;
                out.push(id);
            }
        };

        let mut dfs = DfsPostOrder::empty(&self.graph);
        for start in self.graph.node_indices() {
            dfs.move_to(start);
            for n in (&mut dfs).iter(&self.graph) {
                mark(self.graph[n], &mut out);
            }
        }
        for &id in &self.discovered {
            mark(id, &mut out);
        }
        out
    }
}
