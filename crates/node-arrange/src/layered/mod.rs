mod crossings;
mod cycles;
mod directions;
mod dummies;
mod frames;
mod layers;
mod positions;
mod reroutes;

use crate::graph::Graph;
use crate::{GraphDescription, InvalidGraphError, LayoutEngine, Point, Rect, Settings};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

use crossings::{minimize_crossings, Ordering};
use cycles::break_cycles;
use directions::synthesize;
use dummies::LayeredGraph;
use frames::bounding_boxes;
use layers::assign_ranks;
use reroutes::collect_reroutes;

pub use frames::FRAME_PADDING;

/// Layered (Sugiyama-style) layout of node trees
///
/// Nodes are placed in columns, left to right along the edges, with frames
/// kept together and long edges routed through reroutes.
#[derive(Debug, Clone, Default)]
pub struct NodeArrange {
    settings: Settings,
}

impl NodeArrange {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Layer structure of a graph, reusable while only node sizes change
#[derive(Debug, Clone)]
pub struct Layers<N, F> {
    node_ids: Vec<N>,
    node_index: HashMap<N, usize>,
    frame_ids: Vec<F>,
    graph: Graph,
    layered: LayeredGraph,
    ordering: Ordering,
    ranks: Vec<usize>,
    reversed: Vec<usize>,
}

impl<N, F> Layers<N, F>
where
    N: Eq + Hash,
{
    /// Layer of a node, `None` for unknown ids
    pub fn rank(&self, node: &N) -> Option<usize> {
        self.node_index.get(node).map(|&index| self.ranks[index])
    }

    pub fn layer_count(&self) -> usize {
        self.layered.layer_count
    }

    /// Nodes of each layer in their final order, without dummies
    pub fn layers(&self) -> Vec<Vec<&N>> {
        self.ordering
            .layers
            .iter()
            .map(|layer| {
                layer
                    .iter()
                    .filter_map(|vertex| self.node_ids.get(vertex.index()))
                    .collect()
            })
            .collect()
    }

    /// Number of edge crossings (quality metric)
    pub fn crossings(&self) -> usize {
        self.ordering.crossings
    }

    /// Crossings before ordering
    pub fn initial_crossings(&self) -> usize {
        self.ordering.initial_crossings
    }

    /// Indices of the edges reversed to break cycles, in ascending order
    pub fn reversed_edges(&self) -> &[usize] {
        &self.reversed
    }
}

/// A bend point inserted on an edge spanning several layers
#[derive(Debug, Clone, PartialEq)]
pub struct Reroute<F> {
    /// Index of the edge in the graph description
    pub edge: usize,
    pub position: Point,
    /// Frame the reroute belongs to, `None` at top level
    pub frame: Option<F>,
}

/// Result of a layout
///
/// Positions are the top-left corner of each node, with y growing downward.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout<N, F>
where
    N: Eq + Hash,
    F: Eq + Hash,
{
    pub nodes: HashMap<N, Point>,
    /// Bounding box of every non-empty frame, padding included
    pub frames: HashMap<F, Rect>,
    /// Reroutes grouped by edge, each edge's from its source to its target
    pub reroutes: Vec<Reroute<F>>,
    /// Indices of the edges reversed to break cycles
    pub reversed_edges: Vec<usize>,
}

impl NodeArrange {
    /// Compute layer structure (expensive, cache this)
    ///
    /// Breaks cycles, assigns ranks and orders each layer. Only depends on
    /// the graph structure and frames, not on node sizes.
    ///
    /// # Errors
    /// Returns an error if the description is malformed
    pub fn compute_layers<N, F>(
        &self,
        description: &GraphDescription<N, F>,
    ) -> Result<Layers<N, F>, InvalidGraphError>
    where
        N: Clone + Eq + Hash + Debug,
        F: Clone + Eq + Hash + Debug,
    {
        let mut graph = Graph::from_description(description)?;
        let reversed = break_cycles(&mut graph);
        let ranks = assign_ranks(&graph, self.settings.iterations());
        let layered =
            LayeredGraph::new(&graph, &ranks, self.settings.keep_reroutes_outside_frames());
        let ordering =
            minimize_crossings(&graph, &layered, self.settings.crossing_reduction_sweeps());
        debug!(
            "Ordered {} layers: {} crossings, {} initially",
            layered.layer_count, ordering.crossings, ordering.initial_crossings
        );

        let node_ids: Vec<N> = description.nodes.iter().map(|node| node.id.clone()).collect();
        let node_index = node_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();
        Ok(Layers {
            node_ids,
            node_index,
            frame_ids: description.frames.iter().map(|frame| frame.id.clone()).collect(),
            graph,
            layered,
            ordering,
            ranks,
            reversed,
        })
    }

    /// Compute positions from cached layers (cheap, rerun when sizes change)
    ///
    /// Assigns coordinates in the configured direction, then derives the
    /// frame boxes and the reroutes from them.
    pub fn compute_positions<N, F>(&self, layers: &Layers<N, F>) -> Layout<N, F>
    where
        N: Clone + Eq + Hash,
        F: Clone + Eq + Hash,
    {
        let Layers {
            graph,
            layered,
            ordering,
            ..
        } = layers;
        let add_reroutes = self.settings.add_reroutes();
        let positions = synthesize(graph, layered, ordering, &self.settings);

        let nodes = layers
            .node_ids
            .iter()
            .cloned()
            .zip(positions.iter().copied())
            .collect();
        let frames = layers
            .frame_ids
            .iter()
            .zip(bounding_boxes(graph, layered, &positions, add_reroutes))
            .filter_map(|(id, rect)| Some((id.clone(), rect?)))
            .collect();
        let reroutes = collect_reroutes(graph, layered, &positions, add_reroutes)
            .into_iter()
            .map(|reroute| Reroute {
                edge: reroute.edge,
                position: reroute.position,
                frame: reroute.frame.map(|frame| layers.frame_ids[frame].clone()),
            })
            .collect();

        Layout {
            nodes,
            frames,
            reroutes,
            reversed_edges: layers.reversed.clone(),
        }
    }
}

impl<'a, N, F> LayoutEngine<&'a GraphDescription<N, F>> for NodeArrange
where
    N: Clone + Eq + Hash + Debug,
    F: Clone + Eq + Hash + Debug,
{
    type Output = Layout<N, F>;
    type Error = InvalidGraphError;

    fn layout(&self, graph: &'a GraphDescription<N, F>) -> Result<Layout<N, F>, InvalidGraphError> {
        let layers = self.compute_layers(graph)?;
        Ok(self.compute_positions(&layers))
    }
}
