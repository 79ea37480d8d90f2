use crate::graph::{EdgeIx, FrameIx, Graph, NodeIx, Port};
use crate::Vec2;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VertexKind {
    Node(NodeIx),
    /// Placeholder on an edge spanning several layers
    Dummy { edge: EdgeIx },
}

/// A node or dummy node of the layered graph
#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    pub kind: VertexKind,
    pub layer: usize,
    pub size: Vec2,
    /// Innermost frame the vertex is laid out in
    pub scope: Option<FrameIx>,
    pub stackable: bool,
}

impl Vertex {
    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, VertexKind::Dummy { .. })
    }
}

/// Unit-length piece of an edge, between two consecutive layers
///
/// Ports are `None` on the dummy side.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub edge: EdgeIx,
    pub tail: Option<Port>,
    pub head: Option<Port>,
}

/// Graph where every edge joins two consecutive layers
///
/// Node `i` of the graph model is vertex `i`, dummies come after.
#[derive(Debug, Clone)]
pub(crate) struct LayeredGraph {
    pub dag: DiGraph<Vertex, Segment>,
    /// Dummies of each edge, from its source to its target
    pub chains: Vec<Vec<NodeIndex>>,
    pub layer_count: usize,
}

impl LayeredGraph {
    /// Split every edge spanning more than one layer with one dummy per
    /// intermediate layer
    ///
    /// A dummy belongs to the innermost frame containing both ends of its
    /// edge. Unless `keep_outside_frames` is set, it may instead belong to a
    /// frame of either end whose layer span covers the dummy's layer, which
    /// keeps the routed edge inside that frame.
    pub fn new(graph: &Graph, ranks: &[usize], keep_outside_frames: bool) -> Self {
        let mut dag = DiGraph::with_capacity(graph.nodes.len(), graph.edges.len());
        for (index, node) in graph.nodes.iter().enumerate() {
            dag.add_node(Vertex {
                kind: VertexKind::Node(index),
                layer: ranks[index],
                size: node.size,
                scope: node.frame,
                stackable: node.stackable,
            });
        }

        let spans: Vec<Option<(usize, usize)>> = (0..graph.frames.len())
            .map(|frame| {
                let nodes = graph.nodes_within(frame);
                let min = nodes.iter().map(|&node| ranks[node]).min()?;
                let max = nodes.iter().map(|&node| ranks[node]).max()?;
                Some((min, max))
            })
            .collect();

        let mut chains = Vec::with_capacity(graph.edges.len());
        for (index, edge) in graph.edges.iter().enumerate() {
            let (source, target) = (edge.source.node, edge.target.node);
            let common = graph.lowest_common_frame(source, target);
            let scope_at = |layer: usize| {
                if keep_outside_frames {
                    return common;
                }
                let covers = |frame: &FrameIx| {
                    spans[*frame].is_some_and(|(min, max)| (min..=max).contains(&layer))
                };
                let below_common = |end: NodeIx| {
                    graph
                        .ancestors(graph.nodes[end].frame)
                        .take_while(move |&frame| Some(frame) != common)
                };
                below_common(source)
                    .find(covers)
                    .or_else(|| below_common(target).find(covers))
                    .or(common)
            };

            let mut chain = Vec::new();
            let mut previous = NodeIndex::new(source);
            let mut tail = Some(edge.source.port);
            for layer in ranks[source] + 1..ranks[target] {
                let dummy = dag.add_node(Vertex {
                    kind: VertexKind::Dummy { edge: index },
                    layer,
                    size: Vec2::zero(),
                    scope: scope_at(layer),
                    stackable: false,
                });
                dag.add_edge(
                    previous,
                    dummy,
                    Segment {
                        edge: index,
                        tail,
                        head: None,
                    },
                );
                chain.push(dummy);
                previous = dummy;
                tail = None;
            }
            dag.add_edge(
                previous,
                NodeIndex::new(target),
                Segment {
                    edge: index,
                    tail,
                    head: Some(edge.target.port),
                },
            );
            chains.push(chain);
        }

        let layer_count = ranks.iter().map(|&rank| rank + 1).max().unwrap_or(0);
        debug!(
            "{} layers, {} dummy nodes",
            layer_count,
            dag.node_count() - graph.nodes.len()
        );

        Self {
            dag,
            chains,
            layer_count,
        }
    }

    /// Vertices grouped by layer, in index order
    pub fn initial_layers(&self) -> Vec<Vec<NodeIndex>> {
        let mut layers = vec![Vec::new(); self.layer_count];
        for vertex in self.dag.node_indices() {
            layers[self.dag[vertex].layer].push(vertex);
        }
        layers
    }

    /// Neighbors in the adjacent layer with the connecting segment, ordered
    /// by edge declaration
    pub fn neighbors(&self, vertex: NodeIndex, direction: Direction) -> Vec<(NodeIndex, Segment)> {
        let mut neighbors: Vec<_> = self
            .dag
            .edges_directed(vertex, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (other, *edge.weight())
            })
            .collect();
        neighbors.sort_by_key(|(other, segment)| (segment.edge, *other));
        neighbors
    }

    /// Offset of a segment end from the top of its vertex, 0 on dummies
    pub fn socket_offset(&self, graph: &Graph, vertex: NodeIndex, port: Option<Port>) -> f32 {
        match (self.dag[vertex].kind, port) {
            (VertexKind::Node(node), Some(port)) => graph.nodes[node].socket_offset(port),
            _ => 0.0,
        }
    }

    /// Socket row of a segment end, used to order segments sharing a vertex
    ///
    /// `facing` is the direction the segment runs from the vertex. Outputs are
    /// ranked among the segments leaving a node, inputs among those entering
    /// it. A reversed edge attaches through a socket on the other side, which
    /// gets row 0.
    pub fn socket_row(&self, vertex: NodeIndex, port: Option<Port>, facing: Direction) -> usize {
        match (self.dag[vertex].kind, port, facing) {
            (VertexKind::Node(_), Some(Port::Output(index)), Direction::Outgoing) => index,
            (VertexKind::Node(_), Some(Port::Input(index)), Direction::Incoming) => index,
            _ => 0,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.dag.node_count()
    }
}
