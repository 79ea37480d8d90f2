use super::crossings::Ordering;
use super::dummies::LayeredGraph;
use super::frames::separate_frames;
use crate::graph::Graph;
use crate::{Direction, Point, Settings, SocketAlignment};
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction as EdgeDirection;
use std::collections::HashSet;
use tracing::trace;

/// Horizontal extent of each layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Column {
    pub start: f32,
    pub end: f32,
}

/// Assign coordinates to every vertex for one fixed direction
///
/// Layers become columns; inside a column, vertices are placed by a
/// Brandes-Köpf alignment in the given direction, then frames are pushed
/// apart. Coordinates are shifted so the smallest x and y are 0.
pub(crate) fn assign_coordinates(
    graph: &Graph,
    layered: &LayeredGraph,
    ordering: &Ordering,
    settings: &Settings,
    direction: Direction,
) -> Vec<Point> {
    let columns = columns(layered, &ordering.layers, settings.horizontal_spacing());
    let ys = vertical_positions(graph, layered, &ordering.layers, settings, direction);

    let mut positions: Vec<Point> = layered
        .dag
        .node_indices()
        .map(|vertex| {
            let data = &layered.dag[vertex];
            let column = columns[data.layer];
            let x = if direction.is_right() {
                column.end - data.size.x
            } else {
                column.start
            };
            Point::new(x, ys[vertex.index()])
        })
        .collect();

    separate_frames(graph, layered, ordering, settings, &columns, &mut positions);
    normalize(&mut positions);

    trace!("Coordinates for {direction:?}: {positions:?}");
    positions
}

/// Place layers side by side, each as wide as its widest vertex
pub(crate) fn columns(
    layered: &LayeredGraph,
    layers: &[Vec<NodeIndex>],
    horizontal_spacing: f32,
) -> Vec<Column> {
    let mut x = 0.0;
    layers
        .iter()
        .map(|layer| {
            let width = layer
                .iter()
                .map(|&vertex| layered.dag[vertex].size.x)
                .fold(0.0, f32::max);
            let column = Column {
                start: x,
                end: x + width,
            };
            x += width + horizontal_spacing;
            column
        })
        .collect()
}

/// Vertical gap required below `upper` when `lower` follows it in a layer
pub(crate) fn vertical_gap(
    layered: &LayeredGraph,
    settings: &Settings,
    upper: NodeIndex,
    lower: NodeIndex,
) -> f32 {
    let stacked = settings.stack_collapsed()
        && layered.dag[upper].stackable
        && layered.dag[lower].stackable;
    if stacked {
        settings.vertical_spacing() * settings.stack_margin_y_factor()
    } else {
        settings.vertical_spacing()
    }
}

/// The layered graph seen from one direction
///
/// Layers are visited in traversal order and each layer is read top-down in
/// the direction's compaction order, so a single alignment routine covers
/// the four directions.
struct View {
    layers: Vec<Vec<NodeIndex>>,
    position: Vec<usize>,
    neighbors: EdgeDirection,
    flipped: bool,
}

impl View {
    fn new(layers: &[Vec<NodeIndex>], vertex_count: usize, direction: Direction) -> Self {
        let mut layers = layers.to_vec();
        if direction.is_right() {
            layers.reverse();
        }
        if direction.is_up() {
            for layer in &mut layers {
                layer.reverse();
            }
        }

        let mut position = vec![0; vertex_count];
        for layer in &layers {
            for (index, &vertex) in layer.iter().enumerate() {
                position[vertex.index()] = index;
            }
        }

        Self {
            layers,
            position,
            neighbors: if direction.is_right() {
                EdgeDirection::Outgoing
            } else {
                EdgeDirection::Incoming
            },
            flipped: direction.is_up(),
        }
    }
}

/// Brandes-Köpf vertical alignment and compaction for one direction
///
/// Vertices aligned with the median neighbor of the previous layer form
/// blocks sharing one vertical position, up to a per-vertex shift that lines
/// up connected sockets. Blocks are then packed as tightly as the vertical
/// spacing allows.
fn vertical_positions(
    graph: &Graph,
    layered: &LayeredGraph,
    layers: &[Vec<NodeIndex>],
    settings: &Settings,
    direction: Direction,
) -> Vec<f32> {
    let vertex_count = layered.vertex_count();
    let view = View::new(layers, vertex_count, direction);
    let conflicts = mark_conflicts(layered, layers);

    let height = |vertex: NodeIndex| layered.dag[vertex].size.y;
    // Offset of a segment end from the top of its vertex, as seen in the view
    let offset = |vertex: NodeIndex, port| {
        let offset = layered.socket_offset(graph, vertex, port);
        if view.flipped {
            height(vertex) - offset
        } else {
            offset
        }
    };

    let mut root: Vec<NodeIndex> = layered.dag.node_indices().collect();
    let mut align = root.clone();
    let mut shift = vec![0.0f32; vertex_count];

    for layer in view.layers.iter().skip(1) {
        let mut last_aligned: Option<usize> = None;
        for &vertex in layer {
            let mut neighbors = layered.neighbors(vertex, view.neighbors);
            if neighbors.is_empty() {
                continue;
            }
            neighbors.sort_by_key(|(neighbor, _)| view.position[neighbor.index()]);

            let count = neighbors.len();
            let mut medians = vec![(count - 1) / 2];
            if count % 2 == 0 {
                medians.push(count / 2);
            }

            for median in medians {
                if align[vertex.index()] != vertex {
                    break;
                }
                let (neighbor, segment) = neighbors[median];
                let segment_ends = match view.neighbors {
                    EdgeDirection::Incoming => (neighbor, vertex),
                    EdgeDirection::Outgoing => (vertex, neighbor),
                };
                if conflicts.contains(&segment_ends) {
                    continue;
                }
                let neighbor_position = view.position[neighbor.index()];
                if last_aligned.is_some_and(|last| last >= neighbor_position) {
                    continue;
                }

                align[neighbor.index()] = vertex;
                root[vertex.index()] = root[neighbor.index()];
                align[vertex.index()] = root[vertex.index()];
                last_aligned = Some(neighbor_position);

                let (neighbor_port, vertex_port) = match view.neighbors {
                    EdgeDirection::Incoming => (segment.tail, segment.head),
                    EdgeDirection::Outgoing => (segment.head, segment.tail),
                };
                let socket_shift = offset(neighbor, neighbor_port) - offset(vertex, vertex_port);
                let use_sockets = match settings.socket_alignment() {
                    SocketAlignment::None => false,
                    SocketAlignment::Full => true,
                    SocketAlignment::Moderate => {
                        let (a, b) = (height(neighbor), height(vertex));
                        a.min(b) <= a.max(b) * 0.5
                    }
                };
                shift[vertex.index()] = shift[neighbor.index()]
                    + if use_sockets { socket_shift } else { 0.0 };
            }
        }
    }

    // Separation constraints between the blocks of consecutive vertices
    let mut blocks = DiGraphMap::<NodeIndex, f32>::new();
    for vertex in layered.dag.node_indices() {
        blocks.add_node(root[vertex.index()]);
    }
    for layer in &view.layers {
        for pair in layer.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            let separation = shift[upper.index()] + height(upper)
                + vertical_gap(layered, settings, upper, lower)
                - shift[lower.index()];
            let (from, to) = (root[upper.index()], root[lower.index()]);
            match blocks.edge_weight_mut(from, to) {
                Some(weight) => *weight = weight.max(separation),
                None => {
                    blocks.add_edge(from, to, separation);
                }
            }
        }
    }

    let order = toposort(&blocks, None)
        .unwrap_or_else(|cycle| panic!("block graph has a cycle at {:?}", cycle.node_id()));
    // Longest path from the topmost blocks, which sit at 0
    let mut block_y = vec![0.0f32; vertex_count];
    for &block in &order {
        let y = block_y[block.index()];
        for (_, below, &separation) in blocks.edges(block) {
            block_y[below.index()] = block_y[below.index()].max(y + separation);
        }
    }

    layered
        .dag
        .node_indices()
        .map(|vertex| {
            let y = block_y[root[vertex.index()].index()] + shift[vertex.index()];
            if view.flipped {
                -y - height(vertex)
            } else {
                y
            }
        })
        .collect()
}

/// Mark the segments crossing an inner segment (between two dummies)
///
/// Those segments are never used for alignment, which keeps long edges
/// straight.
fn mark_conflicts(
    layered: &LayeredGraph,
    layers: &[Vec<NodeIndex>],
) -> HashSet<(NodeIndex, NodeIndex)> {
    let mut position = vec![0; layered.vertex_count()];
    for layer in layers {
        for (index, &vertex) in layer.iter().enumerate() {
            position[vertex.index()] = index;
        }
    }

    let mut marked = HashSet::new();
    for pair in layers.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        if upper.is_empty() {
            continue;
        }

        let mut k0 = 0;
        let mut scanned = 0;
        for (index, &vertex) in lower.iter().enumerate() {
            let inner = if layered.dag[vertex].is_dummy() {
                layered
                    .neighbors(vertex, EdgeDirection::Incoming)
                    .into_iter()
                    .map(|(neighbor, _)| neighbor)
                    .find(|&neighbor| layered.dag[neighbor].is_dummy())
            } else {
                None
            };
            if index + 1 != lower.len() && inner.is_none() {
                continue;
            }

            let k1 = inner.map_or(upper.len() - 1, |neighbor| position[neighbor.index()]);
            while scanned <= index {
                let target = lower[scanned];
                for (source, _) in layered.neighbors(target, EdgeDirection::Incoming) {
                    let both_dummies =
                        layered.dag[source].is_dummy() && layered.dag[target].is_dummy();
                    let outside = position[source.index()] < k0 || position[source.index()] > k1;
                    if outside && !both_dummies {
                        marked.insert((source, target));
                    }
                }
                scanned += 1;
            }
            k0 = k1;
        }
    }
    marked
}

/// Translate all points so the smallest x and y are 0
fn normalize(positions: &mut [Point]) {
    let min_x = positions.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let min_y = positions.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    if !min_x.is_finite() || !min_y.is_finite() {
        return;
    }
    for point in positions.iter_mut() {
        *point = point.translate(-min_x, -min_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layered::crossings::minimize_crossings;
    use crate::layered::layers::assign_ranks;
    use crate::{GraphDescription, NodeRecord, Vec2};
    use test_log::test;

    type Description = GraphDescription<&'static str, &'static str>;

    fn coordinates(description: &Description, settings: &Settings, direction: Direction) -> Vec<Point> {
        let graph = Graph::from_description(description).unwrap();
        let ranks = assign_ranks(&graph, settings.iterations());
        let layered = LayeredGraph::new(&graph, &ranks, true);
        let ordering = minimize_crossings(&graph, &layered, settings.crossing_reduction_sweeps());
        assign_coordinates(&graph, &layered, &ordering, settings, direction)
    }

    fn settings(alignment: SocketAlignment) -> Settings {
        Settings::builder()
            .socket_alignment(alignment)
            .build()
            .unwrap()
    }

    #[test]
    fn chain_is_flat() {
        let mut description = Description::new();
        for id in ["a", "b", "c", "d", "e"] {
            description = description.node(NodeRecord::new(id, Vec2::new(140.0, 100.0)));
        }
        for pair in ["a", "b", "c", "d", "e"].windows(2) {
            description = description.edge(pair[0], 0, pair[1], 0);
        }

        for direction in Direction::FIXED {
            let points = coordinates(&description, &settings(SocketAlignment::None), direction);
            for (index, point) in points.iter().enumerate() {
                assert_eq!(point.y, 0.0);
                assert_eq!(point.x, index as f32 * 190.0);
            }
        }
    }

    #[test]
    fn diamond_aligns_with_the_first_median() {
        let description = Description::new()
            .node(NodeRecord::new("a", Vec2::new(100.0, 60.0)))
            .node(NodeRecord::new("b", Vec2::new(100.0, 60.0)))
            .node(NodeRecord::new("c", Vec2::new(100.0, 60.0)))
            .node(NodeRecord::new("d", Vec2::new(100.0, 60.0)))
            .edge("a", 0, "b", 0)
            .edge("a", 0, "c", 0)
            .edge("b", 0, "d", 0)
            .edge("c", 0, "d", 0);
        let settings = settings(SocketAlignment::None);

        let down = coordinates(&description, &settings, Direction::LeftDown);
        let ys: Vec<_> = down.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![0.0, 0.0, 85.0, 0.0]);

        let up = coordinates(&description, &settings, Direction::LeftUp);
        let ys: Vec<_> = up.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![85.0, 0.0, 85.0, 85.0]);
    }

    #[test]
    fn full_socket_alignment_lines_up_sockets() {
        // "b" takes input 1 from "a", sockets should share a height
        let description = Description::new()
            .node(NodeRecord::new("a", Vec2::new(100.0, 100.0)).sockets(0, 1))
            .node(NodeRecord::new("b", Vec2::new(100.0, 200.0)).sockets(3, 1))
            .edge("a", 0, "b", 1);
        let settings = settings(SocketAlignment::Full);
        let graph = Graph::from_description(&description).unwrap();

        for direction in Direction::FIXED {
            let points = coordinates(&description, &settings, direction);
            let a_socket = points[0].y + graph.nodes[0].socket_offset(crate::graph::Port::Output(0));
            let b_socket = points[1].y + graph.nodes[1].socket_offset(crate::graph::Port::Input(1));
            assert!((a_socket - b_socket).abs() < 1e-4, "{direction:?}: {points:?}");
        }
    }

    #[test]
    fn moderate_alignment_keeps_similar_nodes_top_aligned() {
        let description = Description::new()
            .node(NodeRecord::new("a", Vec2::new(100.0, 150.0)).sockets(0, 1))
            .node(NodeRecord::new("b", Vec2::new(100.0, 200.0)).sockets(3, 1))
            .edge("a", 0, "b", 2);
        let points = coordinates(&description, &settings(SocketAlignment::Moderate), Direction::LeftDown);
        assert_eq!(points[0].y, points[1].y);
    }

    #[test]
    fn stacked_nodes_use_the_reduced_gap() {
        let collapsed = |id| {
            NodeRecord::new(id, Vec2::new(100.0, 20.0))
                .collapsed(true)
                .math(true)
        };
        let description = Description::new().node(collapsed("a")).node(collapsed("b"));
        let stacked = Settings::builder()
            .stack_collapsed(true)
            .stack_margin_y_factor(0.2)
            .build()
            .unwrap();

        let points = coordinates(&description, &stacked, Direction::LeftDown);
        assert_eq!(points[1].y - points[0].y, 20.0 + 25.0 * 0.2);

        let points = coordinates(&description, &Settings::default(), Direction::LeftDown);
        assert_eq!(points[1].y - points[0].y, 20.0 + 25.0);
    }

    #[test]
    fn right_directions_flush_nodes_right() {
        let description = Description::new()
            .node(NodeRecord::new("wide", Vec2::new(200.0, 60.0)))
            .node(NodeRecord::new("narrow", Vec2::new(100.0, 60.0)));
        let settings = Settings::default();

        let left = coordinates(&description, &settings, Direction::LeftDown);
        assert_eq!(left[1].x, 0.0);
        let right = coordinates(&description, &settings, Direction::RightDown);
        assert_eq!(right[1].x, 100.0);
    }
}
