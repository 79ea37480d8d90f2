use super::dummies::LayeredGraph;
use crate::graph::{FrameIx, Graph};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Order of the vertices inside each layer
#[derive(Debug, Clone)]
pub(crate) struct Ordering {
    pub layers: Vec<Vec<NodeIndex>>,
    /// Crossings of `layers`
    pub crossings: usize,
    /// Crossings of the order the sweeps started from
    pub initial_crossings: usize,
    /// Rank of each vertex among the items sharing its frame, across layers
    pub vertex_rank: Vec<usize>,
    /// Rank of each frame among the items sharing its parent, across layers
    pub frame_rank: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Item {
    Vertex(NodeIndex),
    Frame(FrameIx),
}

/// Minimize edge crossings with alternating median sweeps
///
/// Each sweep reorders every layer by the median position of its neighbors
/// in the previous layer of the sweep, keeping the vertices of a frame
/// contiguous, then gives every frame a single relative order shared by all
/// layers. The best ordering over the whole sweep budget is kept, the
/// earliest one on ties.
pub(crate) fn minimize_crossings(
    graph: &Graph,
    layered: &LayeredGraph,
    max_sweeps: usize,
) -> Ordering {
    let paths: Vec<Vec<FrameIx>> = layered
        .dag
        .node_indices()
        .map(|vertex| graph.frame_path(layered.dag[vertex].scope))
        .collect();
    let frame_count = graph.frames.len();

    let mut layers: Vec<_> = layered
        .initial_layers()
        .iter()
        .map(|layer| {
            let position = |vertex: NodeIndex| layer.iter().position(|&v| v == vertex).unwrap_or(0);
            sort_grouped(layer, 0, &paths, &|vertex| position(vertex) as f64)
        })
        .collect();
    let mut best = consolidate(layers, &paths, frame_count, layered);
    let initial_crossings = best.crossings;
    debug!("Initial ordering has {initial_crossings} crossings");

    layers = best.layers.clone();
    let mut position = positions(&layers, layered.vertex_count());

    for sweep in 0..max_sweeps {
        if best.crossings == 0 {
            break;
        }

        let downward = sweep % 2 == 0;
        let order: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        let direction = if downward {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };

        for layer_index in order {
            let keys: HashMap<NodeIndex, f64> = layers[layer_index]
                .iter()
                .map(|&vertex| {
                    let key = median_key(layered, vertex, direction, &position)
                        .unwrap_or(position[vertex.index()] as f64);
                    (vertex, key)
                })
                .collect();
            layers[layer_index] = sort_grouped(&layers[layer_index], 0, &paths, &|vertex| keys[&vertex]);
            for (index, &vertex) in layers[layer_index].iter().enumerate() {
                position[vertex.index()] = index;
            }
        }

        let candidate = consolidate(layers, &paths, frame_count, layered);
        trace!("Sweep {sweep}: {} crossings", candidate.crossings);
        layers = candidate.layers.clone();
        position = positions(&layers, layered.vertex_count());
        if candidate.crossings < best.crossings {
            best = candidate;
        }
    }

    debug!(
        "Crossings reduced from {} to {}",
        initial_crossings, best.crossings
    );

    Ordering {
        initial_crossings,
        ..best
    }
}

/// Median of the neighbor positions in the adjacent layer, the mean of the
/// two middle values for an even count
///
/// A small per-socket bias keeps edges leaving one node in socket order.
fn median_key(
    layered: &LayeredGraph,
    vertex: NodeIndex,
    direction: Direction,
    position: &[usize],
) -> Option<f64> {
    let mut values: Vec<f64> = layered
        .neighbors(vertex, direction)
        .into_iter()
        .map(|(neighbor, segment)| {
            let port = match direction {
                Direction::Incoming => segment.tail,
                Direction::Outgoing => segment.head,
            };
            let row = layered.socket_row(neighbor, port, direction.opposite()) as f64;
            position[neighbor.index()] as f64 + (1.0 - 1.0 / (row + 1.0))
        })
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let middle = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[middle])
    } else {
        Some((values[middle - 1] + values[middle]) / 2.0)
    }
}

/// Stable sort of a layer by key, frame members staying contiguous
///
/// At each frame depth, vertices sit next to the frames of that depth; a
/// frame is sorted by the mean key of its vertices in this layer.
fn sort_grouped(
    layer: &[NodeIndex],
    depth: usize,
    paths: &[Vec<FrameIx>],
    key: &dyn Fn(NodeIndex) -> f64,
) -> Vec<NodeIndex> {
    let mut groups: Vec<(Item, Vec<NodeIndex>)> = Vec::new();
    for &vertex in layer {
        let item = match paths[vertex.index()].get(depth) {
            Some(&frame) => Item::Frame(frame),
            None => Item::Vertex(vertex),
        };
        match groups.iter_mut().find(|(existing, _)| *existing == item) {
            Some((_, members)) => members.push(vertex),
            None => groups.push((item, vec![vertex])),
        }
    }

    let mut keyed: Vec<(f64, Item, Vec<NodeIndex>)> = groups
        .into_iter()
        .map(|(item, members)| {
            let sum: f64 = members.iter().map(|&vertex| key(vertex)).sum();
            (sum / members.len() as f64, item, members)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    keyed
        .into_iter()
        .flat_map(|(_, item, members)| match item {
            Item::Vertex(vertex) => vec![vertex],
            Item::Frame(_) => sort_grouped(&members, depth + 1, paths, key),
        })
        .collect()
}

/// Give the items (vertices and child frames) of every frame one order shared
/// by all layers, then reorder each layer to follow it
///
/// Items are ranked by their mean relative position in their layers. Two
/// frames can then never swap sides from one layer to the next.
fn consolidate(
    layers: Vec<Vec<NodeIndex>>,
    paths: &[Vec<FrameIx>],
    frame_count: usize,
    layered: &LayeredGraph,
) -> Ordering {
    let vertex_count = paths.len();
    let mut vertex_key = vec![0.0; vertex_count];
    let mut location = vec![(0, 0); vertex_count];
    let mut frame_sum = vec![0.0; frame_count];
    let mut frame_members = vec![0usize; frame_count];
    for (layer_index, layer) in layers.iter().enumerate() {
        for (index, &vertex) in layer.iter().enumerate() {
            let key = (index as f64 + 0.5) / layer.len() as f64;
            vertex_key[vertex.index()] = key;
            location[vertex.index()] = (layer_index, index);
            for &frame in &paths[vertex.index()] {
                frame_sum[frame] += key;
                frame_members[frame] += 1;
            }
        }
    }

    // Items of each scope, frames ranked before vertices on equal keys
    let mut scopes: HashMap<Option<FrameIx>, Vec<(f64, (u8, usize, usize), Item)>> = HashMap::new();
    let mut seen_frames = HashSet::new();
    for layer in &layers {
        for &vertex in layer {
            let path = &paths[vertex.index()];
            for (depth, &frame) in path.iter().enumerate() {
                if seen_frames.insert(frame) {
                    let parent = depth.checked_sub(1).map(|parent| path[parent]);
                    let key = frame_sum[frame] / frame_members[frame] as f64;
                    scopes
                        .entry(parent)
                        .or_default()
                        .push((key, (0, frame, 0), Item::Frame(frame)));
                }
            }
            let (layer_index, index) = location[vertex.index()];
            scopes.entry(path.last().copied()).or_default().push((
                vertex_key[vertex.index()],
                (1, layer_index, index),
                Item::Vertex(vertex),
            ));
        }
    }

    let mut vertex_rank = vec![0; vertex_count];
    let mut frame_rank = vec![0; frame_count];
    for items in scopes.values_mut() {
        items.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (rank, (_, _, item)) in items.iter().enumerate() {
            match *item {
                Item::Vertex(vertex) => vertex_rank[vertex.index()] = rank,
                Item::Frame(frame) => frame_rank[frame] = rank,
            }
        }
    }

    let layers: Vec<_> = layers
        .iter()
        .map(|layer| sort_by_rank(layer, 0, paths, &vertex_rank, &frame_rank))
        .collect();
    let crossings = count_crossings(layered, &layers);

    Ordering {
        layers,
        crossings,
        initial_crossings: crossings,
        vertex_rank,
        frame_rank,
    }
}

/// Reorder a layer by scope ranks, frame by frame
fn sort_by_rank(
    layer: &[NodeIndex],
    depth: usize,
    paths: &[Vec<FrameIx>],
    vertex_rank: &[usize],
    frame_rank: &[usize],
) -> Vec<NodeIndex> {
    let mut groups: Vec<(usize, Item, Vec<NodeIndex>)> = Vec::new();
    for &vertex in layer {
        let (rank, item) = match paths[vertex.index()].get(depth) {
            Some(&frame) => (frame_rank[frame], Item::Frame(frame)),
            None => (vertex_rank[vertex.index()], Item::Vertex(vertex)),
        };
        match groups.iter_mut().find(|(_, existing, _)| *existing == item) {
            Some((_, _, members)) => members.push(vertex),
            None => groups.push((rank, item, vec![vertex])),
        }
    }
    groups.sort_by_key(|(rank, _, _)| *rank);

    groups
        .into_iter()
        .flat_map(|(_, item, members)| match item {
            Item::Vertex(vertex) => vec![vertex],
            Item::Frame(_) => sort_by_rank(&members, depth + 1, paths, vertex_rank, frame_rank),
        })
        .collect()
}

fn positions(layers: &[Vec<NodeIndex>], vertex_count: usize) -> Vec<usize> {
    let mut position = vec![0; vertex_count];
    for layer in layers {
        for (index, &vertex) in layer.iter().enumerate() {
            position[vertex.index()] = index;
        }
    }
    position
}

/// Count the edge crossings between each pair of adjacent layers
///
/// Segments leaving or entering one vertex through different sockets are
/// ordered by socket row, so they can cross each other too.
pub(crate) fn count_crossings(
    layered: &LayeredGraph,
    layers: &[Vec<NodeIndex>],
) -> usize {
    let position = positions(layers, layered.vertex_count());
    let mut crossings = 0;

    for upper_layer in layers.iter().take(layers.len().saturating_sub(1)) {
        let mut segments: Vec<((usize, usize), (usize, usize))> = Vec::new();
        for &upper in upper_layer {
            for (lower, segment) in layered.neighbors(upper, Direction::Outgoing) {
                segments.push((
                    (
                        position[upper.index()],
                        layered.socket_row(upper, segment.tail, Direction::Outgoing),
                    ),
                    (
                        position[lower.index()],
                        layered.socket_row(lower, segment.head, Direction::Incoming),
                    ),
                ));
            }
        }
        segments.sort_unstable();

        // Sorted by upper end, a crossing is a strict inversion of lower ends
        for (index, (_, lower)) in segments.iter().enumerate() {
            crossings += segments[index + 1..]
                .iter()
                .filter(|(_, other)| other < lower)
                .count();
        }
    }

    crossings
}
