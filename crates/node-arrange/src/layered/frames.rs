use super::crossings::Ordering;
use super::dummies::LayeredGraph;
use super::positions::{vertical_gap, Column};
use crate::graph::{FrameIx, Graph};
use crate::{Point, Rect, Settings};
use petgraph::graph::NodeIndex;
use std::iter;

/// Margin between a frame border and its content
pub const FRAME_PADDING: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
enum Item {
    Vertex(NodeIndex),
    Frame(FrameIx),
}

/// Space taken by a vertex or a frame
///
/// `columns` and `layers` only depend on the layering, so two items overlap
/// or not regardless of the direction the layout was computed in.
#[derive(Debug, Clone, Copy)]
struct Extent {
    rect: Rect,
    columns: (f32, f32),
    layers: (usize, usize),
}

impl Extent {
    fn overlaps(&self, other: &Extent) -> bool {
        let shared_layer = self.layers.0 <= other.layers.1 && other.layers.0 <= self.layers.1;
        let shared_columns = self.columns.0 < other.columns.1 && other.columns.0 < self.columns.1;
        shared_layer || shared_columns
    }

    fn union(self, other: Extent) -> Extent {
        Extent {
            rect: self.rect.union(other.rect),
            columns: (
                self.columns.0.min(other.columns.0),
                self.columns.1.max(other.columns.1),
            ),
            layers: (
                self.layers.0.min(other.layers.0),
                self.layers.1.max(other.layers.1),
            ),
        }
    }

    fn pad(self) -> Extent {
        Extent {
            rect: self.rect.expand(FRAME_PADDING),
            columns: (self.columns.0 - FRAME_PADDING, self.columns.1 + FRAME_PADDING),
            layers: self.layers,
        }
    }
}

struct Frames<'a> {
    graph: &'a Graph,
    layered: &'a LayeredGraph,
    columns: &'a [Column],
    /// Vertices whose innermost frame is the given one
    direct: Vec<Vec<NodeIndex>>,
    /// Vertices inside the given frame at any depth
    within: Vec<Vec<NodeIndex>>,
}

impl<'a> Frames<'a> {
    fn new(graph: &'a Graph, layered: &'a LayeredGraph, columns: &'a [Column]) -> Self {
        let mut direct = vec![Vec::new(); graph.frames.len()];
        let mut within = vec![Vec::new(); graph.frames.len()];
        for vertex in layered.dag.node_indices() {
            let scope = layered.dag[vertex].scope;
            if let Some(frame) = scope {
                direct[frame].push(vertex);
            }
            for frame in graph.ancestors(scope) {
                within[frame].push(vertex);
            }
        }
        Self {
            graph,
            layered,
            columns,
            direct,
            within,
        }
    }

    fn vertex_extent(&self, vertex: NodeIndex, positions: &[Point]) -> Extent {
        let data = &self.layered.dag[vertex];
        let column = self.columns[data.layer];
        Extent {
            rect: Rect::from_origin_size(positions[vertex.index()], data.size),
            columns: (column.start, column.end),
            layers: (data.layer, data.layer),
        }
    }

    fn frame_extent(&self, frame: FrameIx, positions: &[Point]) -> Option<Extent> {
        let vertices = self.direct[frame]
            .iter()
            .map(|&vertex| self.vertex_extent(vertex, positions));
        let children = self.graph.frames[frame]
            .children
            .iter()
            .filter_map(|&child| self.frame_extent(child, positions));
        vertices
            .chain(children)
            .reduce(Extent::union)
            .map(Extent::pad)
    }

    fn extent(&self, item: Item, positions: &[Point]) -> Option<Extent> {
        match item {
            Item::Vertex(vertex) => Some(self.vertex_extent(vertex, positions)),
            Item::Frame(frame) => self.frame_extent(frame, positions),
        }
    }
}

/// Push apart the items sharing a frame so that no two of them overlap
///
/// Frames are handled innermost first and moved as a unit. Within one frame,
/// items are visited in the order shared by all layers; an item overlapping
/// an already placed one is pushed below it, at least the vertical spacing
/// away.
pub(crate) fn separate_frames(
    graph: &Graph,
    layered: &LayeredGraph,
    ordering: &Ordering,
    settings: &Settings,
    columns: &[Column],
    positions: &mut [Point],
) {
    if graph.frames.is_empty() {
        return;
    }

    let frames = Frames::new(graph, layered, columns);
    let top_level: Vec<NodeIndex> = layered
        .dag
        .node_indices()
        .filter(|&vertex| layered.dag[vertex].scope.is_none())
        .collect();
    let top_frames: Vec<FrameIx> = (0..graph.frames.len())
        .filter(|&frame| graph.frames[frame].parent.is_none())
        .collect();

    let scopes = graph
        .frames_deepest_first()
        .into_iter()
        .map(Some)
        .chain(iter::once(None));
    for scope in scopes {
        let (vertices, children) = match scope {
            Some(frame) => (&frames.direct[frame], &graph.frames[frame].children),
            None => (&top_level, &top_frames),
        };

        let mut items: Vec<(usize, Item)> = vertices
            .iter()
            .map(|&vertex| (ordering.vertex_rank[vertex.index()], Item::Vertex(vertex)))
            .chain(
                children
                    .iter()
                    .filter(|&&child| !frames.within[child].is_empty())
                    .map(|&child| (ordering.frame_rank[child], Item::Frame(child))),
            )
            .collect();
        items.sort_by_key(|(rank, _)| *rank);

        let mut placed: Vec<(Item, Extent)> = Vec::with_capacity(items.len());
        for (_, item) in items {
            let Some(mut extent) = frames.extent(item, positions) else {
                continue;
            };

            let required = placed
                .iter()
                .filter(|(_, other)| other.overlaps(&extent))
                .map(|(other_item, other)| {
                    let gap = match (*other_item, item) {
                        (Item::Vertex(upper), Item::Vertex(lower)) => {
                            vertical_gap(layered, settings, upper, lower)
                        }
                        _ => settings.vertical_spacing(),
                    };
                    other.rect.max.y + gap
                })
                .fold(extent.rect.min.y, f32::max);

            let delta = required - extent.rect.min.y;
            if delta > 0.0 {
                let moved: &[NodeIndex] = match item {
                    Item::Vertex(ref vertex) => std::slice::from_ref(vertex),
                    Item::Frame(frame) => &frames.within[frame],
                };
                for vertex in moved {
                    positions[vertex.index()] = positions[vertex.index()].translate(0.0, delta);
                }
                extent.rect = Rect::new(
                    extent.rect.min.translate(0.0, delta),
                    extent.rect.max.translate(0.0, delta),
                );
            }
            placed.push((item, extent));
        }
    }
}

/// Bounding box of every frame: its nodes, its nested frames and, when
/// `include_dummies` is set, the reroutes it holds, plus the frame padding
///
/// Frames with no content get no box.
pub(crate) fn bounding_boxes(
    graph: &Graph,
    layered: &LayeredGraph,
    positions: &[Point],
    include_dummies: bool,
) -> Vec<Option<Rect>> {
    let mut direct: Vec<Option<Rect>> = vec![None; graph.frames.len()];
    for vertex in layered.dag.node_indices() {
        let data = &layered.dag[vertex];
        let Some(frame) = data.scope else {
            continue;
        };
        if data.is_dummy() && !include_dummies {
            continue;
        }
        let rect = Rect::from_origin_size(positions[vertex.index()], data.size);
        direct[frame] = Some(direct[frame].map_or(rect, |other| other.union(rect)));
    }

    let mut boxes: Vec<Option<Rect>> = vec![None; graph.frames.len()];
    for frame in graph.frames_deepest_first() {
        boxes[frame] = graph.frames[frame]
            .children
            .iter()
            .filter_map(|&child| boxes[child])
            .chain(direct[frame])
            .reduce(Rect::union)
            .map(|rect| rect.expand(FRAME_PADDING));
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layered::crossings::minimize_crossings;
    use crate::layered::layers::assign_ranks;
    use crate::layered::positions::assign_coordinates;
    use crate::{Direction, GraphDescription, NodeRecord, Vec2};
    use test_log::test;

    type Description = GraphDescription<&'static str, &'static str>;

    fn node(id: &'static str) -> NodeRecord<&'static str, &'static str> {
        NodeRecord::new(id, Vec2::new(100.0, 60.0))
    }

    fn run(description: &Description, direction: Direction) -> (Graph, LayeredGraph, Vec<Point>) {
        let settings = Settings::default();
        let graph = Graph::from_description(description).unwrap();
        let ranks = assign_ranks(&graph, settings.iterations());
        let layered = LayeredGraph::new(&graph, &ranks, false);
        let ordering = minimize_crossings(&graph, &layered, settings.crossing_reduction_sweeps());
        let positions = assign_coordinates(&graph, &layered, &ordering, &settings, direction);
        (graph, layered, positions)
    }

    fn sibling_frames() -> Description {
        // Two frames fed by the same node, each holding a short chain, and a
        // top-level node sharing their layers
        Description::new()
            .frame("top", None)
            .frame("bottom", None)
            .frame("nested", Some("bottom"))
            .node(node("src"))
            .node(node("t1").in_frame("top"))
            .node(node("t2").in_frame("top"))
            .node(node("b1").in_frame("bottom"))
            .node(node("b2").in_frame("nested"))
            .node(node("free"))
            .edge("src", 0, "t1", 0)
            .edge("t1", 0, "t2", 0)
            .edge("src", 0, "b1", 0)
            .edge("b1", 0, "b2", 0)
            .edge("src", 0, "free", 0)
    }

    #[test]
    fn sibling_frames_do_not_overlap() {
        for direction in Direction::FIXED {
            let (graph, layered, positions) = run(&sibling_frames(), direction);
            let boxes = bounding_boxes(&graph, &layered, &positions, true);
            let (top, bottom) = (boxes[0].unwrap(), boxes[1].unwrap());
            let apart = top.max.y + 25.0 <= bottom.min.y || bottom.max.y + 25.0 <= top.min.y;
            assert!(apart, "{direction:?}: {top:?} / {bottom:?}");

            // The free node shares layer 1 with both frames and stays out of them
            let free = Rect::from_origin_size(positions[5], Vec2::new(100.0, 60.0));
            for frame in [top, bottom] {
                let clear = free.max.y <= frame.min.y || frame.max.y <= free.min.y;
                assert!(clear, "{direction:?}: {free:?} inside {frame:?}");
            }
        }
    }

    #[test]
    fn boxes_contain_their_nodes() {
        let (graph, layered, positions) = run(&sibling_frames(), Direction::LeftDown);
        let boxes = bounding_boxes(&graph, &layered, &positions, false);
        let node_rect = |node: usize| Rect::from_origin_size(positions[node], Vec2::new(100.0, 60.0));

        let nested = boxes[2].unwrap();
        let bottom = boxes[1].unwrap();
        assert!(nested.contains_rect(&node_rect(4)));
        assert!(bottom.contains_rect(&nested.expand(FRAME_PADDING - 0.001)));
        assert!(bottom.contains_rect(&node_rect(3)));
        assert!(boxes[0].unwrap().contains_rect(&node_rect(1)));
        assert_eq!(nested.min.x, positions[4].x - FRAME_PADDING);
    }

    #[test]
    fn empty_frames_have_no_box() {
        let description = Description::new().frame("empty", None).node(node("a"));
        let (graph, layered, positions) = run(&description, Direction::LeftDown);
        assert_eq!(bounding_boxes(&graph, &layered, &positions, true), vec![None]);
    }
}
