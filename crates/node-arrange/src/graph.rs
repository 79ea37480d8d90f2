//! Graph model: nodes, socket-level edges and the frame tree
//!
//! Everything is stored in arenas indexed by declaration order. Frames hold
//! their parent as an index, nodes hold their frame as an index; nothing owns
//! anything else.

use crate::{GraphDescription, InvalidGraphError, Vec2};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

pub(crate) type NodeIx = usize;
pub(crate) type EdgeIx = usize;
pub(crate) type FrameIx = usize;

/// Height of the node header above the first socket
pub(crate) const HEADER_HEIGHT: f32 = 30.0;

/// Distance between two consecutive socket rows
pub(crate) const SOCKET_SPACING: f32 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Port {
    Output(usize),
    Input(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Socket {
    pub node: NodeIx,
    pub port: Port,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub size: Vec2,
    pub outputs: usize,
    pub frame: Option<FrameIx>,
    pub collapsed: bool,
    /// Collapsed math node, may be stacked tighter than other nodes
    pub stackable: bool,
}

impl Node {
    /// Vertical distance from the node top to the given socket
    ///
    /// Outputs are listed first, then inputs. A collapsed node shows all of
    /// its sockets at mid-height.
    pub fn socket_offset(&self, port: Port) -> f32 {
        if self.collapsed {
            return self.size.y / 2.0;
        }
        let row = match port {
            Port::Output(index) => index,
            Port::Input(index) => self.outputs + index,
        };
        let offset = HEADER_HEIGHT + SOCKET_SPACING * (row as f32 + 0.5);
        offset.clamp(0.0, self.size.y)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub source: Socket,
    pub target: Socket,
    /// Set by the cycle breaker when source and target were swapped
    pub reversed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub parent: Option<FrameIx>,
    pub depth: usize,
    pub children: Vec<FrameIx>,
    /// Nodes whose innermost frame is this one
    pub nodes: Vec<NodeIx>,
}

#[derive(Debug, Clone)]
pub(crate) struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub frames: Vec<Frame>,
    outgoing: Vec<Vec<EdgeIx>>,
    incoming: Vec<Vec<EdgeIx>>,
}

impl Graph {
    /// Build and validate the graph model from a host description
    ///
    /// # Errors
    /// Returns an error on duplicate ids, dangling edge endpoints or sockets,
    /// unknown frames, self-loops and cycles in the frame tree
    pub fn from_description<N, F>(
        description: &GraphDescription<N, F>,
    ) -> Result<Self, InvalidGraphError>
    where
        N: Eq + Hash + Debug,
        F: Eq + Hash + Debug,
    {
        let mut frame_index = HashMap::new();
        for (index, frame) in description.frames.iter().enumerate() {
            if frame_index.insert(&frame.id, index).is_some() {
                return Err(InvalidGraphError::DuplicateFrame(format!("{:?}", frame.id)));
            }
        }

        let lookup_frame = |owner: String, id: &F| {
            frame_index
                .get(id)
                .copied()
                .ok_or_else(|| InvalidGraphError::MissingFrame {
                    owner,
                    frame: format!("{id:?}"),
                })
        };

        let mut frames = description
            .frames
            .iter()
            .map(|record| {
                let parent = record
                    .parent
                    .as_ref()
                    .map(|parent| lookup_frame(format!("frame {:?}", record.id), parent))
                    .transpose()?;
                Ok(Frame {
                    parent,
                    depth: 0,
                    children: Vec::new(),
                    nodes: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>, InvalidGraphError>>()?;

        // Walk every parent chain once, a chain longer than the frame count
        // can only come from a cycle
        for start in 0..frames.len() {
            let mut depth = 0;
            let mut current = frames[start].parent;
            while let Some(frame) = current {
                depth += 1;
                if frame == start || depth > frames.len() {
                    return Err(InvalidGraphError::FrameCycle(format!(
                        "{:?}",
                        description.frames[start].id
                    )));
                }
                current = frames[frame].parent;
            }
            frames[start].depth = depth;
        }
        for index in 0..frames.len() {
            if let Some(parent) = frames[index].parent {
                frames[parent].children.push(index);
            }
        }

        let mut node_index = HashMap::new();
        let mut nodes = Vec::with_capacity(description.nodes.len());
        for (index, record) in description.nodes.iter().enumerate() {
            if node_index.insert(&record.id, index).is_some() {
                return Err(InvalidGraphError::DuplicateNode(format!("{:?}", record.id)));
            }
            let Vec2 { x, y } = record.size;
            if !(x.is_finite() && y.is_finite() && x >= 0.0 && y >= 0.0) {
                return Err(InvalidGraphError::InvalidSize {
                    node: format!("{:?}", record.id),
                    size: format!("{:?}", record.size),
                });
            }
            let frame = record
                .frame
                .as_ref()
                .map(|frame| lookup_frame(format!("node {:?}", record.id), frame))
                .transpose()?;
            if let Some(frame) = frame {
                frames[frame].nodes.push(index);
            }
            nodes.push(Node {
                size: record.size,
                outputs: record.outputs,
                frame,
                collapsed: record.collapsed,
                stackable: record.collapsed && record.math,
            });
        }

        let mut edges = Vec::with_capacity(description.edges.len());
        for (index, record) in description.edges.iter().enumerate() {
            let endpoint = |id: &N| {
                node_index
                    .get(id)
                    .copied()
                    .ok_or_else(|| InvalidGraphError::MissingNode {
                        edge: index,
                        node: format!("{id:?}"),
                    })
            };
            let from = endpoint(&record.from)?;
            let to = endpoint(&record.to)?;

            let from_record = &description.nodes[from];
            if record.from_socket >= from_record.outputs {
                return Err(InvalidGraphError::MissingSocket {
                    edge: index,
                    node: format!("{:?}", record.from),
                    kind: "output",
                    socket: record.from_socket,
                    available: from_record.outputs,
                });
            }
            let to_record = &description.nodes[to];
            if record.to_socket >= to_record.inputs {
                return Err(InvalidGraphError::MissingSocket {
                    edge: index,
                    node: format!("{:?}", record.to),
                    kind: "input",
                    socket: record.to_socket,
                    available: to_record.inputs,
                });
            }
            if from == to {
                return Err(InvalidGraphError::SelfLoop {
                    edge: index,
                    node: format!("{:?}", record.from),
                });
            }

            edges.push(Edge {
                source: Socket {
                    node: from,
                    port: Port::Output(record.from_socket),
                },
                target: Socket {
                    node: to,
                    port: Port::Input(record.to_socket),
                },
                reversed: false,
            });
        }

        let mut graph = Graph {
            nodes,
            edges,
            frames,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        };
        graph.rebuild_adjacency();

        debug!(
            "Graph of {} nodes, {} edges, {} frames",
            graph.nodes.len(),
            graph.edges.len(),
            graph.frames.len()
        );

        Ok(graph)
    }

    fn rebuild_adjacency(&mut self) {
        self.outgoing = vec![Vec::new(); self.nodes.len()];
        self.incoming = vec![Vec::new(); self.nodes.len()];
        for (index, edge) in self.edges.iter().enumerate() {
            self.outgoing[edge.source.node].push(index);
            self.incoming[edge.target.node].push(index);
        }
    }

    /// Swap the endpoints of an edge and flag it as reversed
    pub fn reverse_edge(&mut self, edge: EdgeIx) {
        let edge = &mut self.edges[edge];
        std::mem::swap(&mut edge.source, &mut edge.target);
        edge.reversed = !edge.reversed;
        self.rebuild_adjacency();
    }

    /// Edges leaving (`Outgoing`) or entering (`Incoming`) a node, in
    /// declaration order
    pub fn edges_directed(&self, node: NodeIx, direction: Direction) -> &[EdgeIx] {
        match direction {
            Direction::Outgoing => &self.outgoing[node],
            Direction::Incoming => &self.incoming[node],
        }
    }

    /// Nodes on the other end of the edges in `direction`
    pub fn neighbors(
        &self,
        node: NodeIx,
        direction: Direction,
    ) -> impl Iterator<Item = NodeIx> + '_ {
        self.edges_directed(node, direction)
            .iter()
            .map(move |&edge| match direction {
                Direction::Outgoing => self.edges[edge].target.node,
                Direction::Incoming => self.edges[edge].source.node,
            })
    }

    /// Topological order of the nodes
    ///
    /// # Errors
    /// Returns a node on a cycle if the graph is not acyclic
    pub fn topological_order(&self) -> Result<Vec<NodeIx>, NodeIx> {
        let mut dag = DiGraphMap::<NodeIx, ()>::new();
        for node in 0..self.nodes.len() {
            dag.add_node(node);
        }
        for edge in &self.edges {
            dag.add_edge(edge.source.node, edge.target.node, ());
        }
        toposort(&dag, None).map_err(|cycle| cycle.node_id())
    }

    /// The given frame followed by its ancestors, innermost first
    pub fn ancestors(&self, frame: Option<FrameIx>) -> impl Iterator<Item = FrameIx> + '_ {
        std::iter::successors(frame, move |&frame| self.frames[frame].parent)
    }

    /// Frames from the outermost down to `frame` included
    pub fn frame_path(&self, frame: Option<FrameIx>) -> Vec<FrameIx> {
        let mut path: Vec<_> = self.ancestors(frame).collect();
        path.reverse();
        path
    }

    /// Every frame nested in `frame`, at any depth
    pub fn descendants(&self, frame: FrameIx) -> Vec<FrameIx> {
        let mut found = Vec::new();
        let mut pending = self.frames[frame].children.clone();
        while let Some(child) = pending.pop() {
            found.push(child);
            pending.extend(self.frames[child].children.iter().copied());
        }
        found.sort_unstable();
        found
    }

    /// Nodes contained in `frame` directly or through nested frames
    pub fn nodes_within(&self, frame: FrameIx) -> Vec<NodeIx> {
        let mut nodes = self.frames[frame].nodes.clone();
        for child in self.descendants(frame) {
            nodes.extend(self.frames[child].nodes.iter().copied());
        }
        nodes.sort_unstable();
        nodes
    }

    /// Whether `frame` is `ancestor` or nested inside it
    pub fn is_within(&self, frame: Option<FrameIx>, ancestor: FrameIx) -> bool {
        self.ancestors(frame).any(|frame| frame == ancestor)
    }

    /// Innermost frame containing both frames, `None` for the top level
    pub fn common_frame(&self, a: Option<FrameIx>, b: Option<FrameIx>) -> Option<FrameIx> {
        self.ancestors(a).find(|&frame| self.is_within(b, frame))
    }

    /// Innermost frame containing both nodes
    pub fn lowest_common_frame(&self, a: NodeIx, b: NodeIx) -> Option<FrameIx> {
        self.common_frame(self.nodes[a].frame, self.nodes[b].frame)
    }

    /// All frames, children before their parents
    pub fn frames_deepest_first(&self) -> Vec<FrameIx> {
        let mut frames: Vec<_> = (0..self.frames.len()).collect();
        frames.sort_by_key(|&frame| std::cmp::Reverse(self.frames[frame].depth));
        frames
    }
}
