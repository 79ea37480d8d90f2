use crate::Vec2;
use serde::{Deserialize, Serialize};

/// Host-side description of a node tree, the input of a layout
///
/// `N` identifies nodes and `F` identifies frames. Declaration order matters:
/// it breaks ties everywhere in the pipeline, so the same description always
/// produces the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "N: Serialize, F: Serialize",
    deserialize = "N: Deserialize<'de>, F: Deserialize<'de>"
))]
pub struct GraphDescription<N, F> {
    #[serde(default)]
    pub nodes: Vec<NodeRecord<N, F>>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord<N>>,
    #[serde(default)]
    pub frames: Vec<FrameRecord<F>>,
}

impl<N, F> Default for GraphDescription<N, F> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl<N, F> GraphDescription<N, F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: NodeRecord<N, F>) -> Self {
        self.nodes.push(node);
        self
    }

    /// Link output socket `from_socket` of `from` to input socket `to_socket` of `to`
    pub fn edge(mut self, from: N, from_socket: usize, to: N, to_socket: usize) -> Self {
        self.edges.push(EdgeRecord {
            from,
            from_socket,
            to,
            to_socket,
        });
        self
    }

    pub fn frame(mut self, id: F, parent: Option<F>) -> Self {
        self.frames.push(FrameRecord { id, parent });
        self
    }
}

/// A node as the host sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord<N, F> {
    pub id: N,
    pub size: Vec2,
    #[serde(default)]
    pub inputs: usize,
    #[serde(default)]
    pub outputs: usize,
    pub frame: Option<F>,
    /// Drawn with its body hidden
    #[serde(default)]
    pub collapsed: bool,
    /// Unary math-like operator, a candidate for stacking when collapsed
    #[serde(default)]
    pub math: bool,
}

impl<N, F> NodeRecord<N, F> {
    /// A node with one input and one output socket
    pub fn new(id: N, size: Vec2) -> Self {
        Self {
            id,
            size,
            inputs: 1,
            outputs: 1,
            frame: None,
            collapsed: false,
            math: false,
        }
    }

    pub fn sockets(mut self, inputs: usize, outputs: usize) -> Self {
        self.inputs = inputs;
        self.outputs = outputs;
        self
    }

    pub fn in_frame(mut self, frame: F) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn math(mut self, math: bool) -> Self {
        self.math = math;
        self
    }
}

/// A link from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord<N> {
    pub from: N,
    pub from_socket: usize,
    pub to: N,
    pub to_socket: usize,
}

/// A frame, optionally nested in another frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord<F> {
    pub id: F,
    pub parent: Option<F>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn missing_frames_read_as_none() {
        let description: GraphDescription<String, String> = ron::from_str(
            r#"(
                frames: [(id: "outer"), (id: "inner", parent: Some("outer"))],
                nodes: [
                    (id: "a", size: (x: 100.0, y: 80.0)),
                    (id: "b", size: (x: 100.0, y: 80.0), inputs: 1, frame: Some("inner")),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(description.frames[0].parent, None);
        assert_eq!(description.frames[1].parent.as_deref(), Some("outer"));
        assert_eq!(description.nodes[0].frame, None);
        assert_eq!(description.nodes[0].inputs, 0);
        assert_eq!(description.nodes[1].frame.as_deref(), Some("inner"));
        assert!(description.edges.is_empty());
    }
}
