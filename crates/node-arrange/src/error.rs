use thiserror::Error;

/// Invalid [`Settings`](crate::Settings), reported when the settings are built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("iterations must be at least 1, got {0}")]
    Iterations(usize),

    #[error("crossing_reduction_sweeps must be at least 1, got {0}")]
    CrossingReductionSweeps(usize),

    #[error("stack_margin_y_factor must be between 0 and 1, got {0}")]
    StackMarginYFactor(f32),

    #[error("{name} must be finite and non-negative, got {value}")]
    Spacing { name: &'static str, value: f32 },
}

/// Malformed graph description, reported before any layout stage runs
///
/// Host identifiers are rendered with their `Debug` representation so the
/// error type does not depend on the host's id types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGraphError {
    #[error("node {0} is declared more than once")]
    DuplicateNode(String),

    #[error("frame {0} is declared more than once")]
    DuplicateFrame(String),

    #[error("edge #{edge} references unknown node {node}")]
    MissingNode { edge: usize, node: String },

    #[error("edge #{edge} references {kind} socket {socket} of node {node}, which has {available}")]
    MissingSocket {
        edge: usize,
        node: String,
        kind: &'static str,
        socket: usize,
        available: usize,
    },

    #[error("{owner} references unknown frame {frame}")]
    MissingFrame { owner: String, frame: String },

    #[error("frame {0} is its own ancestor")]
    FrameCycle(String),

    #[error("edge #{edge} connects node {node} to itself")]
    SelfLoop { edge: usize, node: String },

    #[error("node {node} has size {size}, which is not finite and non-negative")]
    InvalidSize { node: String, size: String },
}
