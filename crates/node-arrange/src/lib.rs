//! Layered auto-layout for node trees
//!
//! This crate arranges the nodes of a node editor graph in columns following
//! the edges (Sugiyama-style): cycles are broken, nodes are ranked into
//! layers, each layer is ordered to reduce edge crossings and coordinates
//! are assigned with a Brandes-Köpf alignment. Frames (nested node groups)
//! stay contiguous and never overlap, and edges spanning several layers get
//! reroutes.
//!
//! # Example
//!
//! ```
//! use node_arrange::{GraphDescription, LayoutEngine, NodeArrange, NodeRecord, Settings, Vec2};
//!
//! // Describe the graph
//! let description: GraphDescription<&str, &str> = GraphDescription::new()
//!     .frame("group", None)
//!     .node(NodeRecord::new("input", Vec2::new(140.0, 100.0)))
//!     .node(NodeRecord::new("math", Vec2::new(140.0, 120.0)).in_frame("group"))
//!     .node(NodeRecord::new("output", Vec2::new(140.0, 100.0)))
//!     .edge("input", 0, "math", 0)
//!     .edge("math", 0, "output", 0)
//!     .edge("input", 0, "output", 0);
//!
//! // Create a layout engine
//! let engine = NodeArrange::new(Settings::default());
//!
//! // Use the LayoutEngine trait (simple, single-phase):
//! let layout = engine.layout(&description).unwrap();
//! assert!(layout.frames.contains_key("group"));
//!
//! // Or directly by calling each step for better control
//! let layers = engine.compute_layers(&description).unwrap();
//! let layout = engine.compute_positions(&layers);
//! assert_eq!(layout.reroutes.len(), 1);
//! ```

mod description;
mod engine;
mod error;
mod geometry;
mod graph;
mod settings;

pub mod layered;

pub use description::{EdgeRecord, FrameRecord, GraphDescription, NodeRecord};
pub use engine::LayoutEngine;
pub use error::{ConfigurationError, InvalidGraphError};
pub use geometry::{Point, Rect, Vec2};
pub use settings::{Direction, Settings, SettingsBuilder, SocketAlignment};

// Re-export layered layout types
pub use layered::{Layers, Layout, NodeArrange, Reroute, FRAME_PADDING};

use std::fmt::Debug;
use std::hash::Hash;

/// Lay out a graph description in one call
///
/// # Errors
/// Returns an error if the description is malformed
pub fn layout<N, F>(
    description: &GraphDescription<N, F>,
    settings: &Settings,
) -> Result<Layout<N, F>, InvalidGraphError>
where
    N: Clone + Eq + Hash + Debug,
    F: Clone + Eq + Hash + Debug,
{
    NodeArrange::new(settings.clone()).layout(description)
}
