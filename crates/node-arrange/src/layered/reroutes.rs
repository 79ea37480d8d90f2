use super::dummies::LayeredGraph;
use crate::graph::{EdgeIx, FrameIx, Graph};
use crate::Point;
use tracing::debug;

/// A dummy node turned into a visible bend point
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RerouteVertex {
    pub edge: EdgeIx,
    pub position: Point,
    pub frame: Option<FrameIx>,
}

/// One reroute per dummy node, listed edge by edge from the edge's original
/// source to its original target
///
/// Each reroute belongs to the frame its dummy was laid out in. Nothing is
/// produced when reroutes are disabled; the edges are then drawn straight.
pub(crate) fn collect_reroutes(
    graph: &Graph,
    layered: &LayeredGraph,
    positions: &[Point],
    add_reroutes: bool,
) -> Vec<RerouteVertex> {
    if !add_reroutes {
        return Vec::new();
    }

    let mut reroutes = Vec::new();
    for (edge, chain) in layered.chains.iter().enumerate() {
        let mut dummies = chain.clone();
        if graph.edges[edge].reversed {
            dummies.reverse();
        }
        reroutes.extend(dummies.into_iter().map(|dummy| RerouteVertex {
            edge,
            position: positions[dummy.index()],
            frame: layered.dag[dummy].scope,
        }));
    }

    debug!("Added {} reroutes", reroutes.len());
    reroutes
}
