use crate::graph::{FrameIx, Graph, NodeIx};
use petgraph::Direction;
use std::collections::BTreeSet;
use tracing::trace;

/// Assign each node of a DAG to a layer
///
/// Starts from a longest-path layering, then refines it for at most
/// `iterations` passes:
/// - nodes move closer to their successors, without leaving the layer span
///   of their frame
/// - frames move as a unit towards the side they have more external edges on
///
/// Empty layers are dropped at the end, so layers are dense from 0.
///
/// # Panics
/// Panics if the graph has a cycle or if refinement breaks edge direction;
/// both are defects of the caller or of this function.
pub(crate) fn assign_ranks(graph: &Graph, iterations: usize) -> Vec<usize> {
    let topo_order = graph
        .topological_order()
        .unwrap_or_else(|node| panic!("ranking needs a DAG, node {node} is on a cycle"));

    // First pass: forward, assign each node to the layer after its predecessors
    let mut ranks = vec![0; graph.nodes.len()];
    for &node in &topo_order {
        ranks[node] = graph
            .neighbors(node, Direction::Incoming)
            .map(|pred| ranks[pred] + 1)
            .max()
            .unwrap_or(0);
    }

    let members: Vec<Vec<NodeIx>> = (0..graph.frames.len())
        .map(|frame| graph.nodes_within(frame))
        .collect();
    let frames = graph.frames_deepest_first();

    for iteration in 0..iterations {
        let mut changed = pull_towards_successors(graph, &topo_order, &members, &mut ranks);
        for &frame in &frames {
            changed |= shift_frame(graph, frame, &members[frame], &mut ranks);
        }
        trace!("Rank refinement pass {iteration}, changed: {changed}");
        if !changed {
            break;
        }
    }

    let ranks = compact(ranks);
    for edge in &graph.edges {
        assert!(
            ranks[edge.target.node] > ranks[edge.source.node],
            "edge {} -> {} does not point to a later layer",
            edge.source.node,
            edge.target.node
        );
    }
    ranks
}

/// Backward pass: move nodes closer to their successors when possible
fn pull_towards_successors(
    graph: &Graph,
    topo_order: &[NodeIx],
    members: &[Vec<NodeIx>],
    ranks: &mut [usize],
) -> bool {
    let mut changed = false;
    for &node in topo_order.iter().rev() {
        let rank = ranks[node];
        let Some(min_succ_rank) = graph
            .neighbors(node, Direction::Outgoing)
            .map(|succ| ranks[succ])
            .min()
        else {
            continue;
        };
        if min_succ_rank <= rank + 1 {
            continue;
        }

        let target = min_succ_rank - 1;
        let inside_frame = match graph.nodes[node].frame {
            Some(frame) => span(&members[frame], ranks).is_some_and(|(_, max)| target <= max),
            None => true,
        };
        if inside_frame {
            ranks[node] = target;
            changed = true;
        }
    }
    changed
}

/// Move every node of a frame by the same amount, towards the side with more
/// external edges, as far as those edges allow
fn shift_frame(graph: &Graph, frame: FrameIx, members: &[NodeIx], ranks: &mut [usize]) -> bool {
    let Some((min_rank, _)) = span(members, ranks) else {
        return false;
    };

    let mut incoming = 0;
    let mut outgoing = 0;
    let mut incoming_slack = min_rank;
    let mut outgoing_slack = usize::MAX;
    for edge in &graph.edges {
        let source_inside = graph.is_within(graph.nodes[edge.source.node].frame, frame);
        let target_inside = graph.is_within(graph.nodes[edge.target.node].frame, frame);
        let slack = ranks[edge.target.node] - ranks[edge.source.node] - 1;
        match (source_inside, target_inside) {
            (true, false) => {
                outgoing += 1;
                outgoing_slack = outgoing_slack.min(slack);
            }
            (false, true) => {
                incoming += 1;
                incoming_slack = incoming_slack.min(slack);
            }
            _ => {}
        }
    }

    if outgoing > incoming && outgoing_slack > 0 && outgoing_slack != usize::MAX {
        for &node in members {
            ranks[node] += outgoing_slack;
        }
        true
    } else if incoming > outgoing && incoming_slack > 0 {
        for &node in members {
            ranks[node] -= incoming_slack;
        }
        true
    } else {
        false
    }
}

/// Lowest and highest rank among `nodes`
fn span(nodes: &[NodeIx], ranks: &[usize]) -> Option<(usize, usize)> {
    let min = nodes.iter().map(|&node| ranks[node]).min()?;
    let max = nodes.iter().map(|&node| ranks[node]).max()?;
    Some((min, max))
}

/// Renumber ranks so that no layer is empty
fn compact(ranks: Vec<usize>) -> Vec<usize> {
    let used: BTreeSet<usize> = ranks.iter().copied().collect();
    let dense: Vec<usize> = used.into_iter().collect();
    ranks
        .into_iter()
        .map(|rank| dense.partition_point(|&used| used < rank))
        .collect()
}
