use crate::graph::{EdgeIx, Graph};
use petgraph::Direction;
use tracing::debug;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Reverse the back edges of a depth-first traversal so the graph becomes a DAG
///
/// The traversal starts from the source nodes, then from the remaining nodes,
/// both in declaration order, and follows edges in declaration order. The
/// result only depends on the graph, so repeated calls reverse the same edges.
/// Returns the reversed edges.
pub(crate) fn break_cycles(graph: &mut Graph) -> Vec<EdgeIx> {
    let node_count = graph.nodes.len();
    let mut marks = vec![Mark::Unvisited; node_count];
    let mut back_edges = Vec::new();

    let sources = (0..node_count).filter(|&node| {
        graph
            .edges_directed(node, Direction::Incoming)
            .is_empty()
    });
    let roots: Vec<_> = sources.chain(0..node_count).collect();

    for root in roots {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // Explicit stack of (node, next outgoing edge slot)
        marks[root] = Mark::OnStack;
        let mut stack = vec![(root, 0)];
        while let Some((node, slot)) = stack.last_mut() {
            let outgoing = graph.edges_directed(*node, Direction::Outgoing);
            let Some(&edge) = outgoing.get(*slot) else {
                marks[*node] = Mark::Done;
                stack.pop();
                continue;
            };
            *slot += 1;

            let target = graph.edges[edge].target.node;
            match marks[target] {
                Mark::Unvisited => {
                    marks[target] = Mark::OnStack;
                    stack.push((target, 0));
                }
                Mark::OnStack => back_edges.push(edge),
                Mark::Done => {}
            }
        }
    }

    back_edges.sort_unstable();
    for &edge in &back_edges {
        graph.reverse_edge(edge);
    }

    if !back_edges.is_empty() {
        debug!("Reversed edges {back_edges:?} to break cycles");
    }

    back_edges
}
