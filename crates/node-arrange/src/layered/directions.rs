use super::crossings::Ordering;
use super::dummies::LayeredGraph;
use super::positions::assign_coordinates;
use crate::graph::Graph;
use crate::{Direction, Point, Settings};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

/// Final coordinates of every vertex for the configured direction
///
/// A fixed direction is a single coordinate pass. [`Direction::Balanced`]
/// runs the four fixed passes on the same layering and averages them, so
/// each vertex ends at the mean of its four candidate positions.
pub(crate) fn synthesize(
    graph: &Graph,
    layered: &LayeredGraph,
    ordering: &Ordering,
    settings: &Settings,
) -> Vec<Point> {
    let direction = settings.direction();
    if direction != Direction::Balanced {
        return assign_coordinates(graph, layered, ordering, settings, direction);
    }

    let pass = |&direction: &Direction| {
        assign_coordinates(graph, layered, ordering, settings, direction)
    };
    #[cfg(feature = "parallel")]
    let passes: Vec<Vec<Point>> = Direction::FIXED[..].par_iter().map(pass).collect();
    #[cfg(not(feature = "parallel"))]
    let passes: Vec<Vec<Point>> = Direction::FIXED.iter().map(pass).collect();

    debug!("Averaging {} directional passes", passes.len());
    average(&passes)
}

fn average(passes: &[Vec<Point>]) -> Vec<Point> {
    let count = passes.len() as f32;
    let vertex_count = passes.first().map_or(0, Vec::len);
    (0..vertex_count)
        .map(|vertex| {
            let (x, y) = passes.iter().fold((0.0, 0.0), |(x, y), pass| {
                (x + pass[vertex].x, y + pass[vertex].y)
            });
            Point::new(x / count, y / count)
        })
        .collect()
}
