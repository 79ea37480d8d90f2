/// A layout engine that can compute positions for graph nodes
///
/// This trait is generic over the graph type `G` so an engine can accept
/// whatever graph representation it needs, and picks its own output and
/// error types.
pub trait LayoutEngine<G> {
    /// Positions and any extra geometry the engine produces
    type Output;

    type Error;

    /// Compute the layout of the given graph
    ///
    /// # Errors
    /// Returns an error if the graph violates the engine's constraints
    fn layout(&self, graph: G) -> Result<Self::Output, Self::Error>;
}
