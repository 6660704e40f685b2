//! Consumes a multi-linestring and emits a [`Graph`] with deduplicated
//! endpoint vertices (§4.1).

use indexmap::IndexMap;

use crate::geometry::{Point, Polyline};
use crate::graph::Graph;

/// Builds a [`Graph`] from a sequence of polylines (a "multi-linestring").
///
/// Each polyline becomes exactly one edge; its first and last points become
/// (deduplicated) vertices. Vertex deduplication uses exact point equality,
/// as the original source does (the redundant ε-equality branch is dropped,
/// see the Open Questions in the specification).
pub struct Builder;

impl Builder {
    pub fn build(lines: &[Polyline]) -> Graph {
        let mut graph = Graph::new();
        // IndexMap mirrors the Builder's "first-seen wins" dedup contract
        // and gives deterministic vertex ordering for identical input.
        let mut seen: IndexMap<(u64, u64), usize> = IndexMap::new();

        let mut vertex_for = |g: &mut Graph, pt: Point| -> usize {
            let key = (pt.x.to_bits(), pt.y.to_bits());
            *seen.entry(key).or_insert_with(|| g.push_vertex(pt))
        };

        for line in lines {
            let v1 = vertex_for(&mut graph, line.first());
            let v2 = vertex_for(&mut graph, line.last());
            graph.push_edge(v1, v2, line.clone());
        }

        log::debug!(
            "built graph: {} vertices, {} edges from {} input polylines",
            graph.vertices.len(),
            graph.edges.len(),
            lines.len()
        );
        graph
    }
}
