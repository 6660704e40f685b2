//! Maps a planar point to an existing graph vertex, or to a point on an
//! active edge (§4.2). Both operations are linear scans; a spatial index
//! would change performance, not behavior.

use crate::geometry::{GeometryEngine, Point, DEFAULT_EPSILON};
use crate::graph::{EdgeIndex, Graph, VertexIndex};

/// Result of [`Locator::point_to_edge`].
#[derive(Clone, Copy, Debug)]
pub struct EdgeHit {
    pub edge: EdgeIndex,
    pub point: Point,
    pub vertex_after: usize,
}

pub struct Locator;

impl Locator {
    /// First vertex whose point ε-equals `pt`, if any.
    pub fn point_to_vertex(graph: &Graph, pt: Point, eps: f64) -> Option<VertexIndex> {
        graph.vertices.iter().position(|v| v.pt.eps_eq(&pt, eps))
    }

    /// The lowest-indexed active edge whose polyline passes within `eps` of
    /// `pt`, together with the exact hit point and the split-point vertex
    /// index the Grafter needs.
    pub fn point_to_edge(
        graph: &Graph,
        engine: &dyn GeometryEngine,
        pt: Point,
        eps: f64,
    ) -> Option<EdgeHit> {
        for i in graph.active_edges() {
            let hit = engine.closest_segment(&graph.edges[i].coords, pt);
            if hit.distance < eps {
                log::trace!("point ({}, {}) snaps to edge {}", pt.x, pt.y, i);
                return Some(EdgeHit {
                    edge: i,
                    point: hit.closest_point,
                    vertex_after: hit.vertex_after,
                });
            }
        }
        None
    }

    /// Default-epsilon convenience wrapper used throughout the crate.
    pub fn point_to_vertex_default(graph: &Graph, pt: Point) -> Option<VertexIndex> {
        Self::point_to_vertex(graph, pt, DEFAULT_EPSILON)
    }

    pub fn point_to_edge_default(graph: &Graph, engine: &dyn GeometryEngine, pt: Point) -> Option<EdgeHit> {
        Self::point_to_edge(graph, engine, pt, DEFAULT_EPSILON)
    }
}
