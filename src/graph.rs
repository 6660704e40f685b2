//! The in-memory planar graph: vertices, polyline edges, and the
//! bookkeeping [`Grafter`](crate::grafter) needs to graft and ungraft
//! transient vertices during a single query (§3, §4.3).

use std::collections::HashSet;

use crate::geometry::{Point, Polyline};
use noisy_float::prelude::N64;

pub type VertexIndex = usize;
pub type EdgeIndex = usize;

/// A graph vertex: a point and the (ordered) indices of incident edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub pt: Point,
    pub edges: Vec<EdgeIndex>,
}

/// A graph edge: two distinct vertex indices and the polyline between them.
///
/// `coords` runs either `v1 -> v2` or `v2 -> v1`; callers recover the
/// orientation they need from which endpoint they're traversing from
/// (see [`Edge::oriented_from`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub v1: VertexIndex,
    pub v2: VertexIndex,
    pub coords: Polyline,
}

impl Edge {
    pub fn weight(&self) -> N64 {
        self.coords.length()
    }

    /// The endpoint of this edge that isn't `from`.
    pub fn other(&self, from: VertexIndex) -> VertexIndex {
        if from == self.v1 {
            self.v2
        } else {
            debug_assert_eq!(from, self.v2, "vertex {} is not an endpoint of this edge", from);
            self.v1
        }
    }

    /// `coords`, reoriented (reversed if necessary) so its first point is
    /// the point of vertex `from`.
    pub fn oriented_from(&self, from: VertexIndex, vertices: &[Vertex]) -> Polyline {
        let start = vertices[from].pt;
        if self.coords.first().eps_eq(&start, crate::geometry::DEFAULT_EPSILON) {
            self.coords.clone()
        } else {
            self.coords.reversed()
        }
    }
}

/// The planar graph itself (§3).
///
/// `inactive_edges` and `joined_vertices` exist purely so [`Grafter`](crate::grafter)
/// can splice in query endpoints and undo the splice exactly, leaving the
/// graph bit-identical to how it was before the query.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub inactive_edges: HashSet<EdgeIndex>,
    pub joined_vertices: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, edge: EdgeIndex) -> bool {
        edge < self.edges.len() && !self.inactive_edges.contains(&edge)
    }

    pub fn active_edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        (0..self.edges.len()).filter(move |e| self.is_active(*e))
    }

    /// Appends a vertex and returns its index. Used both by the Builder (for
    /// permanent vertices) and the Grafter (for transient ones).
    pub fn push_vertex(&mut self, pt: Point) -> VertexIndex {
        let idx = self.vertices.len();
        self.vertices.push(Vertex { pt, edges: Vec::new() });
        idx
    }

    /// Appends an edge, registering it in both endpoints' edge lists, and
    /// returns its index.
    ///
    /// A self-loop (`v1 == v2`, e.g. a closed ring traced as a single input
    /// polyline) is registered twice in that vertex's edge list, once per
    /// side of the loop — [`Grafter::join`](crate::grafter::Grafter::join)
    /// relies on there being two distinct occurrences to retarget when it
    /// splits such an edge.
    pub fn push_edge(&mut self, v1: VertexIndex, v2: VertexIndex, coords: Polyline) -> EdgeIndex {
        let idx = self.edges.len();
        self.edges.push(Edge { v1, v2, coords });
        self.vertices[v1].edges.push(idx);
        self.vertices[v2].edges.push(idx);
        idx
    }

    #[cfg(test)]
    pub fn check_invariants(&self) {
        for i in self.active_edges() {
            let e = &self.edges[i];
            assert!(e.v1 < self.vertices.len() && e.v2 < self.vertices.len());
            let eps = crate::geometry::DEFAULT_EPSILON;
            let (p1, p2) = (self.vertices[e.v1].pt, self.vertices[e.v2].pt);
            let matches_forward = e.coords.first().eps_eq(&p1, eps) && e.coords.last().eps_eq(&p2, eps);
            let matches_backward = e.coords.first().eps_eq(&p2, eps) && e.coords.last().eps_eq(&p1, eps);
            assert!(matches_forward || matches_backward, "edge {} endpoints don't match its vertices", i);
        }
        for (k, v) in self.vertices.iter().enumerate() {
            for &i in &v.edges {
                assert!(self.is_active(i), "vertex {} references inactive edge {}", k, i);
                let e = &self.edges[i];
                assert!(e.v1 == k || e.v2 == k, "edge {} does not reference vertex {}", i, k);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn push_edge_registers_both_endpoints() {
        let mut g = Graph::new();
        let a = g.push_vertex(Point::new(0.0, 0.0));
        let b = g.push_vertex(Point::new(1.0, 0.0));
        let e = g.push_edge(a, b, Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]));
        assert_eq!(g.vertices[a].edges, vec![e]);
        assert_eq!(g.vertices[b].edges, vec![e]);
        g.check_invariants();
    }

    #[test]
    fn self_loop_registers_twice() {
        let mut g = Graph::new();
        let a = g.push_vertex(Point::new(0.0, 0.0));
        let e = g.push_edge(a, a, Polyline::new(vec![Point::new(0.0, 0.0), Point::new(0.0, 0.0)]));
        assert_eq!(g.vertices[a].edges, vec![e, e]);
    }
}
