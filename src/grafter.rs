//! Temporarily splices a query point into the graph as a new vertex by
//! splitting the edge it lies on (§4.3). Every `join` during a query is
//! undone by a matching `revert` before the query returns.

use crate::geometry::{GeometryEngine, Point, DEFAULT_EPSILON};
use crate::graph::{EdgeIndex, Graph, VertexIndex};
use crate::locator::Locator;

pub struct Grafter;

impl Grafter {
    /// Splits the active edge under `pt` (if any) into two transient edges
    /// joined by a new transient vertex at `pt`, and returns that vertex's
    /// index.
    pub fn join(graph: &mut Graph, engine: &dyn GeometryEngine, pt: Point) -> Option<VertexIndex> {
        let hit = Locator::point_to_edge(graph, engine, pt, DEFAULT_EPSILON)?;
        let edge_idx = hit.edge;
        let (a, b, coords) = {
            let e = &graph.edges[edge_idx];
            (e.v1, e.v2, e.coords.clone())
        };
        let (before, after) = engine.split(&coords, hit.point, hit.vertex_after);

        let n = graph.vertices.len();
        let m = graph.edges.len();
        graph.vertices.push(crate::graph::Vertex { pt: hit.point, edges: vec![m, m + 1] });
        graph.edges.push(crate::graph::Edge { v1: a, v2: n, coords: before });
        graph.edges.push(crate::graph::Edge { v1: n, v2: b, coords: after });

        replace_edge_ref(graph, a, edge_idx, m);
        replace_edge_ref(graph, b, edge_idx, m + 1);

        graph.inactive_edges.insert(edge_idx);
        graph.joined_vertices += 1;
        log::trace!("grafted transient vertex {} splitting edge {}", n, edge_idx);
        Some(n)
    }

    /// Returns the existing vertex at `pt` if there is one, otherwise grafts
    /// a new transient vertex there.
    pub fn point_in_graph(graph: &mut Graph, engine: &dyn GeometryEngine, pt: Point) -> Option<VertexIndex> {
        Locator::point_to_vertex(graph, pt, DEFAULT_EPSILON).or_else(|| Self::join(graph, engine, pt))
    }

    /// Undoes every `join` performed since the last `revert`, restoring the
    /// graph to bit-identical semantics.
    pub fn revert(graph: &mut Graph) {
        if graph.joined_vertices == 0 {
            debug_assert!(graph.inactive_edges.is_empty());
            return;
        }
        let new_vertex_len = graph.vertices.len() - graph.joined_vertices;
        let new_edge_len = graph.edges.len() - 2 * graph.joined_vertices;
        graph.vertices.truncate(new_vertex_len);
        graph.edges.truncate(new_edge_len);

        for i in std::mem::take(&mut graph.inactive_edges) {
            if i >= graph.edges.len() {
                continue;
            }
            let (a, b) = (graph.edges[i].v1, graph.edges[i].v2);
            prune_stale_refs(graph, a, new_edge_len);
            prune_stale_refs(graph, b, new_edge_len);
            // Mirror Graph::push_edge: a self-loop (a == b) is reinstated
            // twice, once per side, the same way it was originally registered.
            graph.vertices[a].edges.push(i);
            graph.vertices[b].edges.push(i);
        }
        graph.joined_vertices = 0;
        log::trace!("reverted graft: back to {} vertices, {} edges", graph.vertices.len(), graph.edges.len());
    }
}

fn replace_edge_ref(graph: &mut Graph, vertex: VertexIndex, old: EdgeIndex, new: EdgeIndex) {
    if let Some(slot) = graph.vertices[vertex].edges.iter_mut().find(|e| **e == old) {
        *slot = new;
    }
}

/// Drops edge references that point past the truncated edge array (i.e. the
/// transient edges that `revert` just discarded).
fn prune_stale_refs(graph: &mut Graph, vertex: VertexIndex, edge_len: usize) {
    graph.vertices[vertex].edges.retain(|&e| e < edge_len);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::builder::Builder;
    use crate::geometry::{DefaultGeometryEngine, Polyline};

    fn poly(pts: &[(f64, f64)]) -> Polyline {
        Polyline::new(pts.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn join_splits_edge_and_revert_restores_graph() {
        let mut g = Builder::build(&[poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])]);
        let before = g.clone();
        let engine = DefaultGeometryEngine::new();

        let v1 = Grafter::point_in_graph(&mut g, &engine, Point::new(5.0, 0.0)).unwrap();
        assert_eq!(v1, 2);
        assert_eq!(g.vertices.len(), 3);
        assert_eq!(g.edges.len(), 3);
        assert!(g.inactive_edges.contains(&0));
        g.check_invariants();

        let v2 = Grafter::point_in_graph(&mut g, &engine, Point::new(10.0, 5.0)).unwrap();
        assert_eq!(v2, 3);
        assert_eq!(g.vertices.len(), 4);
        assert_eq!(g.edges.len(), 5);
        g.check_invariants();

        Grafter::revert(&mut g);
        assert_eq!(g.vertices.len(), before.vertices.len());
        assert_eq!(g.edges.len(), before.edges.len());
        assert!(g.inactive_edges.is_empty());
        assert_eq!(g.joined_vertices, 0);
        g.check_invariants();
    }

    #[test]
    fn point_in_graph_reuses_existing_vertex() {
        let mut g = Builder::build(&[poly(&[(0.0, 0.0), (10.0, 0.0)])]);
        let engine = DefaultGeometryEngine::new();
        let v = Grafter::point_in_graph(&mut g, &engine, Point::new(0.0, 0.0)).unwrap();
        assert_eq!(v, 0);
        assert_eq!(g.joined_vertices, 0);
    }

    #[test]
    fn join_off_graph_point_fails() {
        let mut g = Builder::build(&[poly(&[(0.0, 0.0), (10.0, 0.0)])]);
        let engine = DefaultGeometryEngine::new();
        assert!(Grafter::join(&mut g, &engine, Point::new(0.0, 5.0)).is_none());
    }

    #[test]
    fn splitting_a_closed_ring_keeps_both_new_halves_adjacent_to_the_ring_vertex() {
        // A polygon boundary traced as a single polyline is a self-loop
        // edge: its single vertex is both endpoints. Splitting it must leave
        // that vertex adjacent to both halves, not just one.
        let mut g = Builder::build(&[poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)])]);
        assert_eq!(g.vertices.len(), 1);
        assert_eq!(g.edges.len(), 1);
        let engine = DefaultGeometryEngine::new();

        let n = Grafter::join(&mut g, &engine, Point::new(10.0, 0.0)).unwrap();
        assert_eq!(g.vertices[0].edges.len(), 2);
        assert!(g.vertices[0].edges.contains(&1));
        assert!(g.vertices[0].edges.contains(&2));
        g.check_invariants();

        // Both halves of the split ring are reachable from the ring vertex.
        let path = crate::pathfinder::PathFinder::shortest_path(&g, 0, n);
        assert!(!path.0.is_empty());
        assert_eq!(path.length(), noisy_float::prelude::n64(10.0));

        Grafter::revert(&mut g);
        assert_eq!(g.vertices[0].edges, vec![0, 0]);
        g.check_invariants();
    }
}
