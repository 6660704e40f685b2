//! Dijkstra over a [`Graph`], producing a stitched polyline between two
//! vertices (§4.4). The relaxation loop follows the same heap-with-a-negated-priority
//! shape as the teacher repository's generic `Graph::pathfind`, specialized
//! here to the index-addressed, polyline-weighted graph this crate builds.

use noisy_float::prelude::{n64, N64};
use priority_queue::PriorityQueue;

use crate::geometry::Polyline;
use crate::graph::{EdgeIndex, Graph, VertexIndex};

pub struct PathFinder;

impl PathFinder {
    /// Shortest polyline path from vertex `s` to vertex `t`, or an empty
    /// polyline if `t` is unreachable.
    pub fn shortest_path(graph: &Graph, s: VertexIndex, t: VertexIndex) -> Polyline {
        let n = graph.vertices.len();
        let mut dist: Vec<N64> = vec![N64::infinity(); n];
        let mut finalized = vec![false; n];
        let mut pred: Vec<Option<EdgeIndex>> = vec![None; n];
        dist[s] = n64(0.0);

        let mut queue: PriorityQueue<VertexIndex, N64> = PriorityQueue::new();
        queue.push(s, n64(0.0));
        let mut reached = false;

        while let Some((u, neg_d)) = queue.pop() {
            let d = -neg_d;
            if u == t {
                reached = true;
                break;
            }
            if finalized[u] {
                continue;
            }
            finalized[u] = true;
            for &e in &graph.vertices[u].edges {
                if !graph.is_active(e) {
                    continue;
                }
                let edge = &graph.edges[e];
                let v = edge.other(u);
                if finalized[v] {
                    continue;
                }
                let cand = d + edge.weight();
                if cand < dist[v] {
                    dist[v] = cand;
                    pred[v] = Some(e);
                    queue.push(v, -cand);
                }
            }
        }

        if !reached {
            log::debug!("no path between vertex {} and vertex {}", s, t);
            return Polyline(Vec::new());
        }

        reconstruct(graph, s, t, &pred)
    }
}

fn reconstruct(graph: &Graph, s: VertexIndex, t: VertexIndex, pred: &[Option<EdgeIndex>]) -> Polyline {
    let mut points: Vec<crate::geometry::Point> = Vec::new();
    let mut u = t;
    while let Some(e) = pred[u] {
        let edge = &graph.edges[e];
        let v = edge.other(u);
        let segment = edge.oriented_from(v, &graph.vertices);
        let mut pts = segment.0;
        // Drop the point shared with what's already been prepended.
        if !points.is_empty() {
            pts.pop();
        }
        pts.extend(points);
        points = pts;
        u = v;
    }
    if points.is_empty() {
        // s == t: the only way `pred[t]` can be unset while `t` was reached
        // is that the search never left the start vertex. Represent the
        // degenerate path as a single repeated point.
        debug_assert_eq!(s, t);
        let pt = graph.vertices[s].pt;
        return Polyline(vec![pt, pt]);
    }
    Polyline(points)
}
