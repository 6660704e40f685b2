//! Planar primitives and the external geometry-engine boundary.
//!
//! `Point`/`Polyline` are the plain data types the rest of the crate is built
//! on. `GeometryEngine` is the trait boundary to the "geometry library" the
//! core treats as an external collaborator (segmentization, closest-point,
//! split, offset curve, noding); `DefaultGeometryEngine` is the `geo`/`geos`
//! backed implementation a consumer gets for free.

use geo::EuclideanLength;
use noisy_float::prelude::{n64, N64};

/// Default tolerance for ε-equality and point-to-edge snapping.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// A point in the plane.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Exact equality, as used by the Builder's endpoint deduplication.
    pub fn exact_eq(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// ε-equality: both coordinates within `eps` of each other.
    pub fn eps_eq(&self, other: &Point, eps: f64) -> bool {
        (self.x - other.x).abs() < eps && (self.y - other.y).abs() < eps
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(p: Point) -> Self {
        geo::Point::new(p.x, p.y)
    }
}

impl From<geo::Coord<f64>> for Point {
    fn from(c: geo::Coord<f64>) -> Self {
        Point::new(c.x, c.y)
    }
}

/// An ordered sequence of at least 2 points, interpreted as a linear
/// interpolation between consecutive points.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline(pub Vec<Point>);

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        debug_assert!(points.len() >= 2, "a polyline needs at least 2 points");
        Self(points)
    }

    pub fn first(&self) -> Point {
        self.0[0]
    }

    pub fn last(&self) -> Point {
        self.0[self.0.len() - 1]
    }

    pub fn len_points(&self) -> usize {
        self.0.len()
    }

    /// Sum of Euclidean distances between consecutive points.
    pub fn length(&self) -> N64 {
        n64(geo::LineString::from(self).euclidean_length())
    }

    /// A new polyline with point order reversed. Length is preserved.
    pub fn reversed(&self) -> Polyline {
        let mut pts = self.0.clone();
        pts.reverse();
        Polyline(pts)
    }
}

impl From<&Polyline> for geo::LineString<f64> {
    fn from(p: &Polyline) -> Self {
        geo::LineString::from(p.0.iter().map(|pt| (pt.x, pt.y)).collect::<Vec<_>>())
    }
}

impl From<geo::LineString<f64>> for Polyline {
    fn from(ls: geo::LineString<f64>) -> Self {
        Polyline(ls.coords().map(|c| Point::new(c.x, c.y)).collect())
    }
}

/// Join style for the lateral offset-curve post-process, mirrored one-to-one
/// on GEOS's `OffsetCurveBuilder` join styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JoinStyle {
    Miter,
    Bevel,
    Round,
}

/// Parameters for the lateral offset-curve post-process (§4.5, §6).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffsetParameters {
    /// Signed offset distance; 0 disables offsetting.
    pub distance: f64,
    pub quad_segments: i32,
    pub join_style: JoinStyle,
    pub miter_limit: f64,
}

impl Default for OffsetParameters {
    fn default() -> Self {
        Self {
            distance: 0.0,
            quad_segments: 8,
            join_style: JoinStyle::Round,
            miter_limit: 2.0,
        }
    }
}

/// Result of projecting a point onto a polyline (§6 `closest_segment`).
#[derive(Clone, Copy, Debug)]
pub struct ClosestSegment {
    pub closest_point: Point,
    /// Index, within the polyline's points, of the vertex immediately
    /// following the closest point.
    pub vertex_after: usize,
    pub distance: f64,
}

/// The "geometry library" the core treats as an external collaborator:
/// segmentization, closest-point projection, splitting, offset curves and
/// (optionally) noding. Consumers may supply their own implementation; the
/// crate ships [`DefaultGeometryEngine`], backed by `geo` and `geos`.
pub trait GeometryEngine {
    /// Expand curved segments of a raw ring of coordinates into a flat
    /// polyline approximation. The default engine treats input as already
    /// linear and returns it unchanged, since this crate has no curved
    /// geometry representation of its own (curve handling belongs to the
    /// upstream feature source, out of scope per §1).
    fn segmentize(&self, polyline: &Polyline) -> Polyline {
        polyline.clone()
    }

    /// Closest point on `polyline` to `pt`, with the index of the polyline
    /// vertex immediately following the hit, and the perpendicular distance.
    fn closest_segment(&self, polyline: &Polyline, pt: Point) -> ClosestSegment;

    /// Split `polyline` at `pt`, given the `vertex_after` index returned by
    /// `closest_segment`. Both halves share `pt` as their common endpoint.
    fn split(&self, polyline: &Polyline, pt: Point, vertex_after: usize) -> (Polyline, Polyline);

    /// Lateral offset curve, or `None` if the underlying library could not
    /// produce a polyline (e.g. degenerate input).
    fn offset_curve(&self, polyline: &Polyline, params: &OffsetParameters) -> Option<Polyline>;

    /// Node a collection of polylines against each other, splitting at
    /// mutual intersections so only endpoints coincide. Implementations may
    /// fail; the core treats that as a topology warning, not a hard error.
    fn node(&self, lines: &[Polyline]) -> Result<Vec<Polyline>, anyhow::Error> {
        Ok(lines.to_vec())
    }
}

/// `geo`/`geos`-backed implementation of [`GeometryEngine`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultGeometryEngine;

impl DefaultGeometryEngine {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryEngine for DefaultGeometryEngine {
    fn closest_segment(&self, polyline: &Polyline, pt: Point) -> ClosestSegment {
        let pts = &polyline.0;
        let mut best = ClosestSegment {
            closest_point: pts[0],
            vertex_after: 1,
            distance: pt.distance(&pts[0]),
        };
        for i in 0..pts.len() - 1 {
            let (a, b) = (pts[i], pts[i + 1]);
            let candidate = closest_point_on_segment(a, b, pt);
            let d = pt.distance(&candidate);
            if d < best.distance {
                best = ClosestSegment {
                    closest_point: candidate,
                    vertex_after: i + 1,
                    distance: d,
                };
            }
        }
        best
    }

    fn split(&self, polyline: &Polyline, pt: Point, vertex_after: usize) -> (Polyline, Polyline) {
        let pts = &polyline.0;
        let mut before: Vec<Point> = pts[..vertex_after].to_vec();
        if before.last().map_or(true, |p| !p.exact_eq(&pt)) {
            before.push(pt);
        }
        let mut after: Vec<Point> = Vec::with_capacity(pts.len() - vertex_after + 1);
        after.push(pt);
        after.extend_from_slice(&pts[vertex_after..]);
        (Polyline(before), Polyline(after))
    }

    fn offset_curve(&self, polyline: &Polyline, params: &OffsetParameters) -> Option<Polyline> {
        use geos::{Geom, Geometry};
        let ls: geo::LineString<f64> = polyline.into();
        let geos_geom: Geometry = Geometry::try_from(&ls).ok()?;
        let join = match params.join_style {
            JoinStyle::Round => geos::JoinStyle::Round,
            JoinStyle::Miter => geos::JoinStyle::Mitre,
            JoinStyle::Bevel => geos::JoinStyle::Bevel,
        };
        let offset = geos_geom
            .offset_curve(
                params.distance,
                params.quad_segments,
                join,
                params.miter_limit,
            )
            .ok()?;
        let back: geo::Geometry<f64> = (&offset).try_into().ok()?;
        match back {
            geo::Geometry::LineString(ls) if ls.0.len() >= 2 => Some(ls.into()),
            _ => None,
        }
    }

    fn node(&self, lines: &[Polyline]) -> Result<Vec<Polyline>, anyhow::Error> {
        NaiveNoder.node(lines)
    }
}

/// A noder that doesn't touch a geometry library at all: it finds
/// segment-segment intersections directly and splits both polylines there.
/// Offered as an alternative to [`DefaultGeometryEngine::node`] for callers
/// who would rather not pull in `geos` for this one step.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaiveNoder;

impl GeometryEngine for NaiveNoder {
    fn closest_segment(&self, polyline: &Polyline, pt: Point) -> ClosestSegment {
        DefaultGeometryEngine.closest_segment(polyline, pt)
    }

    fn split(&self, polyline: &Polyline, pt: Point, vertex_after: usize) -> (Polyline, Polyline) {
        DefaultGeometryEngine.split(polyline, pt, vertex_after)
    }

    fn offset_curve(&self, polyline: &Polyline, params: &OffsetParameters) -> Option<Polyline> {
        DefaultGeometryEngine.offset_curve(polyline, params)
    }

    fn node(&self, lines: &[Polyline]) -> Result<Vec<Polyline>, anyhow::Error> {
        let mut segments: Vec<(usize, usize, Point, Point)> = Vec::new();
        for (li, line) in lines.iter().enumerate() {
            for w in line.0.windows(2) {
                segments.push((li, segments.len(), w[0], w[1]));
            }
        }
        // Collect split points per input line, keyed by line index.
        let mut cuts: Vec<Vec<Point>> = lines.iter().map(|l| l.0.clone()).collect();
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (li, _, a1, a2) = segments[i];
                let (lj, _, b1, b2) = segments[j];
                if li == lj {
                    continue;
                }
                if let Some(ix) = segment_intersection(a1, a2, b1, b2) {
                    cuts[li].push(ix);
                    cuts[lj].push(ix);
                }
            }
        }
        let noded = lines
            .iter()
            .enumerate()
            .map(|(i, line)| rebuild_with_cuts(line, &cuts[i]))
            .collect();
        Ok(noded)
    }
}

fn rebuild_with_cuts(line: &Polyline, extra: &[Point]) -> Polyline {
    // Only the original endpoints and interior cut points that lie exactly
    // on a segment are retained, in order along the line; a naive noder need
    // not be exhaustive, it only has to improve on doing nothing.
    let mut pts = line.0.clone();
    for cut in extra {
        if pts.iter().any(|p| p.exact_eq(cut)) {
            continue;
        }
        for i in 0..pts.len() - 1 {
            let on_segment = point_on_segment(pts[i], pts[i + 1], *cut);
            if on_segment {
                pts.insert(i + 1, *cut);
                break;
            }
        }
    }
    Polyline(pts)
}

fn point_on_segment(a: Point, b: Point, p: Point) -> bool {
    let closest = closest_point_on_segment(a, b, p);
    closest.distance(&p) < DEFAULT_EPSILON
}

fn segment_intersection(p1: Point, p2: Point, p3: Point, p4: Point) -> Option<Point> {
    let (x1, y1, x2, y2) = (p1.x, p1.y, p2.x, p2.y);
    let (x3, y3, x4, y4) = (p3.x, p3.y, p4.x, p4.y);
    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
    let u = ((x1 - x3) * (y1 - y2) - (y1 - y3) * (x1 - x2)) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1)))
    } else {
        None
    }
}

/// Closest point to `p` on the segment `a`-`b`.
fn closest_point_on_segment(a: Point, b: Point, p: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn polyline_length_sums_segments() {
        let p = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(p.length(), n64(7.0));
    }

    #[test]
    fn reversal_preserves_length() {
        let p = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(p.length(), p.reversed().length());
        assert_eq!(p.reversed().first(), p.last());
    }

    #[test]
    fn eps_eq_respects_tolerance() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(1.0 + 1e-9, 1.0 - 1e-9);
        assert!(a.eps_eq(&b, DEFAULT_EPSILON));
        assert!(!a.exact_eq(&b));
    }

    #[test]
    fn closest_segment_finds_perpendicular_hit() {
        let poly = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
        let hit = DefaultGeometryEngine.closest_segment(&poly, Point::new(5.0, 0.0));
        assert!(hit.distance < DEFAULT_EPSILON);
        assert_eq!(hit.vertex_after, 1);
    }

    #[test]
    fn split_preserves_interior_vertices() {
        let poly = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]);
        let hit = DefaultGeometryEngine.closest_segment(&poly, Point::new(10.0, 5.0));
        let (before, after) = DefaultGeometryEngine.split(&poly, hit.closest_point, hit.vertex_after);
        assert_eq!(before.0, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.0)]);
        assert_eq!(after.0, vec![Point::new(10.0, 5.0), Point::new(10.0, 10.0)]);
    }

    #[test]
    fn naive_noder_splits_crossing_lines() {
        let a = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let b = Polyline::new(vec![Point::new(5.0, -5.0), Point::new(5.0, 5.0)]);
        let noded = NaiveNoder.node(&[a, b]).unwrap();
        assert!(noded[0].0.iter().any(|p| p.eps_eq(&Point::new(5.0, 0.0), DEFAULT_EPSILON)));
        assert!(noded[1].0.iter().any(|p| p.eps_eq(&Point::new(5.0, 0.0), DEFAULT_EPSILON)));
    }
}
