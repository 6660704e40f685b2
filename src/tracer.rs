//! The facade (§4.5): orchestrates lazy graph construction from feature
//! sources, answers path queries, applies the optional lateral offset, and
//! invalidates its cached graph on upstream mutation signals.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::builder::Builder;
use crate::error::TraceError;
use crate::geometry::{DefaultGeometryEngine, GeometryEngine, OffsetParameters, Point, Polyline};
use crate::grafter::Grafter;
use crate::graph::Graph;
use crate::locator::Locator;
use crate::pathfinder::PathFinder;
use crate::source::{ChangeSignal, FeatureSource};

/// An axis-aligned bounding rectangle, used to restrict which features are
/// pulled from a layer (§4.5 step 1).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    fn intersects_polyline(&self, line: &Polyline) -> bool {
        line.0.iter().any(|p| self.contains(*p))
    }
}

/// Placeholder for a renderer's visibility predicate (§4.5 step 1). Real
/// render contexts are out of scope (§1); a consumer supplies a closure.
pub type RenderContext = Rc<dyn Fn(u64) -> bool>;

/// Result of `find_shortest_path`: a possibly-empty polyline and the
/// taxonomy-valued outcome from §7.
pub struct PathResult {
    pub polyline: Polyline,
    pub error: TraceError,
}

/// The serializable slice of the Tracer's configuration state (§9A):
/// everything that isn't a runtime collaborator (layers, the render
/// context closure). Deserializable from JSON/YAML, in the teacher's
/// `meta::Parameters` manner, for the demo binary; library consumers can
/// just as well build one programmatically and hand it to [`Tracer::configure`].
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TracerConfig {
    pub destination_crs: Option<String>,
    pub extent: Option<Extent>,
    #[serde(default)]
    pub max_features: usize,
    #[serde(default)]
    pub offset: OffsetParameters,
}

/// The tracing engine's public facade.
pub struct Tracer {
    layers: Rc<RefCell<Vec<Rc<dyn FeatureSource>>>>,
    layer_observers: Vec<Rc<dyn Fn(ChangeSignal)>>,
    extent: Option<Extent>,
    render_context: Option<RenderContext>,
    snap_hidden_features: bool,
    max_features: usize,
    offset: OffsetParameters,
    engine: Box<dyn GeometryEngine>,

    graph: RefCell<Option<Graph>>,
    invalidated: Rc<Cell<bool>>,
    topology_problem: Cell<bool>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            layers: Rc::new(RefCell::new(Vec::new())),
            layer_observers: Vec::new(),
            extent: None,
            render_context: None,
            snap_hidden_features: false,
            max_features: 0,
            offset: OffsetParameters::default(),
            engine: Box::new(DefaultGeometryEngine::new()),
            graph: RefCell::new(None),
            invalidated: Rc::new(Cell::new(true)),
            topology_problem: Cell::new(false),
        }
    }

    /// Uses a caller-supplied geometry engine instead of the default
    /// `geo`/`geos`-backed one (e.g. [`crate::geometry::NaiveNoder`]).
    pub fn with_geometry_engine(mut self, engine: Box<dyn GeometryEngine>) -> Self {
        self.engine = engine;
        self
    }

    fn invalidate(&self) {
        self.invalidated.set(true);
        *self.graph.borrow_mut() = None;
        log::info!("graph invalidated");
    }

    /// Replaces the configured layer list, unsubscribing from the previous
    /// layers and subscribing to the new ones (§4.5). A layer's own
    /// `Destroyed` signal additionally removes it from the configured list.
    pub fn set_layers(&mut self, layers: Vec<Rc<dyn FeatureSource>>) {
        for (layer, observer) in self.layers.borrow().iter().zip(self.layer_observers.iter()) {
            layer.unsubscribe(observer);
        }
        self.layer_observers.clear();

        let invalidated = self.invalidated.clone();
        for layer in &layers {
            let invalidated = invalidated.clone();
            let shared_layers = self.layers.clone();
            let target = layer.clone();
            let observer: Rc<dyn Fn(ChangeSignal)> = Rc::new(move |signal| {
                log::debug!("layer signal received: {:?}", signal);
                invalidated.set(true);
                if signal == ChangeSignal::Destroyed {
                    shared_layers.borrow_mut().retain(|l| !Rc::ptr_eq(l, &target));
                    log::info!("layer destroyed, removed from configured list");
                }
            });
            layer.subscribe(observer.clone());
            self.layer_observers.push(observer);
        }
        *self.layers.borrow_mut() = layers;
        self.invalidate();
    }

    pub fn set_destination_crs(&mut self, _crs: &str) {
        // CRS transforms are an external collaborator (§1); the facade only
        // needs to know that changing the destination invalidates the graph.
        self.invalidate();
    }

    pub fn set_extent(&mut self, extent: Option<Extent>) {
        self.extent = extent;
        self.invalidate();
    }

    pub fn set_render_context(&mut self, ctx: Option<RenderContext>, snap_hidden_features: bool) {
        self.render_context = ctx;
        self.snap_hidden_features = snap_hidden_features;
        self.invalidate();
    }

    pub fn set_max_features(&mut self, max: usize) {
        self.max_features = max;
        self.invalidate();
    }

    /// Mutates offset state only; does not invalidate the graph.
    pub fn set_offset(&mut self, distance: f64) {
        self.offset.distance = distance;
    }

    /// Mutates offset state only; does not invalidate the graph.
    pub fn set_offset_parameters(&mut self, params: OffsetParameters) {
        self.offset = params;
    }

    /// Applies a whole [`TracerConfig`] at once, via the same setters a
    /// caller would use individually.
    pub fn configure(&mut self, config: TracerConfig) {
        if let Some(crs) = &config.destination_crs {
            self.set_destination_crs(crs);
        }
        self.set_extent(config.extent);
        self.set_max_features(config.max_features);
        self.set_offset_parameters(config.offset);
    }

    pub fn has_topology_problem(&self) -> bool {
        self.topology_problem.get()
    }

    /// Ensures `self.graph` holds a built graph, (re)building it from the
    /// configured layers if it was invalidated. Returns `false` if
    /// construction aborted because the feature cap was exceeded.
    fn ensure_graph(&self) -> bool {
        if !self.invalidated.get() && self.graph.borrow().is_some() {
            return true;
        }

        let mut lines: Vec<Polyline> = Vec::new();
        let mut count = 0usize;
        for layer in self.layers.borrow().iter() {
            for feature in layer.features() {
                if let Some(ctx) = &self.render_context {
                    if !self.snap_hidden_features && !ctx(feature.id) {
                        continue;
                    }
                }
                // Cap is counted per feature, not per resulting polyline: a
                // single feature's geometry may segmentize/flatten into
                // several linestrings (e.g. a MultiLineString).
                let mut feature_lines: Vec<Polyline> = Vec::new();
                for raw in &feature.geometry {
                    if let Some(extent) = &self.extent {
                        if !extent.intersects_polyline(raw) {
                            continue;
                        }
                    }
                    feature_lines.push(self.engine.segmentize(raw));
                }
                if feature_lines.is_empty() {
                    continue;
                }
                count += 1;
                if self.max_features != 0 && count > self.max_features {
                    log::info!("graph construction aborted: feature cap ({}) reached", self.max_features);
                    return false;
                }
                lines.extend(feature_lines);
            }
        }

        self.topology_problem.set(false);
        let noded = match self.engine.node(&lines) {
            Ok(noded) => noded,
            Err(err) => {
                log::warn!("noding failed, continuing with un-noded linework: {}", err);
                self.topology_problem.set(true);
                lines
            }
        };

        let graph = Builder::build(&noded);
        *self.graph.borrow_mut() = Some(graph);
        self.invalidated.set(false);
        true
    }

    /// `true` iff `pt` snaps to an existing vertex or onto an active edge;
    /// never mutates the graph.
    pub fn is_point_snapped(&self, pt: Point) -> bool {
        if !self.ensure_graph() {
            return false;
        }
        let graph = self.graph.borrow();
        let graph = graph.as_ref().unwrap();
        Locator::point_to_vertex_default(graph, pt).is_some()
            || Locator::point_to_edge_default(graph, self.engine.as_ref(), pt).is_some()
    }

    /// Finds the shortest polyline path between `p1` and `p2` (§4.5).
    pub fn find_shortest_path(&self, p1: Point, p2: Point) -> PathResult {
        if !self.ensure_graph() {
            return PathResult { polyline: Polyline(Vec::new()), error: TraceError::TooManyFeatures };
        }

        let mut graph = self.graph.borrow_mut();
        let graph = graph.as_mut().unwrap();

        let v1 = match Grafter::point_in_graph(graph, self.engine.as_ref(), p1) {
            Some(v) => v,
            None => return PathResult { polyline: Polyline(Vec::new()), error: TraceError::PointOne },
        };
        let v2 = match Grafter::point_in_graph(graph, self.engine.as_ref(), p2) {
            Some(v) => v,
            None => {
                Grafter::revert(graph);
                return PathResult { polyline: Polyline(Vec::new()), error: TraceError::PointTwo };
            }
        };

        let mut path = PathFinder::shortest_path(graph, v1, v2);
        Grafter::revert(graph);

        if path.0.is_empty() {
            return PathResult { polyline: path, error: TraceError::NoPath };
        }

        if self.offset.distance != 0.0 {
            if let Some(offset_curve) = self.engine.offset_curve(&path, &self.offset) {
                path = orient_offset_curve(offset_curve, p1, p2);
            }
        }

        log::debug!("path found: length {}", path.length());
        PathResult { polyline: path, error: TraceError::None }
    }
}

/// Offset curves can come out of GEOS with either handedness depending on
/// the sign of the offset; reverse if the curve's endpoints are closer to
/// `(p2, p1)` than to `(p1, p2)` (§4.5 step 6).
fn orient_offset_curve(curve: Polyline, p1: Point, p2: Point) -> Polyline {
    let forward = curve.first().distance(&p1) + curve.last().distance(&p2);
    let backward = curve.first().distance(&p2) + curve.last().distance(&p1);
    if backward < forward {
        curve.reversed()
    } else {
        curve
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::{Feature, VectorLayer};

    fn poly(pts: &[(f64, f64)]) -> Polyline {
        Polyline::new(pts.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn layer_with(lines: Vec<Polyline>) -> Rc<VectorLayer> {
        Rc::new(VectorLayer::new(
            lines.into_iter().enumerate().map(|(i, geometry)| Feature { id: i as u64, geometry: vec![geometry] }).collect(),
        ))
    }

    #[test]
    fn straight_cross_scenario() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (5.0, 0.0)]), poly(&[(5.0, 0.0), (10.0, 0.0)]), poly(&[(5.0, -5.0), (5.0, 0.0)]), poly(&[(5.0, 0.0), (5.0, 5.0)])])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        assert_eq!(result.error, TraceError::None);
        assert_eq!(result.polyline.length(), noisy_float::prelude::n64(10.0));
    }

    #[test]
    fn midpoint_graft_scenario_restores_graph() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])])]);
        let result = tracer.find_shortest_path(Point::new(5.0, 0.0), Point::new(10.0, 5.0));
        assert_eq!(result.error, TraceError::None);
        assert_eq!(result.polyline.length(), noisy_float::prelude::n64(10.0));
        let graph = tracer.graph.borrow();
        let graph = graph.as_ref().unwrap();
        assert_eq!(graph.vertices.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.joined_vertices, 0);
    }

    #[test]
    fn disconnected_scenario_reports_no_path() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (1.0, 0.0)]), poly(&[(5.0, 5.0), (6.0, 5.0)])])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(6.0, 5.0));
        assert_eq!(result.error, TraceError::NoPath);
        assert!(result.polyline.0.is_empty());
    }

    #[test]
    fn off_graph_endpoint_scenario_reports_point_one() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 5.0), Point::new(10.0, 0.0));
        assert_eq!(result.error, TraceError::PointOne);
    }

    #[test]
    fn idempotent_back_to_back_queries() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])])]);
        let a = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let b = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(a.polyline, b.polyline);
    }

    #[test]
    fn layer_mutation_invalidates_graph() {
        let mut tracer = Tracer::new();
        let layer = layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])]);
        tracer.set_layers(vec![layer.clone()]);
        assert!(tracer.ensure_graph());
        assert!(!tracer.invalidated.get());
        layer.add_feature(Feature { id: 99, geometry: vec![poly(&[(20.0, 20.0), (21.0, 20.0)])] });
        assert!(tracer.invalidated.get());
    }

    #[test]
    fn configure_applies_yaml_deserialized_settings() {
        let yaml = "max_features: 1\noffset:\n  distance: 0.0\n  quad_segments: 8\n  join_style: Round\n  miter_limit: 2.0\n";
        let config: TracerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_features, 1);
        let mut tracer = Tracer::new();
        tracer.configure(config);
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (1.0, 0.0)]), poly(&[(2.0, 0.0), (3.0, 0.0)])])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(3.0, 0.0));
        assert_eq!(result.error, TraceError::TooManyFeatures);
    }

    #[test]
    fn too_many_features_is_reported() {
        let mut tracer = Tracer::new();
        tracer.set_max_features(1);
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (1.0, 0.0)]), poly(&[(2.0, 0.0), (3.0, 0.0)])])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(3.0, 0.0));
        assert_eq!(result.error, TraceError::TooManyFeatures);
    }

    #[test]
    fn reversal_is_symmetric_without_offset() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])])]);
        let forward = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let backward = tracer.find_shortest_path(Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        assert_eq!(forward.error, TraceError::None);
        assert_eq!(backward.error, TraceError::None);
        assert_eq!(forward.polyline.reversed(), backward.polyline);
    }

    #[test]
    fn detour_scenario_prefers_the_direct_edge() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![
            poly(&[(0.0, 0.0), (10.0, 0.0)]),
            poly(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]),
        ])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(result.error, TraceError::None);
        assert_eq!(result.polyline.length(), noisy_float::prelude::n64(10.0));
    }

    #[test]
    fn is_point_snapped_recognizes_vertices_and_edge_points_only() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])])]);
        assert!(tracer.is_point_snapped(Point::new(0.0, 0.0)));
        assert!(tracer.is_point_snapped(Point::new(5.0, 0.0)));
        assert!(!tracer.is_point_snapped(Point::new(5.0, 5.0)));
    }

    #[test]
    fn is_point_snapped_does_not_mutate_the_graph() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])])]);
        assert!(tracer.is_point_snapped(Point::new(5.0, 0.0)));
        let graph = tracer.graph.borrow();
        let graph = graph.as_ref().unwrap();
        assert_eq!(graph.vertices.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.joined_vertices, 0);
    }

    #[test]
    fn offset_scenario_shifts_path_laterally() {
        let mut tracer = Tracer::new();
        tracer.set_layers(vec![layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])])]);
        tracer.set_offset(1.0);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(result.error, TraceError::None);
        for pt in &result.polyline.0 {
            assert!((pt.y.abs() - 1.0).abs() < 1e-6);
        }
        let start = result.polyline.first();
        let end = result.polyline.last();
        assert!(start.distance(&Point::new(0.0, 0.0)) < end.distance(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn naive_noder_lets_unnoded_crossing_lines_connect() {
        let mut tracer = Tracer::new().with_geometry_engine(Box::new(crate::geometry::NaiveNoder));
        tracer.set_layers(vec![layer_with(vec![
            poly(&[(0.0, 0.0), (10.0, 0.0)]),
            poly(&[(5.0, -5.0), (5.0, 5.0)]),
        ])]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        assert_eq!(result.error, TraceError::None);
        assert_eq!(result.polyline.length(), noisy_float::prelude::n64(10.0));
        assert!(!tracer.has_topology_problem());
    }

    #[test]
    fn feature_cap_counts_features_not_linestrings() {
        // Two features, each a multi-part (two-linestring) geometry: a cap
        // of 2 must accept both features, not abort after the first one's
        // second linestring.
        let layer = VectorLayer::new(vec![
            Feature { id: 0, geometry: vec![poly(&[(0.0, 0.0), (1.0, 0.0)]), poly(&[(0.0, 1.0), (1.0, 1.0)])] },
            Feature { id: 1, geometry: vec![poly(&[(2.0, 0.0), (3.0, 0.0)]), poly(&[(2.0, 1.0), (3.0, 1.0)])] },
        ]);
        let mut tracer = Tracer::new();
        tracer.set_max_features(2);
        tracer.set_layers(vec![Rc::new(layer)]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert_eq!(result.error, TraceError::None);
        // A third feature tips the same cap over.
        let layer = VectorLayer::new(vec![
            Feature { id: 0, geometry: vec![poly(&[(0.0, 0.0), (1.0, 0.0)]), poly(&[(0.0, 1.0), (1.0, 1.0)])] },
            Feature { id: 1, geometry: vec![poly(&[(2.0, 0.0), (3.0, 0.0)]), poly(&[(2.0, 1.0), (3.0, 1.0)])] },
            Feature { id: 2, geometry: vec![poly(&[(4.0, 0.0), (5.0, 0.0)])] },
        ]);
        let mut tracer = Tracer::new();
        tracer.set_max_features(2);
        tracer.set_layers(vec![Rc::new(layer)]);
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert_eq!(result.error, TraceError::TooManyFeatures);
    }

    #[test]
    fn destroyed_layer_is_removed_from_the_configured_list() {
        let mut tracer = Tracer::new();
        let layer = layer_with(vec![poly(&[(0.0, 0.0), (10.0, 0.0)])]);
        tracer.set_layers(vec![layer.clone() as Rc<dyn FeatureSource>]);
        assert!(tracer.ensure_graph());
        assert_eq!(tracer.layers.borrow().len(), 1);

        layer.destroy();
        assert_eq!(tracer.layers.borrow().len(), 0);
        assert!(tracer.invalidated.get());

        // The graph rebuilds empty now that its only layer is gone.
        assert!(tracer.ensure_graph());
        let result = tracer.find_shortest_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(result.error, TraceError::PointOne);
    }
}
