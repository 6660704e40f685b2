//! A geometric tracing engine: given a collection of vector line/polygon
//! features, builds a planar graph whose edges are polylines and whose
//! vertices are the polyline endpoints, then answers "shortest polyline
//! path between two arbitrary planar points" queries, grafting query
//! endpoints into the graph only for the duration of a single query.
//!
//! The crate is organized leaves-first:
//! - [`geometry`]: planar primitives and the external geometry-engine boundary.
//! - [`graph`]: the in-memory planar graph.
//! - [`builder`]: builds a [`graph::Graph`] from noded linework.
//! - [`locator`]: maps a point to a vertex or a point on an edge.
//! - [`grafter`]: temporary edge-splitting graph surgery, and its undo.
//! - [`pathfinder`]: Dijkstra over the graph.
//! - [`source`]: the vector-feature data source boundary.
//! - [`tracer`]: the public facade tying everything together.

pub mod builder;
pub mod error;
pub mod geometry;
pub mod grafter;
pub mod graph;
pub mod locator;
pub mod pathfinder;
pub mod source;
pub mod tracer;

pub use error::{TraceError, TracerError};
pub use geometry::{JoinStyle, OffsetParameters, Point, Polyline};
pub use source::{ChangeSignal, Feature, FeatureSource, VectorLayer};
pub use tracer::{Extent, PathResult, RenderContext, Tracer, TracerConfig};
