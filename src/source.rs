//! The vector-feature data source boundary (§1, §6): out of scope as a real
//! GIS data-access layer, but the trait the Tracer consumes, plus a minimal
//! in-crate implementation ([`VectorLayer`]) so the crate is self-contained
//! and testable, live here.
//!
//! Mutation notifications are expressed as the "observer" relation the
//! design notes (§9) call for: a [`FeatureSource`] accepts observers and
//! fires [`ChangeSignal`]s at them synchronously, on the caller's thread.

use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::Polyline;

/// One of the mutation events §4.5/§6 says must invalidate the Tracer's
/// cached graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeSignal {
    FeatureAdded,
    FeatureDeleted,
    GeometryChanged,
    AttributeValueChanged,
    DataChanged,
    StyleChanged,
    Destroyed,
}

/// A feature as the tracing engine needs to see it: just its linework.
/// Real feature sources carry attributes, CRS, styling etc.; none of that
/// is relevant to the planar graph, so only geometry crosses the boundary.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub id: u64,
    pub geometry: Vec<Polyline>,
}

/// The feature-source contract the Tracer consumes (§6).
pub trait FeatureSource {
    /// Iterates features, already filtered/projected/visibility-pruned by
    /// the implementation as described in §4.5 step 1; out of scope for the
    /// core to reimplement.
    fn features(&self) -> Vec<Feature>;

    /// Registers an observer to be called synchronously on every mutation
    /// signal this source fires.
    fn subscribe(&self, observer: Rc<dyn Fn(ChangeSignal)>);

    /// Unregisters a previously-registered observer. Implementations
    /// compare by pointer identity (`Rc::ptr_eq`).
    fn unsubscribe(&self, observer: &Rc<dyn Fn(ChangeSignal)>);
}

/// A minimal, self-contained, serde-deserializable feature source: exactly
/// the shape of data the teacher repository's own `RoadGraph`/`Node` types
/// carry, generalized to the tracing engine's domain so the crate doesn't
/// need to depend on a real GIS data-access layer to be exercised.
#[derive(Default)]
pub struct VectorLayer {
    features: RefCell<Vec<Feature>>,
    observers: RefCell<Vec<Rc<dyn Fn(ChangeSignal)>>>,
}

impl VectorLayer {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features: RefCell::new(features), observers: RefCell::new(Vec::new()) }
    }

    fn emit(&self, signal: ChangeSignal) {
        for obs in self.observers.borrow().iter() {
            obs(signal);
        }
    }

    pub fn add_feature(&self, feature: Feature) {
        self.features.borrow_mut().push(feature);
        self.emit(ChangeSignal::FeatureAdded);
    }

    pub fn delete_feature(&self, id: u64) {
        self.features.borrow_mut().retain(|f| f.id != id);
        self.emit(ChangeSignal::FeatureDeleted);
    }

    pub fn set_geometry(&self, id: u64, geometry: Vec<Polyline>) {
        if let Some(f) = self.features.borrow_mut().iter_mut().find(|f| f.id == id) {
            f.geometry = geometry;
        }
        self.emit(ChangeSignal::GeometryChanged);
    }

    pub fn destroy(&self) {
        self.emit(ChangeSignal::Destroyed);
    }
}

impl FeatureSource for VectorLayer {
    fn features(&self) -> Vec<Feature> {
        self.features.borrow().clone()
    }

    fn subscribe(&self, observer: Rc<dyn Fn(ChangeSignal)>) {
        self.observers.borrow_mut().push(observer);
    }

    fn unsubscribe(&self, observer: &Rc<dyn Fn(ChangeSignal)>) {
        self.observers.borrow_mut().retain(|o| !Rc::ptr_eq(o, observer));
    }
}
