//! The secondary engine's vector "data" feature collections.

use crate::core::geo::LatLng;
use crate::secondary::next_id;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Geometry in the secondary engine's native latitude/longitude terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataGeometry {
    Point(LatLng),
    Line(Vec<LatLng>),
    /// Rings; the first ring is the exterior
    Polygon(Vec<Vec<LatLng>>),
}

/// Style descriptor the secondary engine accepts for data features.
/// Colors are solid `rgb(...)` strings; opacity travels separately because
/// the engine's color API has no alpha channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataStyle {
    pub fill_color: Option<String>,
    pub fill_opacity: Option<f64>,
    pub stroke_color: Option<String>,
    pub stroke_opacity: Option<f64>,
    pub stroke_width: Option<f64>,
    /// Native marker icon URL; unset when icons are canvas-rendered
    pub icon_url: Option<String>,
    pub z_index: Option<i32>,
}

struct DataFeatureInner {
    id: u64,
    geometry: RefCell<DataGeometry>,
    style: RefCell<Option<DataStyle>>,
}

/// One mirrored feature in a data collection
#[derive(Clone)]
pub struct DataFeature {
    inner: Rc<DataFeatureInner>,
}

impl DataFeature {
    pub fn new(geometry: DataGeometry) -> Self {
        Self {
            inner: Rc::new(DataFeatureInner {
                id: next_id(),
                geometry: RefCell::new(geometry),
                style: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn geometry(&self) -> DataGeometry {
        self.inner.geometry.borrow().clone()
    }

    pub fn set_geometry(&self, geometry: DataGeometry) {
        *self.inner.geometry.borrow_mut() = geometry;
    }

    /// Per-feature style override; `None` falls back to the collection
    /// default
    pub fn style(&self) -> Option<DataStyle> {
        self.inner.style.borrow().clone()
    }

    pub fn override_style(&self, style: Option<DataStyle>) {
        *self.inner.style.borrow_mut() = style;
    }

    pub fn same(&self, other: &DataFeature) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

struct DataCollectionInner {
    id: u64,
    features: RefCell<Vec<DataFeature>>,
    default_style: RefCell<Option<DataStyle>>,
}

/// A data feature collection bound to the secondary map
#[derive(Clone)]
pub struct DataCollection {
    inner: Rc<DataCollectionInner>,
}

impl Default for DataCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCollection {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DataCollectionInner {
                id: next_id(),
                features: RefCell::new(Vec::new()),
                default_style: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Adds a feature; already-present features are not duplicated
    pub fn add(&self, feature: &DataFeature) {
        let mut features = self.inner.features.borrow_mut();
        if !features.iter().any(|f| f.same(feature)) {
            features.push(feature.clone());
        }
    }

    /// Removes a feature; absent features are a no-op
    pub fn remove(&self, feature: &DataFeature) {
        self.inner
            .features
            .borrow_mut()
            .retain(|f| !f.same(feature));
    }

    pub fn contains(&self, feature: &DataFeature) -> bool {
        self.inner
            .features
            .borrow()
            .iter()
            .any(|f| f.same(feature))
    }

    pub fn len(&self) -> usize {
        self.inner.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.features.borrow().is_empty()
    }

    pub fn features(&self) -> Vec<DataFeature> {
        self.inner.features.borrow().clone()
    }

    pub fn default_style(&self) -> Option<DataStyle> {
        self.inner.default_style.borrow().clone()
    }

    pub fn set_default_style(&self, style: Option<DataStyle>) {
        *self.inner.default_style.borrow_mut() = style;
    }

    pub fn same(&self, other: &DataCollection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
