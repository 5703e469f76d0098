use crate::events::{Property, Signal};
use crate::primary::geometry::Geometry;
use crate::primary::style::Style;
use crate::primary::next_id;
use std::rc::Rc;

struct FeatureInner {
    id: u64,
    /// The geometry object itself is replaceable; in-place mutation of the
    /// current geometry is signalled by the geometry's own change event.
    geometry: Property<Geometry>,
    style: Property<Option<Style>>,
    changed: Signal<()>,
}

/// A vector feature: a replaceable geometry, an optional style and a
/// generic change event.
#[derive(Clone)]
pub struct Feature {
    inner: Rc<FeatureInner>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            inner: Rc::new(FeatureInner {
                id: next_id(),
                geometry: Property::new(geometry),
                style: Property::new(None),
                changed: Signal::new(),
            }),
        }
    }

    pub fn with_style(self, style: Style) -> Self {
        self.inner.style.set(Some(style));
        self
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The geometry property; replacing the geometry object fires this,
    /// not the old geometry's change signal.
    pub fn geometry(&self) -> &Property<Geometry> {
        &self.inner.geometry
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        self.inner.geometry.set(geometry);
    }

    pub fn style(&self) -> Option<Style> {
        self.inner.style.get()
    }

    pub fn set_style(&self, style: Option<Style>) {
        self.inner.style.set(style);
        self.inner.changed.emit(&());
    }

    /// Generic feature-level change event
    pub fn changed(&self) -> &Signal<()> {
        &self.inner.changed
    }

    pub fn notify_changed(&self) {
        self.inner.changed.emit(&());
    }

    pub fn same(&self, other: &Feature) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature").field("id", &self.inner.id).finish()
    }
}
