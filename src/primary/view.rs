use crate::core::geo::{Extent, Point};
use crate::events::Property;
use std::rc::Rc;

struct ViewInner {
    /// Projected (EPSG:3857) center; `None` until the host defines one
    center: Property<Option<Point>>,
    /// Projected units per pixel
    resolution: Property<f64>,
    /// Rotation in radians, counter-clockwise
    rotation: Property<f64>,
}

/// The primary map's view: center, resolution and rotation, each
/// independently observable.
#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

impl View {
    pub fn new(center: Option<Point>, resolution: f64) -> Self {
        Self {
            inner: Rc::new(ViewInner {
                center: Property::new(center),
                resolution: Property::new(resolution),
                rotation: Property::new(0.0),
            }),
        }
    }

    pub fn center(&self) -> &Property<Option<Point>> {
        &self.inner.center
    }

    pub fn resolution(&self) -> &Property<f64> {
        &self.inner.resolution
    }

    pub fn rotation(&self) -> &Property<f64> {
        &self.inner.rotation
    }

    /// The projection's valid extent (Web Mercator world)
    pub fn projection_extent(&self) -> Extent {
        Extent::world()
    }

    /// Extent currently covered by the viewport, given a pixel size
    pub fn viewport_extent(&self, width: u32, height: u32) -> Option<Extent> {
        let center = self.inner.center.get()?;
        let resolution = self.inner.resolution.get();
        let half_w = width as f64 * resolution / 2.0;
        let half_h = height as f64 * resolution / 2.0;
        Some(Extent::new(
            center.x - half_w,
            center.y - half_h,
            center.x + half_w,
            center.y + half_h,
        ))
    }

    pub fn same(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("center", &self.inner.center.get())
            .field("resolution", &self.inner.resolution.get())
            .field("rotation", &self.inner.rotation.get())
            .finish()
    }
}
