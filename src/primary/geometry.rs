use crate::core::geo::{Extent, Point};
use crate::events::Signal;
use std::cell::RefCell;
use std::rc::Rc;

/// Geometry data in projected coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point),
    LineString(Vec<Point>),
    /// Rings; the first ring is the exterior
    Polygon(Vec<Vec<Point>>),
}

struct GeometryInner {
    shape: RefCell<Shape>,
    changed: Signal<()>,
}

/// An observable geometry handle. Mutating the shape in place fires the
/// change signal; replacing a feature's geometry object entirely is a
/// different event, carried by the feature's geometry property.
#[derive(Clone)]
pub struct Geometry {
    inner: Rc<GeometryInner>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Self {
            inner: Rc::new(GeometryInner {
                shape: RefCell::new(shape),
                changed: Signal::new(),
            }),
        }
    }

    pub fn point(point: Point) -> Self {
        Self::new(Shape::Point(point))
    }

    pub fn line(points: Vec<Point>) -> Self {
        Self::new(Shape::LineString(points))
    }

    pub fn polygon(rings: Vec<Vec<Point>>) -> Self {
        Self::new(Shape::Polygon(rings))
    }

    pub fn shape(&self) -> Shape {
        self.inner.shape.borrow().clone()
    }

    /// Replaces the shape in place and notifies change listeners
    pub fn set_shape(&self, shape: Shape) {
        *self.inner.shape.borrow_mut() = shape;
        self.inner.changed.emit(&());
    }

    /// In-place mutation change signal
    pub fn changed(&self) -> &Signal<()> {
        &self.inner.changed
    }

    pub fn extent(&self) -> Option<Extent> {
        match &*self.inner.shape.borrow() {
            Shape::Point(p) => Some(Extent::new(p.x, p.y, p.x, p.y)),
            Shape::LineString(points) => Extent::from_points(points),
            Shape::Polygon(rings) => Extent::from_points(rings.first()?),
        }
    }

    /// Anchor point for markers and labels.
    ///
    /// A point's own coordinate; a polygon's interior point, which is
    /// guaranteed inside the polygon unlike a bounding-box centroid; the
    /// bounding-extent center otherwise.
    pub fn center(&self) -> Option<Point> {
        match &*self.inner.shape.borrow() {
            Shape::Point(p) => Some(*p),
            Shape::Polygon(rings) => interior_point(rings.first()?),
            Shape::LineString(points) => Extent::from_points(points).map(|e| e.center()),
        }
    }

    pub fn same(&self, other: &Geometry) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Geometry").field(&self.shape()).finish()
    }
}

/// Interior point of a ring: intersect the ring with the horizontal line
/// through the extent's mid-height and take the midpoint of the widest
/// crossing interval.
fn interior_point(ring: &[Point]) -> Option<Point> {
    let extent = Extent::from_points(ring)?;
    let mid_y = (extent.min_y + extent.max_y) / 2.0;

    let mut crossings = Vec::new();
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        // Half-open rule so a vertex exactly on the line counts once.
        if (a.y <= mid_y && b.y > mid_y) || (b.y <= mid_y && a.y > mid_y) {
            let t = (mid_y - a.y) / (b.y - a.y);
            crossings.push(a.x + t * (b.x - a.x));
        }
    }
    if crossings.is_empty() {
        return Some(extent.center());
    }
    crossings.sort_by(|a, b| a.total_cmp(b));

    let mut best = (crossings[0], crossings[0]);
    for pair in crossings.chunks(2) {
        if let [left, right] = pair {
            if right - left > best.1 - best.0 {
                best = (*left, *right);
            }
        }
    }
    Some(Point::new((best.0 + best.1) / 2.0, mid_y))
}
