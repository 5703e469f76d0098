use crate::core::geo::TileCoord;
use crate::events::Signal;
use crate::primary::feature::Feature;
use crate::primary::tilegrid::TileGrid;
use crate::secondary::map::MapTypeId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Produces tile URLs in the primary engine's tile convention.
///
/// `None` means "no tile here". Sources whose URL template is initialized
/// lazily may return `None` on the very first call and succeed on a retry.
pub type TileUrlFn = Rc<dyn Fn(TileCoord) -> Option<String>>;

struct TileSourceInner {
    grid: TileGrid,
    url_fn: RefCell<Option<TileUrlFn>>,
}

/// A raster tile source: a tile grid plus a URL function
#[derive(Clone)]
pub struct TileSource {
    inner: Rc<TileSourceInner>,
}

impl TileSource {
    pub fn new<F: Fn(TileCoord) -> Option<String> + 'static>(grid: TileGrid, url_fn: F) -> Self {
        Self {
            inner: Rc::new(TileSourceInner {
                grid,
                url_fn: RefCell::new(Some(Rc::new(url_fn))),
            }),
        }
    }

    /// A source whose URL function is not ready yet
    pub fn uninitialized(grid: TileGrid) -> Self {
        Self {
            inner: Rc::new(TileSourceInner {
                grid,
                url_fn: RefCell::new(None),
            }),
        }
    }

    pub fn set_url_fn<F: Fn(TileCoord) -> Option<String> + 'static>(&self, url_fn: F) {
        *self.inner.url_fn.borrow_mut() = Some(Rc::new(url_fn));
    }

    pub fn grid(&self) -> &TileGrid {
        &self.inner.grid
    }

    /// Tile URL for a coordinate in the primary convention
    pub fn url(&self, coord: TileCoord) -> Option<String> {
        let url_fn = self.inner.url_fn.borrow().clone()?;
        url_fn(coord)
    }
}

struct ImageWmsSourceInner {
    url: String,
    params: RefCell<BTreeMap<String, String>>,
    changed: Signal<()>,
}

/// A single-image WMS source: a GetMap endpoint and request parameters
#[derive(Clone)]
pub struct ImageWmsSource {
    inner: Rc<ImageWmsSourceInner>,
}

impl ImageWmsSource {
    pub fn new(url: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            inner: Rc::new(ImageWmsSourceInner {
                url: url.into(),
                params: RefCell::new(params),
                changed: Signal::new(),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        self.inner.params.borrow().clone()
    }

    pub fn set_param(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .params
            .borrow_mut()
            .insert(key.into(), value.into());
        self.inner.changed.emit(&());
    }

    /// Fires when request parameters change
    pub fn changed(&self) -> &Signal<()> {
        &self.inner.changed
    }
}

struct VectorSourceInner {
    features: RefCell<Vec<Feature>>,
    added: Signal<Feature>,
    removed: Signal<Feature>,
}

/// A collection of vector features with add/remove notification
#[derive(Clone, Default)]
pub struct VectorSource {
    inner: Rc<VectorSourceInner>,
}

impl Default for VectorSourceInner {
    fn default() -> Self {
        Self {
            features: RefCell::new(Vec::new()),
            added: Signal::new(),
            removed: Signal::new(),
        }
    }
}

impl VectorSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feature(&self, feature: Feature) {
        self.inner.features.borrow_mut().push(feature.clone());
        self.inner.added.emit(&feature);
    }

    /// Removes a feature; unknown features are a no-op
    pub fn remove_feature(&self, feature: &Feature) {
        let mut features = self.inner.features.borrow_mut();
        let before = features.len();
        features.retain(|f| !f.same(feature));
        let removed = features.len() < before;
        drop(features);
        if removed {
            self.inner.removed.emit(feature);
        }
    }

    pub fn features(&self) -> Vec<Feature> {
        self.inner.features.borrow().clone()
    }

    pub fn added(&self) -> &Signal<Feature> {
        &self.inner.added
    }

    pub fn removed(&self) -> &Signal<Feature> {
        &self.inner.removed
    }
}

/// A proxy/basemap source: renders nothing itself, only declares that the
/// secondary engine's native basemap should be shown with this map type
/// and optional custom style.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySource {
    pub map_type: MapTypeId,
    pub styles: Option<serde_json::Value>,
}

impl ProxySource {
    pub fn new(map_type: MapTypeId) -> Self {
        Self {
            map_type,
            styles: None,
        }
    }

    pub fn with_styles(mut self, styles: serde_json::Value) -> Self {
        self.styles = Some(styles);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::primary::geometry::Geometry;
    use std::cell::Cell;

    #[test]
    fn test_tile_source_url() {
        let source = TileSource::new(TileGrid::xyz(), |coord| {
            Some(format!("/{}/{}/{}.png", coord.z, coord.x, coord.y))
        });
        assert_eq!(
            source.url(TileCoord::new(1, -2, 3)),
            Some("/3/1/-2.png".to_string())
        );
    }

    #[test]
    fn test_uninitialized_tile_source() {
        let source = TileSource::uninitialized(TileGrid::xyz());
        assert_eq!(source.url(TileCoord::new(0, 0, 0)), None);
        source.set_url_fn(|_| Some("ready".to_string()));
        assert_eq!(source.url(TileCoord::new(0, 0, 0)), Some("ready".to_string()));
    }

    #[test]
    fn test_wms_param_change_notifies() {
        let source = ImageWmsSource::new("http://example.com/wms", BTreeMap::new());
        let fired = Rc::new(Cell::new(0));
        let fired_clone = Rc::clone(&fired);
        let _handle = source
            .changed()
            .listen(move |_| fired_clone.set(fired_clone.get() + 1));

        source.set_param("LAYERS", "roads");
        assert_eq!(fired.get(), 1);
        assert_eq!(source.params().get("LAYERS").unwrap(), "roads");
    }

    #[test]
    fn test_vector_source_add_remove() {
        let source = VectorSource::new();
        let feature = Feature::new(Geometry::point(Point::new(0.0, 0.0)));

        let adds = Rc::new(Cell::new(0));
        let removes = Rc::new(Cell::new(0));
        let adds_clone = Rc::clone(&adds);
        let removes_clone = Rc::clone(&removes);
        let _a = source.added().listen(move |_| adds_clone.set(adds_clone.get() + 1));
        let _r = source
            .removed()
            .listen(move |_| removes_clone.set(removes_clone.get() + 1));

        source.add_feature(feature.clone());
        assert_eq!(source.features().len(), 1);
        assert_eq!(adds.get(), 1);

        source.remove_feature(&feature);
        assert_eq!(source.features().len(), 0);
        assert_eq!(removes.get(), 1);

        // Removing an absent feature is a no-op.
        source.remove_feature(&feature);
        assert_eq!(removes.get(), 1);
    }
}
