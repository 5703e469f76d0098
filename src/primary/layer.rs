use crate::core::geo::Extent;
use crate::events::Property;
use crate::primary::next_id;
use crate::primary::source::{ImageWmsSource, ProxySource, TileSource, VectorSource};
use crate::primary::style::Style;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// The closed set of layer-source kinds the bridge understands, determined
/// once at watch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Tile,
    ImageWms,
    Vector,
    Proxy,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Tile => write!(f, "tile"),
            SourceKind::ImageWms => write!(f, "image-wms"),
            SourceKind::Vector => write!(f, "vector"),
            SourceKind::Proxy => write!(f, "proxy"),
        }
    }
}

/// Tagged source payload for a layer
#[derive(Clone)]
pub enum LayerSource {
    Tile(TileSource),
    ImageWms(ImageWmsSource),
    Vector(VectorSource),
    Proxy(ProxySource),
}

impl LayerSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            LayerSource::Tile(_) => SourceKind::Tile,
            LayerSource::ImageWms(_) => SourceKind::ImageWms,
            LayerSource::Vector(_) => SourceKind::Vector,
            LayerSource::Proxy(_) => SourceKind::Proxy,
        }
    }
}

struct LayerInner {
    id: u64,
    source: LayerSource,
    opacity: Property<f64>,
    visible: Property<bool>,
    min_resolution: Cell<f64>,
    max_resolution: Cell<f64>,
    extent: RefCell<Option<Extent>>,
    /// Layer-level default style, vector layers only
    style: RefCell<Option<Style>>,
    /// Explicit opt-out marker: the layer is always left to render natively
    no_bridge: Cell<bool>,
}

/// A primary-map layer handle
#[derive(Clone)]
pub struct Layer {
    inner: Rc<LayerInner>,
}

impl Layer {
    pub fn new(source: LayerSource) -> Self {
        Self {
            inner: Rc::new(LayerInner {
                id: next_id(),
                source,
                opacity: Property::new(1.0),
                visible: Property::new(true),
                min_resolution: Cell::new(0.0),
                max_resolution: Cell::new(f64::INFINITY),
                extent: RefCell::new(None),
                style: RefCell::new(None),
                no_bridge: Cell::new(false),
            }),
        }
    }

    pub fn tile(source: TileSource) -> Self {
        Self::new(LayerSource::Tile(source))
    }

    pub fn wms(source: ImageWmsSource) -> Self {
        Self::new(LayerSource::ImageWms(source))
    }

    pub fn vector(source: VectorSource) -> Self {
        Self::new(LayerSource::Vector(source))
    }

    pub fn proxy(source: ProxySource) -> Self {
        Self::new(LayerSource::Proxy(source))
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn source(&self) -> &LayerSource {
        &self.inner.source
    }

    pub fn kind(&self) -> SourceKind {
        self.inner.source.kind()
    }

    pub fn opacity(&self) -> &Property<f64> {
        &self.inner.opacity
    }

    pub fn visible(&self) -> &Property<bool> {
        &self.inner.visible
    }

    /// Resolution window within which the layer renders
    pub fn resolution_window(&self) -> (f64, f64) {
        (
            self.inner.min_resolution.get(),
            self.inner.max_resolution.get(),
        )
    }

    pub fn set_resolution_window(&self, min: f64, max: f64) {
        self.inner.min_resolution.set(min);
        self.inner.max_resolution.set(max);
    }

    /// Whether a view resolution falls inside the layer's window
    pub fn in_resolution_window(&self, resolution: f64) -> bool {
        resolution >= self.inner.min_resolution.get()
            && resolution < self.inner.max_resolution.get()
    }

    pub fn extent(&self) -> Option<Extent> {
        *self.inner.extent.borrow()
    }

    pub fn set_extent(&self, extent: Option<Extent>) {
        *self.inner.extent.borrow_mut() = extent;
    }

    pub fn style(&self) -> Option<Style> {
        self.inner.style.borrow().clone()
    }

    pub fn set_style(&self, style: Option<Style>) {
        *self.inner.style.borrow_mut() = style;
    }

    pub fn no_bridge(&self) -> bool {
        self.inner.no_bridge.get()
    }

    /// Marks the layer to always render natively, regardless of watch policy
    pub fn set_no_bridge(&self, no_bridge: bool) {
        self.inner.no_bridge.set(no_bridge);
    }

    pub fn same(&self, other: &Layer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.inner.id)
            .field("kind", &self.kind())
            .field("visible", &self.inner.visible.get())
            .field("opacity", &self.inner.opacity.get())
            .finish()
    }
}
