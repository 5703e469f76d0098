//! Image-WMS source herald: mirrors single-image WMS layers as manually
//! positioned ground overlays.
//!
//! Single-image GetMap requests don't tile, so each watched layer is
//! rendered as one overlay sized to the viewport. Overlapping move and
//! resolution events from the same user action may arrive in either order;
//! the memoized last request URL makes the result idempotent regardless.

use crate::core::geo::{Extent, Point};
use crate::core::url::append_params;
use crate::events::{ListenerHandle, PropertyChange, PropertyListener};
use crate::herald::Herald;
use crate::primary::layer::{Layer, LayerSource};
use crate::primary::map::PrimaryMap;
use crate::primary::source::ImageWmsSource;
use crate::primary::view::View;
use crate::secondary::map::SecondaryMap;
use crate::secondary::overlay::GroundOverlay;
use crate::secondary::translate::lat_lng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Builds a GetMap request URL from the source's parameters.
///
/// Caller-supplied parameters are split into the recognized WMS keys and
/// arbitrary passthrough parameters, all merged into one query string. The
/// axis key is CRS for WMS 1.3.x and SRS for older versions. Validation is
/// deliberately lax on this path: a bad value surfaces as a blank overlay,
/// not an error.
fn getmap_url(
    source: &ImageWmsSource,
    extent: &Extent,
    width: u32,
    height: u32,
    cache_bust: Option<u64>,
) -> String {
    let mut params = source.params();
    let version = params
        .remove("VERSION")
        .unwrap_or_else(|| "1.3.0".to_string());
    let layers = params.remove("LAYERS").unwrap_or_default();
    let styles = params.remove("STYLES").unwrap_or_default();
    let format = params
        .remove("FORMAT")
        .unwrap_or_else(|| "image/png".to_string());
    let transparent = params
        .remove("TRANSPARENT")
        .unwrap_or_else(|| "TRUE".to_string());
    let tiled = params.remove("TILED");
    let axis_key = if version.starts_with("1.3") { "CRS" } else { "SRS" };
    let axis = params
        .remove("CRS")
        .or_else(|| params.remove("SRS"))
        .unwrap_or_else(|| "EPSG:3857".to_string());

    let mut pairs: Vec<(String, String)> = vec![
        ("SERVICE".to_string(), "WMS".to_string()),
        ("REQUEST".to_string(), "GetMap".to_string()),
        ("VERSION".to_string(), version),
        ("LAYERS".to_string(), layers),
        ("STYLES".to_string(), styles),
        ("FORMAT".to_string(), format),
        ("TRANSPARENT".to_string(), transparent),
        (axis_key.to_string(), axis),
        (
            "BBOX".to_string(),
            format!(
                "{},{},{},{}",
                extent.min_x, extent.min_y, extent.max_x, extent.max_y
            ),
        ),
        ("WIDTH".to_string(), width.to_string()),
        ("HEIGHT".to_string(), height.to_string()),
    ];
    if let Some(tiled) = tiled {
        pairs.push(("TILED".to_string(), tiled));
    }
    for (key, value) in params {
        pairs.push((key, value));
    }
    if let Some(stamp) = cache_bust {
        pairs.push(("TIMESTAMP".to_string(), stamp.to_string()));
    }
    append_params(source.url(), &pairs)
}

struct WmsItem {
    layer: Layer,
    source: ImageWmsSource,
    primary: PrimaryMap,
    secondary: SecondaryMap,
    active: Rc<Cell<bool>>,
    overlay: RefCell<Option<GroundOverlay>>,
    /// Memoized last request, suppressing redundant move/resolution refires
    last_url: RefCell<Option<String>>,
    saved_opacity: Cell<f64>,
    pinned: Cell<bool>,
    ignore_opacity: Cell<bool>,
    z_index: Cell<i32>,
    listeners: RefCell<Vec<ListenerHandle>>,
    view_listener: RefCell<Option<PropertyListener>>,
}

impl WmsItem {
    fn pin_primary(&self) {
        if self.pinned.get() {
            return;
        }
        self.saved_opacity.set(self.layer.opacity().get());
        self.pinned.set(true);
        self.ignore_opacity.set(true);
        self.layer.opacity().set(0.0);
    }

    fn unpin_primary(&self) {
        if !self.pinned.get() {
            return;
        }
        self.pinned.set(false);
        self.ignore_opacity.set(true);
        self.layer.opacity().set(self.saved_opacity.get());
    }

    fn on_opacity(&self, change: &PropertyChange<f64>) {
        if self.ignore_opacity.get() {
            self.ignore_opacity.set(false);
            return;
        }
        self.saved_opacity.set(change.new);
        if self.pinned.get() {
            self.ignore_opacity.set(true);
            self.layer.opacity().set(0.0);
        }
    }

    fn clear_overlay(&self) {
        if let Some(old) = self.overlay.borrow_mut().take() {
            self.secondary.remove_ground_overlay(&old);
        }
        self.last_url.borrow_mut().take();
    }

    /// Recomputes the mirror overlay for the current viewport. `cache_bust`
    /// forces re-issue regardless of URL equality.
    fn update(&self, cache_bust: Option<u64>) {
        if !self.active.get() {
            return;
        }
        let view = self.primary.view().get();
        let resolution = view.resolution().get();
        if !self.layer.visible().get() || !self.layer.in_resolution_window(resolution) {
            self.clear_overlay();
            return;
        }
        let (width, height) = match self.primary.size() {
            Some(size) => size,
            None => {
                debug_assert!(false, "viewport size required for a WMS bbox");
                return;
            }
        };
        let extent = match view.viewport_extent(width, height) {
            Some(extent) => extent,
            None => return,
        };

        let url = getmap_url(&self.source, &extent, width, height, cache_bust);
        if cache_bust.is_none() && self.last_url.borrow().as_deref() == Some(url.as_str()) {
            return;
        }

        // Attach the new overlay before detaching the old one, so the swap
        // never shows a blank frame.
        let anchor = lat_lng(&Point::new(extent.min_x, extent.max_y));
        let overlay = GroundOverlay::new(url.clone(), anchor, width, height);
        overlay.set_z_index(self.z_index.get());
        self.secondary.add_ground_overlay(&overlay);
        if let Some(old) = self.overlay.borrow_mut().replace(overlay) {
            self.secondary.remove_ground_overlay(&old);
        }
        *self.last_url.borrow_mut() = Some(url);
    }
}

struct WmsHeraldInner {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    active: Rc<Cell<bool>>,
    items: RefCell<Vec<Rc<WmsItem>>>,
    refresh_serial: Cell<u64>,
}

/// Herald for single-image WMS layers
#[derive(Clone)]
pub struct WmsHerald {
    inner: Rc<WmsHeraldInner>,
}

impl WmsHerald {
    pub fn new(primary: PrimaryMap, secondary: SecondaryMap) -> Self {
        Self {
            inner: Rc::new(WmsHeraldInner {
                primary,
                secondary,
                active: Rc::new(Cell::new(false)),
                items: RefCell::new(Vec::new()),
                refresh_serial: Cell::new(0),
            }),
        }
    }

    fn item_for(&self, layer: &Layer) -> Option<Rc<WmsItem>> {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|item| item.layer.same(layer))
            .cloned()
    }

    pub fn is_watching(&self, layer: &Layer) -> bool {
        self.item_for(layer).is_some()
    }

    /// Begins mirroring a WMS layer. Watching an already-watched layer is a
    /// guarded no-op.
    pub fn watch(&self, layer: &Layer) {
        if self.is_watching(layer) {
            log::warn!("wms layer {} already watched, ignoring", layer.id());
            return;
        }
        let source = match layer.source() {
            LayerSource::ImageWms(source) => source.clone(),
            _ => {
                debug_assert!(false, "wms herald given a non-wms layer");
                return;
            }
        };

        let item = Rc::new(WmsItem {
            layer: layer.clone(),
            source: source.clone(),
            primary: self.inner.primary.clone(),
            secondary: self.inner.secondary.clone(),
            active: Rc::clone(&self.inner.active),
            overlay: RefCell::new(None),
            last_url: RefCell::new(None),
            saved_opacity: Cell::new(layer.opacity().get()),
            pinned: Cell::new(false),
            ignore_opacity: Cell::new(false),
            z_index: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            view_listener: RefCell::new(None),
        });

        let weak = Rc::downgrade(&item);
        let visible_handle = layer.visible().listen(move |_| {
            if let Some(item) = weak.upgrade() {
                item.update(None);
            }
        });
        let weak = Rc::downgrade(&item);
        let opacity_handle = layer.opacity().listen(move |change| {
            if let Some(item) = weak.upgrade() {
                item.on_opacity(change);
            }
        });
        let weak = Rc::downgrade(&item);
        let source_handle = source.changed().listen(move |_| {
            if let Some(item) = weak.upgrade() {
                item.update(None);
            }
        });
        item.listeners
            .borrow_mut()
            .extend([visible_handle, opacity_handle, source_handle]);

        // Follow the view object across replacement: center and resolution
        // subscriptions are rewired onto whatever view is current.
        let weak = Rc::downgrade(&item);
        let view_listener =
            PropertyListener::new(self.inner.primary.view(), move |view: &View, _old| {
                let item = match weak.upgrade() {
                    Some(item) => item,
                    None => return Vec::new(),
                };
                item.update(None);
                let weak_center = Rc::downgrade(&item);
                let weak_resolution = Rc::downgrade(&item);
                vec![
                    view.center().listen(move |_| {
                        if let Some(item) = weak_center.upgrade() {
                            item.update(None);
                        }
                    }),
                    view.resolution().listen(move |_| {
                        if let Some(item) = weak_resolution.upgrade() {
                            item.update(None);
                        }
                    }),
                ]
            });
        *item.view_listener.borrow_mut() = Some(view_listener);

        log::debug!("watching wms layer {}", layer.id());
        self.inner.items.borrow_mut().push(Rc::clone(&item));
        if self.inner.active.get() {
            item.pin_primary();
            item.update(None);
        }
    }

    /// Stops mirroring a layer; unknown layers are a no-op.
    pub fn unwatch(&self, layer: &Layer) {
        let item = match self.item_for(layer) {
            Some(item) => item,
            None => return,
        };
        self.inner.items.borrow_mut().retain(|i| !i.layer.same(layer));
        item.clear_overlay();
        item.unpin_primary();
        item.listeners.borrow_mut().clear();
        item.view_listener.borrow_mut().take();
        log::debug!("unwatched wms layer {}", layer.id());
    }

    pub fn set_secondary_active(&self, active: bool) {
        self.inner.active.set(active);
        let items: Vec<_> = self.inner.items.borrow().clone();
        for item in items {
            if active {
                item.pin_primary();
                item.update(None);
            } else {
                item.clear_overlay();
                item.unpin_primary();
            }
        }
    }

    /// Reassigns overlay z-indexes from the primary stacking order
    pub fn order_layers(&self) {
        let items: Vec<_> = self.inner.items.borrow().clone();
        for item in items {
            if let Some(position) = self.inner.primary.layers().position_of(&item.layer) {
                item.z_index.set(position as i32);
                if let Some(overlay) = item.overlay.borrow().as_ref() {
                    overlay.set_z_index(position as i32);
                }
            }
        }
    }

    /// Forces every mirror to re-issue its request with a cache-busting
    /// timestamp, bypassing the URL memo.
    pub fn refresh(&self) {
        let stamp = self.inner.refresh_serial.get() + 1;
        self.inner.refresh_serial.set(stamp);
        let items: Vec<_> = self.inner.items.borrow().clone();
        for item in items {
            item.update(Some(stamp));
        }
    }

    pub fn watched_count(&self) -> usize {
        self.inner.items.borrow().len()
    }
}

impl Herald for WmsHerald {
    fn activate(&self) {
        self.set_secondary_active(true);
    }

    fn deactivate(&self) {
        self.set_secondary_active(false);
    }
}
