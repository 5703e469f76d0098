//! The secondary map handle: every mutation the bridge may perform.

use crate::core::geo::{LatLng, Point};
use crate::events::Signal;
use crate::prelude::HashSet;
use crate::secondary::data::DataCollection;
use crate::secondary::overlay::GroundOverlay;
use crate::secondary::pane::OverlayPane;
use crate::secondary::scheduler::Scheduler;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::f64::consts::PI;
use std::rc::Rc;

/// The secondary engine's native basemap renderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapTypeId {
    Roadmap,
    Satellite,
    Hybrid,
    Terrain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Container {
    width: u32,
    height: u32,
    /// Size before the rotation square-resize fix-up
    base_width: u32,
    base_height: u32,
    overflow_hidden: bool,
    squared: bool,
    /// Extra offset applied to children pinned to the container bottom
    bottom_offset: u32,
}

struct SecondaryMapInner {
    map_type: Cell<MapTypeId>,
    custom_style: RefCell<Option<serde_json::Value>>,
    center: Cell<LatLng>,
    zoom: Cell<f64>,
    /// CSS rotation applied to the inner tile-rendering element, degrees
    tile_pane_rotation: Cell<f64>,
    container: RefCell<Container>,
    tiles_loaded: Cell<bool>,
    idle: Signal<()>,
    resized: Signal<()>,
    pane: OverlayPane,
    ground_overlays: RefCell<Vec<GroundOverlay>>,
    data_collections: RefCell<Vec<DataCollection>>,
    attached_views: RefCell<HashSet<u64>>,
    scheduler: Scheduler,
}

/// Handle to the secondary rendering backend. Cheap to clone; all clones
/// share one underlying map.
#[derive(Clone)]
pub struct SecondaryMap {
    inner: Rc<SecondaryMapInner>,
}

impl SecondaryMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Rc::new(SecondaryMapInner {
                map_type: Cell::new(MapTypeId::Roadmap),
                custom_style: RefCell::new(None),
                center: Cell::new(LatLng::default()),
                zoom: Cell::new(0.0),
                tile_pane_rotation: Cell::new(0.0),
                container: RefCell::new(Container {
                    width,
                    height,
                    base_width: width,
                    base_height: height,
                    overflow_hidden: false,
                    squared: false,
                    bottom_offset: 0,
                }),
                tiles_loaded: Cell::new(false),
                idle: Signal::new(),
                resized: Signal::new(),
                pane: OverlayPane::new(),
                ground_overlays: RefCell::new(Vec::new()),
                data_collections: RefCell::new(Vec::new()),
                attached_views: RefCell::new(HashSet::default()),
                scheduler: Scheduler::new(),
            }),
        }
    }

    // ---- basemap ----

    pub fn map_type(&self) -> MapTypeId {
        self.inner.map_type.get()
    }

    pub fn set_map_type(&self, map_type: MapTypeId) {
        self.inner.map_type.set(map_type);
    }

    pub fn custom_style(&self) -> Option<serde_json::Value> {
        self.inner.custom_style.borrow().clone()
    }

    pub fn set_custom_style(&self, style: Option<serde_json::Value>) {
        *self.inner.custom_style.borrow_mut() = style;
    }

    // ---- view state ----

    pub fn center(&self) -> LatLng {
        self.inner.center.get()
    }

    pub fn set_center(&self, center: LatLng) {
        self.inner.center.set(center);
    }

    pub fn zoom(&self) -> f64 {
        self.inner.zoom.get()
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.inner.zoom.set(zoom);
    }

    /// Rotation of the inner tile pane in degrees. The engine has no native
    /// rotation API; this models the CSS transform workaround.
    pub fn tile_pane_rotation(&self) -> f64 {
        self.inner.tile_pane_rotation.get()
    }

    pub fn set_tile_pane_rotation(&self, degrees: f64) {
        self.inner.tile_pane_rotation.set(degrees);
    }

    // ---- container ----

    pub fn container_size(&self) -> (u32, u32) {
        let c = self.inner.container.borrow();
        (c.width, c.height)
    }

    /// Host-driven container resize; resets any square fix-up
    pub fn set_container_size(&self, width: u32, height: u32) {
        let mut c = self.inner.container.borrow_mut();
        *c = Container {
            width,
            height,
            base_width: width,
            base_height: height,
            overflow_hidden: false,
            squared: false,
            bottom_offset: 0,
        };
    }

    /// The engine does not detect DOM reflows; this forces a resize event
    pub fn trigger_resize(&self) {
        self.inner.resized.emit(&());
    }

    pub fn resized(&self) -> &Signal<()> {
        &self.inner.resized
    }

    /// A rotated rectangular viewport exposes blank corners, so the
    /// container is grown to a square with hidden overflow. Runs once per
    /// load; children pinned to the bottom are pushed down by the height
    /// difference.
    pub fn square_container(&self) -> bool {
        let mut c = self.inner.container.borrow_mut();
        if c.squared {
            return false;
        }
        let side = c.base_width.max(c.base_height);
        c.bottom_offset = side - c.base_height;
        c.width = side;
        c.height = side;
        c.overflow_hidden = true;
        c.squared = true;
        true
    }

    pub fn is_squared(&self) -> bool {
        self.inner.container.borrow().squared
    }

    pub fn bottom_offset(&self) -> u32 {
        self.inner.container.borrow().bottom_offset
    }

    pub fn overflow_hidden(&self) -> bool {
        self.inner.container.borrow().overflow_hidden
    }

    /// Undoes the square fix-up, restoring the host-given size
    pub fn restore_container(&self) {
        let mut c = self.inner.container.borrow_mut();
        c.width = c.base_width;
        c.height = c.base_height;
        c.overflow_hidden = false;
        c.squared = false;
        c.bottom_offset = 0;
    }

    // ---- load state ----

    pub fn tiles_loaded(&self) -> bool {
        self.inner.tiles_loaded.get()
    }

    /// The engine reports idle once its async tile loading settles
    pub fn notify_tiles_loaded(&self) {
        self.inner.tiles_loaded.set(true);
        self.inner.idle.emit(&());
    }

    pub fn idle(&self) -> &Signal<()> {
        &self.inner.idle
    }

    // ---- overlays ----

    pub fn pane(&self) -> &OverlayPane {
        &self.inner.pane
    }

    pub fn add_ground_overlay(&self, overlay: &GroundOverlay) {
        overlay.mark_attached(true);
        self.inner.ground_overlays.borrow_mut().push(overlay.clone());
    }

    pub fn remove_ground_overlay(&self, overlay: &GroundOverlay) {
        overlay.mark_attached(false);
        self.inner
            .ground_overlays
            .borrow_mut()
            .retain(|o| !o.same(overlay));
    }

    pub fn ground_overlays(&self) -> Vec<GroundOverlay> {
        self.inner.ground_overlays.borrow().clone()
    }

    // ---- data ----

    /// Creates a data feature collection bound to this map
    pub fn create_data_collection(&self) -> DataCollection {
        let collection = DataCollection::new();
        self.inner
            .data_collections
            .borrow_mut()
            .push(collection.clone());
        collection
    }

    pub fn remove_data_collection(&self, collection: &DataCollection) {
        self.inner
            .data_collections
            .borrow_mut()
            .retain(|c| !c.same(collection));
    }

    pub fn data_collections(&self) -> Vec<DataCollection> {
        self.inner.data_collections.borrow().clone()
    }

    // ---- custom overlay views ----

    pub(crate) fn register_view(&self, id: u64) {
        self.inner.attached_views.borrow_mut().insert(id);
    }

    pub(crate) fn unregister_view(&self, id: u64) {
        self.inner.attached_views.borrow_mut().remove(&id);
    }

    pub fn view_attached(&self, id: u64) -> bool {
        self.inner.attached_views.borrow().contains(&id)
    }

    pub fn attached_view_count(&self) -> usize {
        self.inner.attached_views.borrow().len()
    }

    // ---- scheduling ----

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Geo-to-pixel conversion for overlay views, relative to the
    /// container's top-left corner
    pub fn geo_to_pixel(&self, position: &LatLng) -> Point {
        let (width, height) = self.container_size();
        let world = 256.0 * 2_f64.powf(self.zoom());

        let norm = |ll: &LatLng| {
            let lat = LatLng::clamp_lat(ll.lat).to_radians();
            let siny = lat.sin();
            let x = (ll.lng + 180.0) / 360.0;
            let y = 0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI);
            (x, y)
        };

        let center = self.center();
        let (cx, cy) = norm(&center);
        let (px, py) = norm(position);
        Point::new(
            (px - cx) * world + width as f64 / 2.0,
            (py - cy) * world + height as f64 / 2.0,
        )
    }
}

impl std::fmt::Debug for SecondaryMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryMap")
            .field("map_type", &self.map_type())
            .field("center", &self.center())
            .field("zoom", &self.zoom())
            .field("container", &self.container_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_container_runs_once() {
        let map = SecondaryMap::new(800, 600);
        assert!(map.square_container());
        assert_eq!(map.container_size(), (800, 800));
        assert_eq!(map.bottom_offset(), 200);
        assert!(map.overflow_hidden());

        // Second call is a no-op until restored.
        assert!(!map.square_container());

        map.restore_container();
        assert_eq!(map.container_size(), (800, 600));
        assert_eq!(map.bottom_offset(), 0);
        assert!(map.square_container());
    }

    #[test]
    fn test_geo_to_pixel_center() {
        let map = SecondaryMap::new(400, 400);
        map.set_center(LatLng::new(10.0, 20.0));
        map.set_zoom(5.0);

        let pixel = map.geo_to_pixel(&LatLng::new(10.0, 20.0));
        assert!((pixel.x - 200.0).abs() < 1e-9);
        assert!((pixel.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_geo_to_pixel_east_moves_right() {
        let map = SecondaryMap::new(400, 400);
        map.set_center(LatLng::new(0.0, 0.0));
        map.set_zoom(2.0);

        let east = map.geo_to_pixel(&LatLng::new(0.0, 10.0));
        let north = map.geo_to_pixel(&LatLng::new(10.0, 0.0));
        assert!(east.x > 200.0);
        assert!(north.y < 200.0);
    }

    #[test]
    fn test_idle_marks_tiles_loaded() {
        let map = SecondaryMap::new(100, 100);
        assert!(!map.tiles_loaded());
        map.notify_tiles_loaded();
        assert!(map.tiles_loaded());
    }
}
