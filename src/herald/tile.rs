//! Tile source herald: mirrors raster tile layers as secondary tile
//! overlays.
//!
//! Per watched layer the herald keeps one tile overlay whose URL callback
//! delegates to the primary source's own URL function after coordinate
//! translation, intercepts opacity changes so the primary layer never
//! double-renders under the secondary map, and restacks the shared overlay
//! pane by diffing its nodes around a remove/re-add cycle.

use crate::core::geo::{Extent, TileCoord};
use crate::events::{ListenerHandle, PropertyChange};
use crate::herald::Herald;
use crate::primary::layer::{Layer, LayerSource};
use crate::primary::map::PrimaryMap;
use crate::primary::source::TileSource;
use crate::primary::tilegrid::TileGrid;
use crate::secondary::map::SecondaryMap;
use crate::secondary::pane::{OverlayPane, TileOverlay};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Translates a secondary-convention tile coordinate (origin top-left,
/// y down) into the primary grid's convention (rows counting upward).
///
/// The y flip alone is correct for the standard top-left world origin. For
/// any other origin the grid is shifted by half the tile span at the
/// requested zoom, corrected by the tile-size exponent difference against
/// the secondary engine's fixed 256px tiles.
pub fn translate_tile_coord(grid: &TileGrid, coord: TileCoord) -> TileCoord {
    let mut x = coord.x;
    let mut y = -coord.y - 1;
    if !grid.has_default_origin() {
        let d = (grid.tile_size(coord.z) as f64 / 256.0).log2();
        let offset = (2_f64.powf(coord.z as f64 - d) / 2.0) as i64;
        x -= offset;
        y += offset;
    }
    TileCoord::new(x, y, coord.z)
}

/// Tile URL for a secondary-convention request, or `None` for "no tile".
///
/// Rejects coordinates outside the layer's resolution window and tiles
/// whose extent does not overlap the layer extent (or the projection
/// extent) with finite non-zero area. The source URL function is retried
/// once, for sources whose template is initialized lazily.
fn tile_url(source: &TileSource, layer: &Layer, coord: TileCoord) -> Option<String> {
    let grid = source.grid();
    let resolution = grid.resolution(coord.z)?;
    if !layer.in_resolution_window(resolution) {
        return None;
    }

    let translated = translate_tile_coord(grid, coord);
    let tile_extent = grid.tile_extent(translated)?;
    let bounds = layer.extent().unwrap_or_else(Extent::world);
    if !tile_extent.intersects_with_area(&bounds) {
        return None;
    }

    source.url(translated).or_else(|| source.url(translated))
}

struct TileItem {
    layer: Layer,
    mirror: TileOverlay,
    pane: OverlayPane,
    active: Rc<Cell<bool>>,
    /// Opacity to hand back to the primary layer on unpin
    saved_opacity: Cell<f64>,
    /// Primary layer currently forced to zero opacity
    pinned: Cell<bool>,
    /// Next opacity event is self-inflicted and must be ignored
    ignore_opacity: Cell<bool>,
    z_index: Cell<i32>,
    listeners: RefCell<Vec<ListenerHandle>>,
}

impl TileItem {
    /// Forces the primary layer to zero opacity, remembering the real value
    fn pin_primary(&self) {
        if self.pinned.get() {
            return;
        }
        self.saved_opacity.set(self.layer.opacity().get());
        self.pinned.set(true);
        self.ignore_opacity.set(true);
        self.layer.opacity().set(0.0);
    }

    /// Hands the saved opacity back to the primary layer
    fn unpin_primary(&self) {
        if !self.pinned.get() {
            return;
        }
        self.pinned.set(false);
        self.ignore_opacity.set(true);
        self.layer.opacity().set(self.saved_opacity.get());
    }

    /// Brings the mirror and the primary layer in line with the current
    /// activation and visibility state.
    fn sync(&self) {
        let show = self.active.get() && self.layer.visible().get();
        if show {
            self.pin_primary();
            self.mirror.set_opacity(self.saved_opacity.get());
            if !self.pane.contains(&self.mirror) {
                self.pane.insert(&self.mirror);
            }
        } else {
            self.pane.remove(&self.mirror);
            self.unpin_primary();
        }
    }

    fn on_opacity(&self, change: &PropertyChange<f64>) {
        if self.ignore_opacity.get() {
            self.ignore_opacity.set(false);
            return;
        }
        // Host-initiated change: the mirror carries the real opacity and
        // the primary layer goes straight back to zero.
        self.saved_opacity.set(change.new);
        if self.pinned.get() {
            self.mirror.set_opacity(change.new);
            self.ignore_opacity.set(true);
            self.layer.opacity().set(0.0);
        }
    }
}

struct TileHeraldInner {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    active: Rc<Cell<bool>>,
    items: RefCell<Vec<Rc<TileItem>>>,
}

/// Herald for raster tile layers
#[derive(Clone)]
pub struct TileHerald {
    inner: Rc<TileHeraldInner>,
}

impl TileHerald {
    pub fn new(primary: PrimaryMap, secondary: SecondaryMap) -> Self {
        Self {
            inner: Rc::new(TileHeraldInner {
                primary,
                secondary,
                active: Rc::new(Cell::new(false)),
                items: RefCell::new(Vec::new()),
            }),
        }
    }

    fn item_for(&self, layer: &Layer) -> Option<Rc<TileItem>> {
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

    /// Begins mirroring a tile layer. Watching an already-watched layer is
    /// a guarded no-op.
    pub fn watch(&self, layer: &Layer) {
        if self.is_watching(layer) {
            log::warn!("tile layer {} already watched, ignoring", layer.id());
            return;
        }
        let source = match layer.source() {
            LayerSource::Tile(source) => source.clone(),
            _ => {
                debug_assert!(false, "tile herald given a non-tile layer");
                return;
            }
        };

        let url_source = source.clone();
        let url_layer = layer.clone();
        let mirror = TileOverlay::new(
            move |coord| tile_url(&url_source, &url_layer, coord),
            layer.opacity().get(),
        );

        let item = Rc::new(TileItem {
            layer: layer.clone(),
            mirror,
            pane: self.inner.secondary.pane().clone(),
            active: Rc::clone(&self.inner.active),
            saved_opacity: Cell::new(layer.opacity().get()),
            pinned: Cell::new(false),
            ignore_opacity: Cell::new(false),
            z_index: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&item);
        let opacity_handle = layer.opacity().listen(move |change| {
            if let Some(item) = weak.upgrade() {
                item.on_opacity(change);
            }
        });
        let weak = Rc::downgrade(&item);
        let visible_handle = layer.visible().listen(move |_| {
            if let Some(item) = weak.upgrade() {
                item.sync();
            }
        });
        item.listeners
            .borrow_mut()
            .extend([opacity_handle, visible_handle]);

        log::debug!("watching tile layer {}", layer.id());
        self.inner.items.borrow_mut().push(Rc::clone(&item));
        item.sync();
    }

    /// Stops mirroring a layer, restoring its opacity. Unknown layers are a
    /// no-op.
    pub fn unwatch(&self, layer: &Layer) {
        let item = match self.item_for(layer) {
            Some(item) => item,
            None => return,
        };
        self.inner.items.borrow_mut().retain(|i| !i.layer.same(layer));
        item.pane.remove(&item.mirror);
        item.unpin_primary();
        item.listeners.borrow_mut().clear();
        log::debug!("unwatched tile layer {}", layer.id());
    }

    /// Flips the shared "secondary map is active" flag and syncs every
    /// cache item.
    pub fn set_secondary_active(&self, active: bool) {
        self.inner.active.set(active);
        let items: Vec<_> = self.inner.items.borrow().clone();
        for item in items {
            item.sync();
        }
    }

    /// Restacks every mirrored overlay to match the primary stacking order.
    ///
    /// The shared pane has no z-index API, so each overlay is removed and
    /// re-added, the freshly appended node discovered by diffing the pane's
    /// node list, and the z-index applied to that node one tick later (the
    /// node is not guaranteed present synchronously).
    pub fn order_layers(&self) {
        let items: Vec<_> = self.inner.items.borrow().clone();
        let pane = self.inner.secondary.pane().clone();
        let scheduler = self.inner.secondary.scheduler().clone();
        for item in items {
            let z = match self.inner.primary.layers().position_of(&item.layer) {
                Some(position) => position as i32,
                None => continue,
            };
            item.z_index.set(z);
            if !pane.contains(&item.mirror) {
                continue;
            }

            pane.remove(&item.mirror);
            let before = pane.node_ids();
            pane.insert(&item.mirror);
            let appended = pane
                .node_ids()
                .into_iter()
                .find(|id| !before.contains(id));

            if let Some(node) = appended {
                let pane = pane.clone();
                scheduler.defer(move || {
                    if !pane.set_node_z(node, z) {
                        log::debug!("pane node {node} gone before z-index applied");
                    }
                });
            }
        }
    }

    /// Number of watched layers
    pub fn watched_count(&self) -> usize {
        self.inner.items.borrow().len()
    }
}

impl Herald for TileHerald {
    fn activate(&self) {
        self.set_secondary_active(true);
    }

    fn deactivate(&self) {
        self.set_secondary_active(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::{Point, HALF_WORLD};
    use crate::primary::view::View;

    fn herald() -> (TileHerald, PrimaryMap, SecondaryMap) {
        let primary = PrimaryMap::new(View::new(Some(Point::new(0.0, 0.0)), 100.0));
        let secondary = SecondaryMap::new(800, 600);
        let herald = TileHerald::new(primary.clone(), secondary.clone());
        (herald, primary, secondary)
    }

    fn xyz_layer() -> Layer {
        Layer::tile(TileSource::new(TileGrid::xyz(), |coord| {
            Some(format!("/{}/{}/{}.png", coord.z, coord.x, coord.y))
        }))
    }

    #[test]
    fn test_default_origin_translation_flips_y() {
        let grid = TileGrid::xyz();
        assert_eq!(
            translate_tile_coord(&grid, TileCoord::new(0, 0, 1)),
            TileCoord::new(0, -1, 1)
        );
        assert_eq!(
            translate_tile_coord(&grid, TileCoord::new(3, 2, 2)),
            TileCoord::new(3, -3, 2)
        );
    }

    #[test]
    fn test_center_origin_translation_shifts_by_offset() {
        let grid = TileGrid::xyz().with_origin(Point::new(0.0, 0.0));
        // At z=3 the offset is 2^3 / 2 = 4 tiles; the tile just east and
        // north of the world center maps to grid tile (0, 0).
        let translated = translate_tile_coord(&grid, TileCoord::new(4, 3, 3));
        assert_eq!(translated, TileCoord::new(0, 0, 3));

        // Re-derive the configured origin from the translated tile.
        let extent = grid.tile_extent(translated).unwrap();
        assert_eq!(extent.min_x, 0.0);
        assert_eq!(extent.min_y, 0.0);
    }

    #[test]
    fn test_tile_rejected_outside_layer_extent() {
        let layer = xyz_layer();
        layer.set_extent(Some(Extent::new(0.0, 0.0, HALF_WORLD, HALF_WORLD)));
        let source = match layer.source() {
            LayerSource::Tile(s) => s.clone(),
            _ => unreachable!(),
        };

        // North-east quadrant tile intersects, south-west does not.
        assert!(tile_url(&source, &layer, TileCoord::new(1, 0, 1)).is_some());
        assert!(tile_url(&source, &layer, TileCoord::new(0, 1, 1)).is_none());
    }

    #[test]
    fn test_tile_rejected_outside_resolution_window() {
        let layer = xyz_layer();
        let z3 = crate::core::resolution::resolution_from_zoom(3);
        layer.set_resolution_window(z3 / 2.0, z3 * 2.0);
        let source = match layer.source() {
            LayerSource::Tile(s) => s.clone(),
            _ => unreachable!(),
        };

        assert!(tile_url(&source, &layer, TileCoord::new(0, 0, 3)).is_some());
        assert!(tile_url(&source, &layer, TileCoord::new(0, 0, 1)).is_none());
    }

    #[test]
    fn test_url_function_retried_once() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let layer = Layer::tile(TileSource::new(TileGrid::xyz(), move |_| {
            calls_clone.set(calls_clone.get() + 1);
            if calls_clone.get() == 1 {
                None
            } else {
                Some("late.png".to_string())
            }
        }));
        let source = match layer.source() {
            LayerSource::Tile(s) => s.clone(),
            _ => unreachable!(),
        };

        let url = tile_url(&source, &layer, TileCoord::new(0, 0, 1));
        assert_eq!(url, Some("late.png".to_string()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_opacity_pinned_while_active_and_restored() {
        let (herald, _primary, secondary) = herald();
        let layer = xyz_layer();
        layer.opacity().set(0.7);

        herald.watch(&layer);
        assert_eq!(layer.opacity().get(), 0.7);
        assert!(secondary.pane().is_empty());

        herald.set_secondary_active(true);
        assert_eq!(layer.opacity().get(), 0.0);
        assert_eq!(secondary.pane().len(), 1);

        // Host changes opacity: applied to the mirror, primary stays pinned.
        layer.opacity().set(0.4);
        assert_eq!(layer.opacity().get(), 0.0);

        herald.set_secondary_active(false);
        assert_eq!(layer.opacity().get(), 0.4);
        assert!(secondary.pane().is_empty());
    }

    #[test]
    fn test_unwatch_restores_and_releases_listeners() {
        let (herald, _primary, secondary) = herald();
        let layer = xyz_layer();
        layer.opacity().set(0.9);

        herald.watch(&layer);
        herald.set_secondary_active(true);
        assert_eq!(layer.opacity().get(), 0.0);

        herald.unwatch(&layer);
        assert_eq!(layer.opacity().get(), 0.9);
        assert!(secondary.pane().is_empty());
        assert_eq!(layer.opacity().listener_count(), 0);
        assert_eq!(layer.visible().listener_count(), 0);

        // Events after unwatch find no handler.
        layer.visible().set(false);
        layer.visible().set(true);
        assert!(secondary.pane().is_empty());
    }

    #[test]
    fn test_double_watch_is_noop() {
        let (herald, _primary, _secondary) = herald();
        let layer = xyz_layer();
        herald.watch(&layer);
        herald.watch(&layer);
        assert_eq!(herald.watched_count(), 1);
        assert_eq!(layer.opacity().listener_count(), 1);
    }

    #[test]
    fn test_z_order_applied_one_tick_later() {
        let (herald, primary, secondary) = herald();
        let bottom = xyz_layer();
        let top = xyz_layer();
        primary.layers().push(bottom.clone());
        primary.layers().push(top.clone());
        herald.watch(&bottom);
        herald.watch(&top);
        herald.set_secondary_active(true);

        herald.order_layers();
        secondary.scheduler().run_pending();

        let pane = secondary.pane();
        let bottom_item = herald.item_for(&bottom).unwrap();
        let top_item = herald.item_for(&top).unwrap();
        assert_eq!(pane.overlay_z(&bottom_item.mirror), Some(0));
        assert_eq!(pane.overlay_z(&top_item.mirror), Some(1));
    }
}
