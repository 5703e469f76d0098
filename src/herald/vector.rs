//! Vector source herald: mirrors vector layers as secondary data
//! collections, one feature herald per contained feature.
//!
//! Like the tile herald, a shown layer has its primary opacity pinned to
//! zero so the features never double-render under their mirrors; the real
//! opacity is remembered and flows into the mirrored styles instead.

use crate::events::{ListenerHandle, PropertyChange, PropertyListener};
use crate::herald::{FeatureHerald, Herald};
use crate::primary::layer::{Layer, LayerSource};
use crate::primary::map::PrimaryMap;
use crate::primary::view::View;
use crate::secondary::data::DataCollection;
use crate::secondary::map::SecondaryMap;
use crate::secondary::translate::data_style;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct VectorItem {
    layer: Layer,
    collection: DataCollection,
    heralds: RefCell<Vec<FeatureHerald>>,
    primary: PrimaryMap,
    active: Rc<Cell<bool>>,
    canvas_icons: bool,
    /// Feature mirrors currently shown, as opposed to hidden because the
    /// view left the layer's resolution window or the layer is invisible
    shown: Cell<bool>,
    /// Real layer opacity; the mirrors render with this and the primary
    /// layer gets it back on unpin. Shared with the feature heralds.
    saved_opacity: Rc<Cell<f64>>,
    /// Primary layer currently forced to zero opacity
    pinned: Cell<bool>,
    /// Next opacity event is self-inflicted and must be ignored
    ignore_opacity: Cell<bool>,
    listeners: RefCell<Vec<ListenerHandle>>,
    view_listener: RefCell<Option<PropertyListener>>,
}

impl VectorItem {
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

    /// Recomputes the collection's default style from the real opacity
    fn refresh_default_style(&self) {
        if let Some(style) = self.layer.style() {
            match data_style(&style, self.saved_opacity.get(), self.canvas_icons) {
                Ok(data) => self.collection.set_default_style(Some(data)),
                Err(err) => log::warn!("layer {} default style skipped: {err}", self.layer.id()),
            }
        }
    }

    fn on_opacity(&self, change: &PropertyChange<f64>) {
        if self.ignore_opacity.get() {
            self.ignore_opacity.set(false);
            return;
        }
        // Host-initiated change: the mirrors carry the real opacity and,
        // while pinned, the primary layer goes straight back to zero.
        self.saved_opacity.set(change.new);
        self.refresh_default_style();
        for herald in self.heralds.borrow().iter() {
            herald.refresh_style();
        }
        if self.pinned.get() {
            self.ignore_opacity.set(true);
            self.layer.opacity().set(0.0);
        }
    }

    /// Shows or hides every feature mirror without destroying any of them,
    /// pinning the primary layer's opacity while the mirrors are shown.
    fn update_visibility(&self) {
        let resolution = self.primary.view().get().resolution().get();
        let show = self.active.get()
            && self.layer.visible().get()
            && self.layer.in_resolution_window(resolution);
        if show == self.shown.get() {
            return;
        }
        self.shown.set(show);
        if show {
            self.pin_primary();
        }
        for herald in self.heralds.borrow().iter() {
            herald.set_visible(show);
        }
        if !show {
            self.unpin_primary();
        }
    }
}

struct VectorHeraldInner {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    canvas_icons: bool,
    active: Rc<Cell<bool>>,
    items: RefCell<Vec<Rc<VectorItem>>>,
}

/// Herald for vector layers
#[derive(Clone)]
pub struct VectorHerald {
    inner: Rc<VectorHeraldInner>,
}

impl VectorHerald {
    pub fn new(primary: PrimaryMap, secondary: SecondaryMap, canvas_icons: bool) -> Self {
        Self {
            inner: Rc::new(VectorHeraldInner {
                primary,
                secondary,
                canvas_icons,
                active: Rc::new(Cell::new(false)),
                items: RefCell::new(Vec::new()),
            }),
        }
    }

    fn item_for(&self, layer: &Layer) -> Option<Rc<VectorItem>> {
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

    fn make_feature_herald(
        &self,
        item: &VectorItem,
        feature: crate::primary::feature::Feature,
    ) -> FeatureHerald {
        FeatureHerald::new(
            feature,
            item.layer.clone(),
            Rc::clone(&item.saved_opacity),
            item.collection.clone(),
            self.inner.secondary.clone(),
            self.inner.canvas_icons,
        )
    }

    /// Begins mirroring a vector layer. Watching an already-watched layer
    /// is a guarded no-op.
    pub fn watch(&self, layer: &Layer) {
        if self.is_watching(layer) {
            log::warn!("vector layer {} already watched, ignoring", layer.id());
            return;
        }
        let source = match layer.source() {
            LayerSource::Vector(source) => source.clone(),
            _ => {
                debug_assert!(false, "vector herald given a non-vector layer");
                return;
            }
        };

        let collection = self.inner.secondary.create_data_collection();
        let item = Rc::new(VectorItem {
            layer: layer.clone(),
            collection,
            heralds: RefCell::new(Vec::new()),
            primary: self.inner.primary.clone(),
            active: Rc::clone(&self.inner.active),
            canvas_icons: self.inner.canvas_icons,
            shown: Cell::new(false),
            saved_opacity: Rc::new(Cell::new(layer.opacity().get())),
            pinned: Cell::new(false),
            ignore_opacity: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            view_listener: RefCell::new(None),
        });
        item.refresh_default_style();

        // Initial scan of the source's current features.
        let heralds: Vec<FeatureHerald> = source
            .features()
            .into_iter()
            .map(|feature| self.make_feature_herald(&item, feature))
            .collect();
        *item.heralds.borrow_mut() = heralds;

        let secondary = self.inner.secondary.clone();
        let canvas_icons = self.inner.canvas_icons;
        let weak = Rc::downgrade(&item);
        let added_handle = source.added().listen(move |feature| {
            if let Some(item) = weak.upgrade() {
                let feature_herald = FeatureHerald::new(
                    feature.clone(),
                    item.layer.clone(),
                    Rc::clone(&item.saved_opacity),
                    item.collection.clone(),
                    secondary.clone(),
                    canvas_icons,
                );
                feature_herald.set_visible(item.shown.get());
                item.heralds.borrow_mut().push(feature_herald);
            }
        });
        let weak = Rc::downgrade(&item);
        let removed_handle = source.removed().listen(move |feature| {
            if let Some(item) = weak.upgrade() {
                let mut heralds = item.heralds.borrow_mut();
                if let Some(index) = heralds.iter().position(|h| h.feature().same(feature)) {
                    let gone = heralds.remove(index);
                    drop(heralds);
                    gone.dispose();
                }
            }
        });
        let weak = Rc::downgrade(&item);
        let visible_handle = layer.visible().listen(move |_| {
            if let Some(item) = weak.upgrade() {
                item.update_visibility();
            }
        });
        let weak = Rc::downgrade(&item);
        let opacity_handle = layer.opacity().listen(move |change| {
            if let Some(item) = weak.upgrade() {
                item.on_opacity(change);
            }
        });
        item.listeners
            .borrow_mut()
            .extend([added_handle, removed_handle, visible_handle, opacity_handle]);

        // The view's resolution crossing the layer's window toggles feature
        // visibility; the view object itself may be replaced.
        let weak = Rc::downgrade(&item);
        let view_listener =
            PropertyListener::new(self.inner.primary.view(), move |view: &View, _old| {
                let item = match weak.upgrade() {
                    Some(item) => item,
                    None => return Vec::new(),
                };
                item.update_visibility();
                let weak_resolution = Rc::downgrade(&item);
                vec![view.resolution().listen(move |_| {
                    if let Some(item) = weak_resolution.upgrade() {
                        item.update_visibility();
                    }
                })]
            });
        *item.view_listener.borrow_mut() = Some(view_listener);

        log::debug!("watching vector layer {}", layer.id());
        self.inner.items.borrow_mut().push(Rc::clone(&item));
        item.update_visibility();
    }

    /// Stops mirroring a layer, destroying its feature mirrors and the
    /// backing data collection and restoring the layer's opacity. Unknown
    /// layers are a no-op.
    pub fn unwatch(&self, layer: &Layer) {
        let item = match self.item_for(layer) {
            Some(item) => item,
            None => return,
        };
        self.inner.items.borrow_mut().retain(|i| !i.layer.same(layer));
        for herald in item.heralds.borrow_mut().drain(..) {
            herald.dispose();
        }
        self.inner.secondary.remove_data_collection(&item.collection);
        item.unpin_primary();
        item.listeners.borrow_mut().clear();
        item.view_listener.borrow_mut().take();
        log::debug!("unwatched vector layer {}", layer.id());
    }

    pub fn set_secondary_active(&self, active: bool) {
        self.inner.active.set(active);
        let items: Vec<_> = self.inner.items.borrow().clone();
        for item in items {
            item.update_visibility();
        }
    }

    pub fn watched_count(&self) -> usize {
        self.inner.items.borrow().len()
    }
}

impl Herald for VectorHerald {
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
    use crate::core::geo::Point;
    use crate::primary::feature::Feature;
    use crate::primary::geometry::Geometry;
    use crate::primary::source::VectorSource;
    use crate::primary::style::Style;

    fn setup() -> (VectorHerald, PrimaryMap, SecondaryMap, Layer, VectorSource) {
        let primary = PrimaryMap::new(View::new(Some(Point::new(0.0, 0.0)), 100.0));
        let secondary = SecondaryMap::new(400, 400);
        let herald = VectorHerald::new(primary.clone(), secondary.clone(), true);
        let source = VectorSource::new();
        let layer = Layer::vector(source.clone());
        (herald, primary, secondary, layer, source)
    }

    #[test]
    fn test_initial_scan_and_add_remove_tracking() {
        let (herald, _primary, secondary, layer, source) = setup();
        source.add_feature(Feature::new(Geometry::point(Point::new(0.0, 0.0))));

        herald.watch(&layer);
        herald.set_secondary_active(true);
        let collection = secondary.data_collections()[0].clone();
        assert_eq!(collection.len(), 1);

        let late = Feature::new(Geometry::point(Point::new(10.0, 10.0)));
        source.add_feature(late.clone());
        assert_eq!(collection.len(), 2);

        source.remove_feature(&late);
        assert_eq!(collection.len(), 1);
        assert_eq!(late.changed().listener_count(), 0);
    }

    #[test]
    fn test_resolution_window_hides_without_destroying() {
        let (herald, primary, secondary, layer, source) = setup();
        layer.set_resolution_window(50.0, 200.0);
        source.add_feature(Feature::new(Geometry::point(Point::new(0.0, 0.0))));

        herald.watch(&layer);
        herald.set_secondary_active(true);
        let collection = secondary.data_collections()[0].clone();
        assert_eq!(collection.len(), 1);

        // Leave the window: hidden, not destroyed.
        primary.view().get().resolution().set(500.0);
        assert!(collection.is_empty());

        primary.view().get().resolution().set(100.0);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_layer_visibility_toggles_features() {
        let (herald, _primary, secondary, layer, source) = setup();
        source.add_feature(Feature::new(Geometry::point(Point::new(0.0, 0.0))));
        herald.watch(&layer);
        herald.set_secondary_active(true);
        let collection = secondary.data_collections()[0].clone();

        layer.visible().set(false);
        assert!(collection.is_empty());
        layer.visible().set(true);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_unwatch_destroys_collection_and_listeners() {
        let (herald, primary, secondary, layer, source) = setup();
        let feature = Feature::new(Geometry::point(Point::new(0.0, 0.0)));
        source.add_feature(feature.clone());
        herald.watch(&layer);
        herald.set_secondary_active(true);

        herald.unwatch(&layer);
        assert!(secondary.data_collections().is_empty());
        assert_eq!(layer.opacity().get(), 1.0);
        assert_eq!(layer.opacity().listener_count(), 0);
        assert_eq!(layer.visible().listener_count(), 0);
        assert_eq!(primary.view().get().resolution().listener_count(), 0);
        assert_eq!(feature.changed().listener_count(), 0);

        // Events after unwatch find no handler.
        source.add_feature(Feature::new(Geometry::point(Point::new(1.0, 1.0))));
        assert!(secondary.data_collections().is_empty());
    }

    #[test]
    fn test_primary_layer_pinned_while_shown_and_restored() {
        let (herald, _primary, _secondary, layer, source) = setup();
        layer.opacity().set(0.7);
        source.add_feature(Feature::new(Geometry::point(Point::new(0.0, 0.0))));
        herald.watch(&layer);
        assert_eq!(layer.opacity().get(), 0.7);

        herald.set_secondary_active(true);
        assert_eq!(layer.opacity().get(), 0.0);

        herald.set_secondary_active(false);
        assert_eq!(layer.opacity().get(), 0.7);
    }

    #[test]
    fn test_host_opacity_change_lands_on_mirrors_while_pinned() {
        let (herald, _primary, secondary, layer, source) = setup();
        layer.set_style(Some(Style::new().with_fill("rgb(10,20,30)")));
        layer.opacity().set(0.5);
        let feature = Feature::new(Geometry::point(Point::new(0.0, 0.0)))
            .with_style(Style::new().with_fill("rgba(1,2,3,0.5)"));
        source.add_feature(feature);
        herald.watch(&layer);
        herald.set_secondary_active(true);
        assert_eq!(layer.opacity().get(), 0.0);

        // Host changes opacity: applied to the mirrors, primary stays
        // pinned.
        layer.opacity().set(0.8);
        assert_eq!(layer.opacity().get(), 0.0);
        let collection = secondary.data_collections()[0].clone();
        let default = collection.default_style().unwrap();
        assert_eq!(default.fill_opacity.unwrap(), 0.8);
        let twin = collection.features()[0].style().unwrap();
        assert_eq!(twin.fill_opacity.unwrap(), 0.5 * 0.8);

        herald.set_secondary_active(false);
        assert_eq!(layer.opacity().get(), 0.8);
    }

    #[test]
    fn test_feature_added_while_hidden_stays_hidden() {
        let (herald, _primary, secondary, layer, source) = setup();
        herald.watch(&layer);
        let collection = secondary.data_collections()[0].clone();

        // Inactive: new features are tracked but not shown.
        source.add_feature(Feature::new(Geometry::point(Point::new(0.0, 0.0))));
        assert!(collection.is_empty());

        herald.set_secondary_active(true);
        assert_eq!(collection.len(), 1);
    }
}
