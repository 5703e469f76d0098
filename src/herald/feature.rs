//! Feature herald: keeps one secondary data feature (and optional canvas
//! marker/label overlays) in sync with one primary vector feature.

use crate::core::geo::LatLng;
use crate::core::resolution::zoom_from_resolution;
use crate::events::{ListenerHandle, PropertyListener};
use crate::primary::feature::Feature;
use crate::primary::geometry::Geometry;
use crate::primary::layer::Layer;
use crate::primary::style::Style;
use crate::secondary::data::{DataCollection, DataFeature};
use crate::secondary::map::SecondaryMap;
use crate::secondary::overlay::{LabelOverlay, LabelText, MarkerIcon, MarkerOverlay};
use crate::secondary::translate::{data_geometry, data_style, lat_lng};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Marker/label zoom window derived from the layer's resolution window.
/// Higher resolution means lower zoom, so the bounds swap roles.
fn zoom_window(layer: &Layer) -> (f64, f64) {
    let (min_resolution, max_resolution) = layer.resolution_window();
    let min_zoom = if max_resolution.is_finite() {
        zoom_from_resolution(max_resolution)
    } else {
        0.0
    };
    let max_zoom = if min_resolution > 0.0 {
        zoom_from_resolution(min_resolution)
    } else {
        f64::INFINITY
    };
    (min_zoom, max_zoom)
}

struct FeatureHeraldInner {
    feature: Feature,
    layer: Layer,
    /// Real layer opacity, shared with the owning vector cache item. Read
    /// instead of the layer's live opacity, which is zero while pinned.
    layer_opacity: Rc<Cell<f64>>,
    collection: DataCollection,
    secondary: SecondaryMap,
    canvas_icons: bool,
    twin: DataFeature,
    marker: RefCell<Option<MarkerOverlay>>,
    label: RefCell<Option<LabelOverlay>>,
    visible: Cell<bool>,
    geometry_listener: RefCell<Option<PropertyListener>>,
    change_handle: RefCell<Option<ListenerHandle>>,
}

impl FeatureHeraldInner {
    /// Anchor coordinate shared by the marker and the label
    fn anchor(&self, geometry: &Geometry) -> Option<LatLng> {
        geometry.center().map(|center| lat_lng(&center))
    }

    fn sync_geometry(&self, geometry: &Geometry) {
        self.twin.set_geometry(data_geometry(geometry));
        if let Some(anchor) = self.anchor(geometry) {
            if let Some(marker) = self.marker.borrow().as_ref() {
                marker.set_position(anchor);
            }
            if let Some(label) = self.label.borrow().as_ref() {
                label.set_position(anchor);
            }
        }
    }

    /// Feature style overrides the layer default; neither means the twin
    /// falls back to the collection default.
    fn effective_style(&self) -> Option<Style> {
        self.feature.style().or_else(|| self.layer.style())
    }

    fn sync_style(&self) {
        let style = self.effective_style();
        match &style {
            Some(style) => match data_style(style, self.layer_opacity.get(), self.canvas_icons) {
                Ok(data) => self.twin.override_style(Some(data)),
                Err(err) => log::warn!("feature {} style skipped: {err}", self.feature.id()),
            },
            None => self.twin.override_style(None),
        }
        self.sync_marker(style.as_ref());
        self.sync_label(style.as_ref());
    }

    fn sync_marker(&self, style: Option<&Style>) {
        let icon = style.and_then(|s| s.icon.as_ref()).filter(|_| self.canvas_icons);
        let mut slot = self.marker.borrow_mut();
        match icon {
            Some(icon) => {
                let rendered = MarkerIcon {
                    src: icon.src.clone(),
                    width: icon.width,
                    height: icon.height,
                    anchor_x: icon.anchor_x,
                    anchor_y: icon.anchor_y,
                    rotation: icon.rotation,
                    opacity: icon.opacity * self.layer_opacity.get(),
                    scale: icon.scale,
                };
                match slot.as_ref() {
                    Some(marker) => marker.set_icon(rendered),
                    None => {
                        let anchor = self
                            .anchor(&self.feature.geometry().get())
                            .unwrap_or_default();
                        let marker = MarkerOverlay::new(anchor, rendered);
                        let (min_zoom, max_zoom) = zoom_window(&self.layer);
                        marker.set_zoom_window(min_zoom, max_zoom);
                        if self.visible.get() {
                            marker.set_map(Some(&self.secondary));
                        }
                        *slot = Some(marker);
                    }
                }
            }
            None => {
                if let Some(marker) = slot.take() {
                    marker.set_map(None);
                }
            }
        }
    }

    fn sync_label(&self, style: Option<&Style>) {
        let text = style.and_then(|s| s.text.as_ref());
        let mut slot = self.label.borrow_mut();
        match text {
            Some(text) => {
                let resolve = |color: &crate::primary::style::ColorSpec| match color.resolve() {
                    Ok(color) => Some(color.to_rgb_string()),
                    Err(err) => {
                        log::warn!("label color skipped: {err}");
                        None
                    }
                };
                let rendered = LabelText {
                    text: text.text.clone(),
                    font: text.font.clone(),
                    fill_color: text.fill.as_ref().and_then(&resolve),
                    stroke_color: text.stroke.as_ref().and_then(|s| resolve(&s.color)),
                    stroke_width: text.stroke.as_ref().map(|s| s.width).unwrap_or(0.0),
                    align: text.align,
                    offset_x: text.offset_x,
                    offset_y: text.offset_y,
                };
                match slot.as_ref() {
                    Some(label) => label.set_label(rendered),
                    None => {
                        let anchor = self
                            .anchor(&self.feature.geometry().get())
                            .unwrap_or_default();
                        let label = LabelOverlay::new(anchor, rendered);
                        let (min_zoom, max_zoom) = zoom_window(&self.layer);
                        label.set_zoom_window(min_zoom, max_zoom);
                        if self.visible.get() {
                            label.set_map(Some(&self.secondary));
                        }
                        *slot = Some(label);
                    }
                }
            }
            None => {
                if let Some(label) = slot.take() {
                    label.set_map(None);
                }
            }
        }
    }
}

/// Synchronizes one vector feature onto one secondary data feature plus
/// optional marker/label overlays.
#[derive(Clone)]
pub struct FeatureHerald {
    inner: Rc<FeatureHeraldInner>,
}

impl FeatureHerald {
    pub fn new(
        feature: Feature,
        layer: Layer,
        layer_opacity: Rc<Cell<f64>>,
        collection: DataCollection,
        secondary: SecondaryMap,
        canvas_icons: bool,
    ) -> Self {
        let twin = DataFeature::new(data_geometry(&feature.geometry().get()));
        let inner = Rc::new(FeatureHeraldInner {
            feature: feature.clone(),
            layer,
            layer_opacity,
            collection,
            secondary,
            canvas_icons,
            twin,
            marker: RefCell::new(None),
            label: RefCell::new(None),
            visible: Cell::new(false),
            geometry_listener: RefCell::new(None),
            change_handle: RefCell::new(None),
        });
        inner.sync_style();

        // Replacing the geometry object rewires onto the new geometry's
        // change signal; mutating the current geometry fires that signal.
        let weak = Rc::downgrade(&inner);
        let geometry_listener =
            PropertyListener::new(feature.geometry(), move |geometry: &Geometry, old| {
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => return Vec::new(),
                };
                if old.is_some() {
                    inner.sync_geometry(geometry);
                }
                let weak_change = Rc::downgrade(&inner);
                let tracked = geometry.clone();
                vec![geometry.changed().listen(move |_| {
                    if let Some(inner) = weak_change.upgrade() {
                        inner.sync_geometry(&tracked);
                    }
                })]
            });
        *inner.geometry_listener.borrow_mut() = Some(geometry_listener);

        let weak = Rc::downgrade(&inner);
        let change_handle = feature.changed().listen(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.sync_style();
            }
        });
        *inner.change_handle.borrow_mut() = Some(change_handle);

        Self { inner }
    }

    pub fn feature(&self) -> &Feature {
        &self.inner.feature
    }

    /// Recomputes the twin's style and overlays, picking up a changed real
    /// layer opacity.
    pub fn refresh_style(&self) {
        self.inner.sync_style();
    }

    /// Toggles the mirror's presence without destroying it: membership in
    /// the data collection plus map attachment of the marker and label.
    /// Symmetric and repeatable.
    pub fn set_visible(&self, visible: bool) {
        self.inner.visible.set(visible);
        if visible {
            self.inner.collection.add(&self.inner.twin);
            if let Some(marker) = self.inner.marker.borrow().as_ref() {
                marker.set_map(Some(&self.inner.secondary));
            }
            if let Some(label) = self.inner.label.borrow().as_ref() {
                label.set_map(Some(&self.inner.secondary));
            }
        } else {
            self.inner.collection.remove(&self.inner.twin);
            if let Some(marker) = self.inner.marker.borrow().as_ref() {
                marker.set_map(None);
            }
            if let Some(label) = self.inner.label.borrow().as_ref() {
                label.set_map(None);
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.get()
    }

    /// Detaches the mirror and releases every subscription. Called by the
    /// vector herald before the herald is dropped.
    pub fn dispose(&self) {
        self.set_visible(false);
        self.inner.geometry_listener.borrow_mut().take();
        self.inner.change_handle.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::primary::geometry::Shape;
    use crate::primary::source::VectorSource;
    use crate::primary::style::{Icon, TextStyle};
    use crate::secondary::data::DataGeometry;

    fn setup(style: Option<Style>) -> (FeatureHerald, Feature, DataCollection, SecondaryMap) {
        let secondary = SecondaryMap::new(400, 400);
        secondary.set_zoom(4.0);
        let collection = secondary.create_data_collection();
        let layer = Layer::vector(VectorSource::new());
        let feature = Feature::new(Geometry::point(Point::new(0.0, 0.0)));
        if let Some(style) = style {
            feature.set_style(Some(style));
        }
        let herald = FeatureHerald::new(
            feature.clone(),
            layer.clone(),
            Rc::new(Cell::new(layer.opacity().get())),
            collection.clone(),
            secondary.clone(),
            true,
        );
        (herald, feature, collection, secondary)
    }

    #[test]
    fn test_visibility_toggle_is_symmetric_and_repeatable() {
        let style = Style::new().with_icon(Icon::new("pin.png", 16, 16));
        let (herald, _feature, collection, secondary) = setup(Some(style));

        herald.set_visible(true);
        assert_eq!(collection.len(), 1);
        assert_eq!(secondary.attached_view_count(), 1);

        herald.set_visible(false);
        assert!(collection.is_empty());
        assert_eq!(secondary.attached_view_count(), 0);

        herald.set_visible(true);
        herald.set_visible(true);
        assert_eq!(collection.len(), 1);
        assert_eq!(secondary.attached_view_count(), 1);
    }

    #[test]
    fn test_geometry_mutation_updates_twin() {
        let (herald, feature, collection, _secondary) = setup(None);
        herald.set_visible(true);

        feature
            .geometry()
            .get()
            .set_shape(Shape::Point(Point::new(1000.0, 2000.0)));

        let mirrored = collection.features()[0].geometry();
        match mirrored {
            DataGeometry::Point(ll) => {
                let expected = lat_lng(&Point::new(1000.0, 2000.0));
                assert!((ll.lat - expected.lat).abs() < 1e-9);
                assert!((ll.lng - expected.lng).abs() < 1e-9);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn test_geometry_replacement_rewires_change_tracking() {
        let (herald, feature, collection, _secondary) = setup(None);
        herald.set_visible(true);
        let old_geometry = feature.geometry().get();

        let replacement = Geometry::line(vec![
            Point::new(0.0, 0.0),
            Point::new(1000.0, 0.0),
        ]);
        feature.set_geometry(replacement.clone());
        assert!(matches!(
            collection.features()[0].geometry(),
            DataGeometry::Line(_)
        ));
        assert_eq!(old_geometry.changed().listener_count(), 0);

        // Mutating the new geometry still syncs.
        replacement.set_shape(Shape::Point(Point::new(5.0, 5.0)));
        assert!(matches!(
            collection.features()[0].geometry(),
            DataGeometry::Point(_)
        ));
    }

    #[test]
    fn test_style_change_recomputes_twin_style() {
        let (herald, feature, collection, _secondary) = setup(None);
        herald.set_visible(true);
        assert!(collection.features()[0].style().is_none());

        feature.set_style(Some(Style::new().with_fill("rgba(10,20,30,0.5)")));
        let style = collection.features()[0].style().unwrap();
        assert_eq!(style.fill_color.unwrap(), "rgb(10,20,30)");
        assert_eq!(style.fill_opacity.unwrap(), 0.5);
    }

    #[test]
    fn test_label_created_and_removed_with_style() {
        let (herald, feature, _collection, secondary) = setup(None);
        herald.set_visible(true);
        assert_eq!(secondary.attached_view_count(), 0);

        feature.set_style(Some(Style::new().with_text(TextStyle::new("hi"))));
        assert_eq!(secondary.attached_view_count(), 1);

        feature.set_style(None);
        assert_eq!(secondary.attached_view_count(), 0);
    }

    #[test]
    fn test_dispose_releases_subscriptions() {
        let (herald, feature, collection, _secondary) = setup(None);
        herald.set_visible(true);
        let geometry = feature.geometry().get();

        herald.dispose();
        assert!(collection.is_empty());
        assert_eq!(feature.geometry().listener_count(), 0);
        assert_eq!(feature.changed().listener_count(), 0);
        assert_eq!(geometry.changed().listener_count(), 0);
    }
}
