//! Canvas-drawn overlay views.
//!
//! The secondary engine's custom overlay primitive hands us a canvas and a
//! geo-to-pixel projection; these types model drawing an icon, a text
//! label or a raster image at a geo-anchored screen position. Screen
//! placement is recomputed on every draw and the overlay hides itself
//! outside its min/max zoom window.

use crate::core::geo::{Extent, LatLng, Point};
use crate::primary::style::TextAlign;
use crate::secondary::map::SecondaryMap;
use crate::secondary::next_id;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Placement of an overlay's backing canvas: size, offset of the canvas
/// origin relative to the anchor, and the anchor's screen position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasBox {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

/// Icon rendering parameters for a marker overlay
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerIcon {
    pub src: String,
    pub width: u32,
    pub height: u32,
    /// Anchor as a fraction of the icon size
    pub anchor_x: f64,
    pub anchor_y: f64,
    /// Rotation in radians, clockwise
    pub rotation: f64,
    pub opacity: f64,
    pub scale: f64,
}

struct MarkerOverlayInner {
    id: u64,
    map: RefCell<Option<SecondaryMap>>,
    position: Cell<LatLng>,
    icon: RefCell<MarkerIcon>,
    min_zoom: Cell<f64>,
    max_zoom: Cell<f64>,
    canvas: RefCell<CanvasBox>,
    hidden: Cell<bool>,
}

/// Draws an icon image on a canvas anchored at a geographic position.
///
/// Used instead of the engine's native marker when the icon carries an
/// anchor, rotation or opacity the native marker API cannot express.
#[derive(Clone)]
pub struct MarkerOverlay {
    inner: Rc<MarkerOverlayInner>,
}

impl MarkerOverlay {
    pub fn new(position: LatLng, icon: MarkerIcon) -> Self {
        Self {
            inner: Rc::new(MarkerOverlayInner {
                id: next_id(),
                map: RefCell::new(None),
                position: Cell::new(position),
                icon: RefCell::new(icon),
                min_zoom: Cell::new(0.0),
                max_zoom: Cell::new(f64::INFINITY),
                canvas: RefCell::new(CanvasBox::default()),
                hidden: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn set_zoom_window(&self, min_zoom: f64, max_zoom: f64) {
        self.inner.min_zoom.set(min_zoom);
        self.inner.max_zoom.set(max_zoom);
    }

    /// Attaches to or detaches from a map, following the overlay-view
    /// onAdd/onRemove lifecycle
    pub fn set_map(&self, map: Option<&SecondaryMap>) {
        if let Some(current) = self.inner.map.borrow().as_ref() {
            current.unregister_view(self.inner.id);
        }
        *self.inner.map.borrow_mut() = map.cloned();
        if let Some(map) = map {
            map.register_view(self.inner.id);
            self.draw();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.map.borrow().is_some()
    }

    pub fn position(&self) -> LatLng {
        self.inner.position.get()
    }

    pub fn set_position(&self, position: LatLng) {
        self.inner.position.set(position);
        self.draw();
    }

    pub fn icon(&self) -> MarkerIcon {
        self.inner.icon.borrow().clone()
    }

    pub fn set_icon(&self, icon: MarkerIcon) {
        *self.inner.icon.borrow_mut() = icon;
        self.draw();
    }

    /// Hidden because the map zoom is outside the overlay's window
    pub fn is_hidden(&self) -> bool {
        self.inner.hidden.get()
    }

    /// Current canvas placement, as of the last draw
    pub fn canvas(&self) -> CanvasBox {
        *self.inner.canvas.borrow()
    }

    /// Recomputes canvas size and screen placement.
    ///
    /// The canvas is sized to the rotated bounding box of the icon
    /// (rotating the four corners around the anchor), because an unrotated
    /// canvas would clip a rotated icon.
    pub fn draw(&self) {
        let map = match self.inner.map.borrow().clone() {
            Some(map) => map,
            None => return,
        };

        let zoom = map.zoom();
        if zoom < self.inner.min_zoom.get() || zoom > self.inner.max_zoom.get() {
            self.inner.hidden.set(true);
            return;
        }
        self.inner.hidden.set(false);

        let icon = self.inner.icon.borrow();
        let w = icon.width as f64 * icon.scale;
        let h = icon.height as f64 * icon.scale;
        let anchor = Point::new(icon.anchor_x * w, icon.anchor_y * h);

        let corners = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(0.0, h),
            Point::new(w, h),
        ];
        let rotated: Vec<Point> = corners
            .iter()
            .map(|c| c.subtract(&anchor).rotate_around(&Point::default(), icon.rotation))
            .collect();
        let bounds = match Extent::from_points(&rotated) {
            Some(bounds) => bounds,
            None => return,
        };

        let screen = map.geo_to_pixel(&self.inner.position.get());
        *self.inner.canvas.borrow_mut() = CanvasBox {
            width: bounds.width(),
            height: bounds.height(),
            offset_x: bounds.min_x,
            offset_y: bounds.min_y,
            screen_x: screen.x,
            screen_y: screen.y,
        };
    }
}

/// Label rendering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LabelText {
    pub text: String,
    pub font: String,
    pub fill_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: f64,
    pub align: TextAlign,
    pub offset_x: f64,
    pub offset_y: f64,
}

struct LabelOverlayInner {
    id: u64,
    map: RefCell<Option<SecondaryMap>>,
    position: Cell<LatLng>,
    label: RefCell<LabelText>,
    min_zoom: Cell<f64>,
    max_zoom: Cell<f64>,
    canvas: RefCell<CanvasBox>,
    hidden: Cell<bool>,
}

/// Draws a multi-line text label on a dynamically sized canvas anchored at
/// a geographic position.
#[derive(Clone)]
pub struct LabelOverlay {
    inner: Rc<LabelOverlayInner>,
}

const LABEL_PADDING: f64 = 2.0;

impl LabelOverlay {
    pub fn new(position: LatLng, label: LabelText) -> Self {
        Self {
            inner: Rc::new(LabelOverlayInner {
                id: next_id(),
                map: RefCell::new(None),
                position: Cell::new(position),
                label: RefCell::new(label),
                min_zoom: Cell::new(0.0),
                max_zoom: Cell::new(f64::INFINITY),
                canvas: RefCell::new(CanvasBox::default()),
                hidden: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn set_zoom_window(&self, min_zoom: f64, max_zoom: f64) {
        self.inner.min_zoom.set(min_zoom);
        self.inner.max_zoom.set(max_zoom);
    }

    pub fn set_map(&self, map: Option<&SecondaryMap>) {
        if let Some(current) = self.inner.map.borrow().as_ref() {
            current.unregister_view(self.inner.id);
        }
        *self.inner.map.borrow_mut() = map.cloned();
        if let Some(map) = map {
            map.register_view(self.inner.id);
            self.draw();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.map.borrow().is_some()
    }

    pub fn position(&self) -> LatLng {
        self.inner.position.get()
    }

    pub fn set_position(&self, position: LatLng) {
        self.inner.position.set(position);
        self.draw();
    }

    pub fn label(&self) -> LabelText {
        self.inner.label.borrow().clone()
    }

    pub fn set_label(&self, label: LabelText) {
        *self.inner.label.borrow_mut() = label;
        self.draw();
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden.get()
    }

    pub fn canvas(&self) -> CanvasBox {
        *self.inner.canvas.borrow()
    }

    /// Recomputes the backing canvas size from the measured text and the
    /// anchor's screen position. Text splits on explicit line breaks.
    pub fn draw(&self) {
        let map = match self.inner.map.borrow().clone() {
            Some(map) => map,
            None => return,
        };

        let zoom = map.zoom();
        if zoom < self.inner.min_zoom.get() || zoom > self.inner.max_zoom.get() {
            self.inner.hidden.set(true);
            return;
        }
        self.inner.hidden.set(false);

        let label = self.inner.label.borrow();
        let font_size = font_size_px(&label.font);
        let line_height = font_size * 1.2;
        let char_width = font_size * 0.6;

        let lines: Vec<&str> = label.text.split('\n').collect();
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = widest as f64 * char_width + 2.0 * LABEL_PADDING;
        let height = lines.len() as f64 * line_height + 2.0 * LABEL_PADDING;

        let offset_x = match label.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width / 2.0,
            TextAlign::Right => -width,
        } + label.offset_x;
        let offset_y = -height / 2.0 + label.offset_y;

        let screen = map.geo_to_pixel(&self.inner.position.get());
        *self.inner.canvas.borrow_mut() = CanvasBox {
            width,
            height,
            offset_x,
            offset_y,
            screen_x: screen.x,
            screen_y: screen.y,
        };
    }
}

/// Leading pixel size of a CSS font shorthand, defaulting to 10
fn font_size_px(font: &str) -> f64 {
    font.split_whitespace()
        .find_map(|token| token.strip_suffix("px"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(10.0)
}

struct GroundOverlayInner {
    id: u64,
    url: String,
    /// Geographic anchor of the image's top-left corner
    anchor: LatLng,
    width_px: u32,
    height_px: u32,
    z_index: Cell<i32>,
    attached: Cell<bool>,
}

/// A manually positioned, manually sized raster image overlay
#[derive(Clone)]
pub struct GroundOverlay {
    inner: Rc<GroundOverlayInner>,
}

impl GroundOverlay {
    pub fn new(url: impl Into<String>, anchor: LatLng, width_px: u32, height_px: u32) -> Self {
        Self {
            inner: Rc::new(GroundOverlayInner {
                id: next_id(),
                url: url.into(),
                anchor,
                width_px,
                height_px,
                z_index: Cell::new(0),
                attached: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn anchor(&self) -> LatLng {
        self.inner.anchor
    }

    pub fn size_px(&self) -> (u32, u32) {
        (self.inner.width_px, self.inner.height_px)
    }

    pub fn z_index(&self) -> i32 {
        self.inner.z_index.get()
    }

    pub fn set_z_index(&self, z_index: i32) {
        self.inner.z_index.set(z_index);
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }

    pub(crate) fn mark_attached(&self, attached: bool) {
        self.inner.attached.set(attached);
    }

    pub fn same(&self, other: &GroundOverlay) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn test_map() -> SecondaryMap {
        let map = SecondaryMap::new(400, 400);
        map.set_center(LatLng::new(0.0, 0.0));
        map.set_zoom(4.0);
        map
    }

    fn plain_icon() -> MarkerIcon {
        MarkerIcon {
            src: "icon.png".to_string(),
            width: 20,
            height: 10,
            anchor_x: 0.5,
            anchor_y: 0.5,
            rotation: 0.0,
            opacity: 1.0,
            scale: 1.0,
        }
    }

    #[test]
    fn test_marker_canvas_unrotated() {
        let map = test_map();
        let marker = MarkerOverlay::new(LatLng::new(0.0, 0.0), plain_icon());
        marker.set_map(Some(&map));

        let canvas = marker.canvas();
        assert_eq!(canvas.width, 20.0);
        assert_eq!(canvas.height, 10.0);
        assert_eq!(canvas.offset_x, -10.0);
        assert_eq!(canvas.offset_y, -5.0);
        assert_eq!(canvas.screen_x, 200.0);
    }

    #[test]
    fn test_marker_canvas_grows_for_rotation() {
        let map = test_map();
        let mut icon = plain_icon();
        icon.rotation = FRAC_PI_2;
        let marker = MarkerOverlay::new(LatLng::new(0.0, 0.0), icon);
        marker.set_map(Some(&map));

        // A 20x10 icon rotated a quarter turn needs a 10x20 canvas.
        let canvas = marker.canvas();
        assert!((canvas.width - 10.0).abs() < 1e-9);
        assert!((canvas.height - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_marker_hides_outside_zoom_window() {
        let map = test_map();
        let marker = MarkerOverlay::new(LatLng::new(0.0, 0.0), plain_icon());
        marker.set_zoom_window(6.0, 10.0);
        marker.set_map(Some(&map));
        assert!(marker.is_hidden());

        map.set_zoom(8.0);
        marker.draw();
        assert!(!marker.is_hidden());
    }

    #[test]
    fn test_marker_attach_detach() {
        let map = test_map();
        let marker = MarkerOverlay::new(LatLng::new(0.0, 0.0), plain_icon());

        marker.set_map(Some(&map));
        assert!(map.view_attached(marker.id()));

        marker.set_map(None);
        assert!(!map.view_attached(marker.id()));
        assert_eq!(map.attached_view_count(), 0);
    }

    #[test]
    fn test_label_measures_multiline_text() {
        let map = test_map();
        let label = LabelOverlay::new(
            LatLng::new(0.0, 0.0),
            LabelText {
                text: "short\na much longer line".to_string(),
                font: "10px sans-serif".to_string(),
                fill_color: None,
                stroke_color: None,
                stroke_width: 0.0,
                align: TextAlign::Center,
                offset_x: 0.0,
                offset_y: 0.0,
            },
        );
        label.set_map(Some(&map));

        let canvas = label.canvas();
        // 18 chars * 6px + padding, two lines of 12px + padding.
        assert_eq!(canvas.width, 18.0 * 6.0 + 4.0);
        assert_eq!(canvas.height, 2.0 * 12.0 + 4.0);
        assert_eq!(canvas.offset_x, -canvas.width / 2.0);
    }

    #[test]
    fn test_font_size_parsing() {
        assert_eq!(font_size_px("12px monospace"), 12.0);
        assert_eq!(font_size_px("bold 14px sans-serif"), 14.0);
        assert_eq!(font_size_px("sans-serif"), 10.0);
    }
}
