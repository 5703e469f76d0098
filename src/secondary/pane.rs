//! The shared tile-overlay pane.
//!
//! The secondary engine renders every registered tile overlay into one
//! shared pane with no public z-index API. Each registration appends a
//! fresh node; stacking is adjusted by styling nodes directly, which is
//! why the tile herald discovers nodes by diffing the pane's node list
//! around a remove/re-add cycle.

use crate::core::geo::TileCoord;
use crate::secondary::next_id;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Tile URL callback in the secondary convention: origin top-left,
/// y increasing downward.
pub type TileUrlFn = Rc<dyn Fn(TileCoord) -> Option<String>>;

struct TileOverlayInner {
    id: u64,
    url_fn: RefCell<Option<TileUrlFn>>,
    opacity: Cell<f64>,
}

/// A tile-URL-generating overlay registered with the secondary map
#[derive(Clone)]
pub struct TileOverlay {
    inner: Rc<TileOverlayInner>,
}

impl TileOverlay {
    pub fn new<F: Fn(TileCoord) -> Option<String> + 'static>(url_fn: F, opacity: f64) -> Self {
        Self {
            inner: Rc::new(TileOverlayInner {
                id: next_id(),
                url_fn: RefCell::new(Some(Rc::new(url_fn))),
                opacity: Cell::new(opacity),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// URL for a tile request from the secondary engine
    pub fn tile_url(&self, coord: TileCoord) -> Option<String> {
        let url_fn = self.inner.url_fn.borrow().clone()?;
        url_fn(coord)
    }

    pub fn opacity(&self) -> f64 {
        self.inner.opacity.get()
    }

    pub fn set_opacity(&self, opacity: f64) {
        self.inner.opacity.set(opacity);
    }

    pub fn same(&self, other: &TileOverlay) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

struct PaneEntry {
    overlay: TileOverlay,
    node_id: u64,
    z_index: Cell<i32>,
}

struct OverlayPaneInner {
    entries: RefCell<Vec<PaneEntry>>,
}

/// Ordered list of registered tile overlays and their DOM nodes
#[derive(Clone)]
pub struct OverlayPane {
    inner: Rc<OverlayPaneInner>,
}

impl Default for OverlayPane {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayPane {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(OverlayPaneInner {
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Registers an overlay, appending a fresh node to the pane
    pub fn insert(&self, overlay: &TileOverlay) {
        self.inner.entries.borrow_mut().push(PaneEntry {
            overlay: overlay.clone(),
            node_id: next_id(),
            z_index: Cell::new(0),
        });
    }

    /// Unregisters an overlay and drops its node; absent overlays are a
    /// no-op
    pub fn remove(&self, overlay: &TileOverlay) {
        self.inner
            .entries
            .borrow_mut()
            .retain(|e| !e.overlay.same(overlay));
    }

    pub fn contains(&self, overlay: &TileOverlay) -> bool {
        self.inner
            .entries
            .borrow()
            .iter()
            .any(|e| e.overlay.same(overlay))
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Snapshot of the pane's child node ids, in document order
    pub fn node_ids(&self) -> Vec<u64> {
        self.inner.entries.borrow().iter().map(|e| e.node_id).collect()
    }

    /// Styles a node's z-index directly; false when the node is gone
    pub fn set_node_z(&self, node_id: u64, z_index: i32) -> bool {
        let entries = self.inner.entries.borrow();
        match entries.iter().find(|e| e.node_id == node_id) {
            Some(entry) => {
                entry.z_index.set(z_index);
                true
            }
            None => false,
        }
    }

    /// Current z-index styled onto an overlay's node
    pub fn overlay_z(&self, overlay: &TileOverlay) -> Option<i32> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|e| e.overlay.same(overlay))
            .map(|e| e.z_index.get())
    }
}
