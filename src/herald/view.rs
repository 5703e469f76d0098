//! View herald: one-directional sync of center, zoom and rotation onto the
//! secondary map.
//!
//! Rotation has no native API on the secondary side, so it is applied as a
//! CSS transform on the inner tile pane, paired with a once-per-load
//! square resize of the outer container so the rotated viewport exposes no
//! blank corners. The fix-up waits for the secondary engine's tiles to
//! settle before measuring.

use crate::core::resolution::zoom_from_resolution;
use crate::events::{ListenerHandle, PropertyListener};
use crate::herald::Herald;
use crate::primary::map::PrimaryMap;
use crate::primary::view::View;
use crate::secondary::map::SecondaryMap;
use crate::secondary::scheduler::TaskId;
use crate::secondary::translate::lat_lng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Debounce window for window-resize recentering
const RESIZE_DEBOUNCE_MS: u64 = 100;

struct ViewHeraldInner {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    active: Cell<bool>,
    view_listener: RefCell<Option<PropertyListener>>,
    resize_handle: RefCell<Option<ListenerHandle>>,
    idle_handle: RefCell<Option<ListenerHandle>>,
    resize_task: Cell<Option<TaskId>>,
}

impl ViewHeraldInner {
    fn push_center(&self, view: &View) {
        if let Some(center) = view.center().get() {
            let target = lat_lng(&center);
            if target.is_valid() {
                self.secondary.set_center(target);
            } else {
                log::warn!("center {target:?} out of range, not pushed");
            }
        }
    }

    fn push_zoom(&self, view: &View) {
        self.secondary
            .set_zoom(zoom_from_resolution(view.resolution().get()));
    }

    /// Primary rotation is counter-clockwise radians; the CSS transform
    /// wants clockwise degrees.
    fn push_rotation(self: &Rc<Self>, view: &View) {
        let degrees = -view.rotation().get().to_degrees();
        self.secondary.set_tile_pane_rotation(degrees);
        if degrees != 0.0 {
            self.fix_up_rotation();
        }
    }

    fn push_all(self: &Rc<Self>, view: &View) {
        self.push_rotation(view);
        self.push_center(view);
        self.push_zoom(view);
    }

    /// Squares the container once tiles have settled; before that, waits on
    /// the engine's idle event.
    fn fix_up_rotation(self: &Rc<Self>) {
        if self.secondary.tiles_loaded() {
            self.apply_square();
        } else if self.idle_handle.borrow().is_none() {
            let weak = Rc::downgrade(self);
            let handle = self.secondary.idle().listen(move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.apply_square();
                }
            });
            *self.idle_handle.borrow_mut() = Some(handle);
        }
    }

    fn apply_square(&self) {
        if !self.active.get() {
            return;
        }
        if self.secondary.square_container() {
            self.secondary.trigger_resize();
            self.push_center(&self.primary.view().get());
        }
    }

    /// Window resizes only recenter, debounced by cancel-and-reschedule.
    fn debounce_recenter(self: &Rc<Self>) {
        if let Some(task) = self.resize_task.take() {
            self.secondary.scheduler().cancel(task);
        }
        let weak = Rc::downgrade(self);
        let task = self
            .secondary
            .scheduler()
            .timeout(RESIZE_DEBOUNCE_MS, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.resize_task.set(None);
                    inner.push_center(&inner.primary.view().get());
                }
            });
        self.resize_task.set(Some(task));
    }
}

/// Herald for the primary view's center, zoom and rotation
#[derive(Clone)]
pub struct ViewHerald {
    inner: Rc<ViewHeraldInner>,
}

impl ViewHerald {
    pub fn new(primary: PrimaryMap, secondary: SecondaryMap) -> Self {
        Self {
            inner: Rc::new(ViewHeraldInner {
                primary,
                secondary,
                active: Cell::new(false),
                view_listener: RefCell::new(None),
                resize_handle: RefCell::new(None),
                idle_handle: RefCell::new(None),
                resize_task: Cell::new(None),
            }),
        }
    }

    /// Re-pushes the full view state. Used as a defensive re-sync after a
    /// forced secondary resize.
    pub fn sync_now(&self) {
        if self.inner.active.get() {
            self.inner.push_all(&self.inner.primary.view().get());
        }
    }
}

impl Herald for ViewHerald {
    fn activate(&self) {
        if self.inner.active.get() {
            return;
        }
        self.inner.active.set(true);

        // Center/resolution/rotation subscriptions are rewired whenever the
        // host replaces the view object.
        let weak = Rc::downgrade(&self.inner);
        let view_listener =
            PropertyListener::new(self.inner.primary.view(), move |view: &View, _old| {
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => return Vec::new(),
                };
                inner.push_all(view);
                let weak_center = Rc::downgrade(&inner);
                let weak_zoom = Rc::downgrade(&inner);
                let weak_rotation = Rc::downgrade(&inner);
                let center_view = view.clone();
                let zoom_view = view.clone();
                let rotation_view = view.clone();
                vec![
                    view.center().listen(move |_| {
                        if let Some(inner) = weak_center.upgrade() {
                            inner.push_center(&center_view);
                        }
                    }),
                    view.resolution().listen(move |_| {
                        if let Some(inner) = weak_zoom.upgrade() {
                            inner.push_zoom(&zoom_view);
                        }
                    }),
                    view.rotation().listen(move |_| {
                        if let Some(inner) = weak_rotation.upgrade() {
                            inner.push_rotation(&rotation_view);
                        }
                    }),
                ]
            });
        *self.inner.view_listener.borrow_mut() = Some(view_listener);

        let weak = Rc::downgrade(&self.inner);
        let resize_handle = self.inner.primary.window_resized().listen(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.debounce_recenter();
            }
        });
        *self.inner.resize_handle.borrow_mut() = Some(resize_handle);
        log::debug!("view herald activated");
    }

    fn deactivate(&self) {
        if !self.inner.active.get() {
            return;
        }
        self.inner.active.set(false);
        self.inner.view_listener.borrow_mut().take();
        self.inner.resize_handle.borrow_mut().take();
        self.inner.idle_handle.borrow_mut().take();
        if let Some(task) = self.inner.resize_task.take() {
            self.inner.secondary.scheduler().cancel(task);
        }
        self.inner.secondary.set_tile_pane_rotation(0.0);
        self.inner.secondary.restore_container();
        log::debug!("view herald deactivated");
    }
}
