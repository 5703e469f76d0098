//! The shared target element both maps compete for.
//!
//! Only one widget occupies the host's target element at a time. While the
//! secondary map is mounted, the primary map's viewport is relocated into
//! the secondary engine's custom control slot so its own UI controls stay
//! present, visually inside the secondary map.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Which widget currently occupies the target element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountedWidget {
    Primary,
    Secondary,
}

struct StageInner {
    mounted: Cell<MountedWidget>,
    primary_in_control_slot: Cell<bool>,
    /// Inline positioning style saved across the swap, restored on unmount
    saved_inline_position: RefCell<Option<String>>,
}

/// Models the DOM-level swap between the two map widgets
#[derive(Clone)]
pub struct Stage {
    inner: Rc<StageInner>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StageInner {
                mounted: Cell::new(MountedWidget::Primary),
                primary_in_control_slot: Cell::new(false),
                saved_inline_position: RefCell::new(None),
            }),
        }
    }

    pub fn mounted(&self) -> MountedWidget {
        self.inner.mounted.get()
    }

    pub fn primary_in_control_slot(&self) -> bool {
        self.inner.primary_in_control_slot.get()
    }

    /// Swaps the secondary map into the target element and relocates the
    /// primary viewport into the control slot.
    pub fn mount_secondary(&self) {
        *self.inner.saved_inline_position.borrow_mut() = Some("relative".to_string());
        self.inner.mounted.set(MountedWidget::Secondary);
        self.inner.primary_in_control_slot.set(true);
    }

    /// Symmetric teardown: the primary map reclaims the target element and
    /// its saved inline positioning.
    pub fn mount_primary(&self) {
        self.inner.primary_in_control_slot.set(false);
        self.inner.mounted.set(MountedWidget::Primary);
        self.inner.saved_inline_position.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_swap_round_trip() {
        let stage = Stage::new();
        assert_eq!(stage.mounted(), MountedWidget::Primary);
        assert!(!stage.primary_in_control_slot());

        stage.mount_secondary();
        assert_eq!(stage.mounted(), MountedWidget::Secondary);
        assert!(stage.primary_in_control_slot());

        stage.mount_primary();
        assert_eq!(stage.mounted(), MountedWidget::Primary);
        assert!(!stage.primary_in_control_slot());
    }
}
