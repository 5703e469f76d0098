//! The top-level facade wiring the heralds into a single surface.

use crate::herald::{ActivationState, Herald, LayersHerald};
use crate::primary::map::PrimaryMap;
use crate::secondary::map::SecondaryMap;
use std::cell::Cell;

/// Which layer families the bridge intercepts. Individual layers can still
/// opt out with their own marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub tile: bool,
    pub image: bool,
    pub vector: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            tile: true,
            image: true,
            vector: true,
        }
    }
}

/// How feature icons are rendered on the secondary side. Canvas icons
/// support anchor, rotation and opacity the native marker API cannot
/// express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconRenderOptions {
    pub canvas_icons: bool,
}

impl Default for IconRenderOptions {
    fn default() -> Self {
        Self { canvas_icons: true }
    }
}

/// Construction options for [`MapBridge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    pub watch: WatchOptions,
    pub icon_render: IconRenderOptions,
}

/// Keeps a secondary rendering backend in sync with a primary interactive
/// map, one-directionally. The host talks only to the primary map; the
/// bridge decides when the secondary map is shown and mirrors every
/// relevant change onto it.
pub struct MapBridge {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    layers: LayersHerald,
    activated: Cell<bool>,
}

impl MapBridge {
    /// Builds a bridge over an injected pair of map handles. Nothing is
    /// watched until [`MapBridge::activate`] is called.
    pub fn new(primary: PrimaryMap, secondary: SecondaryMap, options: BridgeOptions) -> Self {
        let layers = LayersHerald::new(
            primary.clone(),
            secondary.clone(),
            options.watch,
            options.icon_render.canvas_icons,
        );
        Self {
            primary,
            secondary,
            layers,
            activated: Cell::new(false),
        }
    }

    /// Starts watching the primary map. A no-op when already active.
    pub fn activate(&self) {
        if self.activated.get() {
            return;
        }
        self.activated.set(true);
        self.layers.activate();
    }

    /// Stops watching and restores every intercepted layer. A no-op when
    /// already inactive.
    pub fn deactivate(&self) {
        if !self.activated.get() {
            return;
        }
        self.layers.deactivate();
        self.activated.set(false);
    }

    pub fn toggle(&self) {
        if self.activated.get() {
            self.deactivate();
        } else {
            self.activate();
        }
    }

    /// Whether the bridge is watching the primary map
    pub fn is_active(&self) -> bool {
        self.activated.get()
    }

    /// Whether the secondary map currently occupies the target element
    pub fn is_secondary_active(&self) -> bool {
        self.layers.state() == ActivationState::Active
    }

    pub fn primary_map(&self) -> &PrimaryMap {
        &self.primary
    }

    /// Escape hatch to the underlying secondary map handle
    pub fn secondary_map(&self) -> &SecondaryMap {
        &self.secondary
    }

    pub fn watch_options(&self) -> WatchOptions {
        self.layers.watch_options()
    }

    /// Applies new watch policy flags by fully deactivating and
    /// reactivating, so every cache reflects the new policy.
    pub fn set_watch_options(&self, watch: WatchOptions) {
        let was_active = self.activated.get();
        if was_active {
            self.deactivate();
        }
        self.layers.set_watch_options(watch);
        if was_active {
            self.activate();
        }
    }

    /// Manually re-triggers z-index recomputation, for layer reorderings
    /// that happened through means other than collection add/remove
    pub fn reorder_layers(&self) {
        self.layers.order_layers();
    }

    /// Forces every WMS mirror to redraw uncached
    pub fn refresh(&self) {
        self.layers.refresh();
    }
}
