//! Layers herald: collection-level watch dispatch and the activation state
//! machine.
//!
//! The herald owns one source herald per layer family plus the view herald.
//! Proxy layers decide whether the secondary map is shown at all: the
//! topmost visible tracked proxy wins and supplies the map type and custom
//! style, so stacking a themed proxy above a plain one switches the
//! secondary rendering without removing the lower one.

use crate::bridge::WatchOptions;
use crate::events::ListenerHandle;
use crate::herald::{Herald, TileHerald, VectorHerald, ViewHerald, WmsHerald};
use crate::primary::layer::{Layer, LayerSource, SourceKind};
use crate::primary::map::PrimaryMap;
use crate::secondary::map::SecondaryMap;
use crate::secondary::stage::Stage;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Whether the secondary map currently occupies the target element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

struct ProxyItem {
    layer: Layer,
    _visibility: ListenerHandle,
}

struct LayersHeraldInner {
    primary: PrimaryMap,
    secondary: SecondaryMap,
    stage: Stage,
    tile: TileHerald,
    wms: WmsHerald,
    vector: VectorHerald,
    view: ViewHerald,
    watch: RefCell<WatchOptions>,
    state: Cell<ActivationState>,
    watching: Cell<bool>,
    proxies: RefCell<Vec<ProxyItem>>,
    stack_handles: RefCell<Vec<ListenerHandle>>,
}

/// Herald for the primary layer collection
#[derive(Clone)]
pub struct LayersHerald {
    inner: Rc<LayersHeraldInner>,
}

impl LayersHerald {
    pub fn new(
        primary: PrimaryMap,
        secondary: SecondaryMap,
        watch: WatchOptions,
        canvas_icons: bool,
    ) -> Self {
        Self {
            inner: Rc::new(LayersHeraldInner {
                tile: TileHerald::new(primary.clone(), secondary.clone()),
                wms: WmsHerald::new(primary.clone(), secondary.clone()),
                vector: VectorHerald::new(primary.clone(), secondary.clone(), canvas_icons),
                view: ViewHerald::new(primary.clone(), secondary.clone()),
                stage: Stage::new(),
                primary,
                secondary,
                watch: RefCell::new(watch),
                state: Cell::new(ActivationState::Inactive),
                watching: Cell::new(false),
                proxies: RefCell::new(Vec::new()),
                stack_handles: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ActivationState {
        self.inner.state.get()
    }

    pub fn stage(&self) -> &Stage {
        &self.inner.stage
    }

    pub fn watch_options(&self) -> WatchOptions {
        *self.inner.watch.borrow()
    }

    pub fn set_watch_options(&self, watch: WatchOptions) {
        *self.inner.watch.borrow_mut() = watch;
    }

    /// Dispatches a layer to the herald responsible for its source family.
    /// Layers carrying the opt-out marker always render natively.
    fn watch_layer(&self, layer: &Layer) {
        if layer.no_bridge() {
            log::debug!("layer {} opted out of bridging", layer.id());
            return;
        }
        let watch = *self.inner.watch.borrow();
        match layer.kind() {
            SourceKind::Proxy => self.track_proxy(layer),
            SourceKind::Tile if watch.tile => self.inner.tile.watch(layer),
            SourceKind::ImageWms if watch.image => self.inner.wms.watch(layer),
            SourceKind::Vector if watch.vector => self.inner.vector.watch(layer),
            _ => {}
        }
    }

    fn unwatch_layer(&self, layer: &Layer) {
        self.inner
            .proxies
            .borrow_mut()
            .retain(|item| !item.layer.same(layer));
        self.inner.tile.unwatch(layer);
        self.inner.wms.unwatch(layer);
        self.inner.vector.unwatch(layer);
    }

    fn track_proxy(&self, layer: &Layer) {
        if self
            .inner
            .proxies
            .borrow()
            .iter()
            .any(|item| item.layer.same(layer))
        {
            log::warn!("proxy layer {} already tracked, ignoring", layer.id());
            return;
        }
        let herald = Rc::downgrade(&self.inner);
        let visibility = layer.visible().listen(move |_| {
            if let Some(inner) = herald.upgrade() {
                LayersHerald { inner }.evaluate();
            }
        });
        self.inner.proxies.borrow_mut().push(ProxyItem {
            layer: layer.clone(),
            _visibility: visibility,
        });
    }

    /// Topmost visible tracked proxy wins; none means the secondary map
    /// should be hidden.
    fn winning_proxy(&self) -> Option<Layer> {
        let proxies = self.inner.proxies.borrow();
        self.inner
            .primary
            .layers()
            .layers()
            .into_iter()
            .rev()
            .find(|layer| {
                layer.kind() == SourceKind::Proxy
                    && layer.visible().get()
                    && proxies.iter().any(|item| item.layer.same(layer))
            })
    }

    /// Recomputes which activation state should hold and applies it.
    /// Called on layer add/remove and on proxy visibility changes.
    pub fn evaluate(&self) {
        match self.winning_proxy() {
            Some(proxy) => {
                if let LayerSource::Proxy(source) = proxy.source() {
                    self.inner.secondary.set_map_type(source.map_type);
                    self.inner.secondary.set_custom_style(source.styles.clone());
                }
                self.enter_active();
            }
            None => self.enter_inactive(),
        }
    }

    fn enter_active(&self) {
        if self.inner.state.get() == ActivationState::Active {
            return;
        }
        if !self.inner.primary.ready_for_swap() {
            log::debug!("secondary activation deferred: primary map not ready");
            return;
        }
        self.inner.stage.mount_secondary();
        self.inner.view.activate();
        // The secondary container does not auto-detect the DOM reflow, and
        // the forced resize may invalidate its internal view state.
        self.inner.secondary.trigger_resize();
        self.inner.view.sync_now();
        self.inner.tile.set_secondary_active(true);
        self.inner.wms.set_secondary_active(true);
        self.inner.vector.set_secondary_active(true);
        self.order_layers();
        self.inner.state.set(ActivationState::Active);
        log::debug!("secondary map activated");
    }

    fn enter_inactive(&self) {
        if self.inner.state.get() == ActivationState::Inactive {
            return;
        }
        self.inner.stage.mount_primary();
        self.inner.view.deactivate();
        self.inner.tile.set_secondary_active(false);
        self.inner.wms.set_secondary_active(false);
        self.inner.vector.set_secondary_active(false);
        self.inner.state.set(ActivationState::Inactive);
        log::debug!("secondary map deactivated");
    }

    /// Recomputes stacking order for every tile and image mirror
    pub fn order_layers(&self) {
        self.inner.tile.order_layers();
        self.inner.wms.order_layers();
    }

    /// Forces every WMS mirror to redraw uncached
    pub fn refresh(&self) {
        self.inner.wms.refresh();
    }
}

impl Herald for LayersHerald {
    /// Attaches to the layer collection: watches every current layer,
    /// subscribes to add/remove, and evaluates activation. Idempotent.
    fn activate(&self) {
        if self.inner.watching.get() {
            return;
        }
        self.inner.watching.set(true);

        for layer in self.inner.primary.layers().layers() {
            self.watch_layer(&layer);
        }

        let weak = Rc::downgrade(&self.inner);
        let added = self.inner.primary.layers().added().listen(move |layer| {
            if let Some(inner) = weak.upgrade() {
                let herald = LayersHerald { inner };
                herald.watch_layer(layer);
                herald.evaluate();
                herald.order_layers();
            }
        });
        let weak = Rc::downgrade(&self.inner);
        let removed = self.inner.primary.layers().removed().listen(move |layer| {
            if let Some(inner) = weak.upgrade() {
                let herald = LayersHerald { inner };
                herald.unwatch_layer(layer);
                herald.evaluate();
                herald.order_layers();
            }
        });
        self.inner.stack_handles.borrow_mut().extend([added, removed]);

        self.evaluate();
        log::debug!("layers herald activated");
    }

    /// Symmetric teardown: hides the secondary map, unwatches every layer
    /// and releases the collection subscriptions. Idempotent.
    fn deactivate(&self) {
        if !self.inner.watching.get() {
            return;
        }
        self.enter_inactive();
        for layer in self.inner.primary.layers().layers() {
            self.unwatch_layer(&layer);
        }
        self.inner.proxies.borrow_mut().clear();
        self.inner.stack_handles.borrow_mut().clear();
        self.inner.watching.set(false);
        log::debug!("layers herald deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::primary::source::{ProxySource, TileSource};
    use crate::primary::tilegrid::TileGrid;
    use crate::primary::view::View;
    use crate::secondary::map::MapTypeId;
    use crate::secondary::stage::MountedWidget;

    fn ready_primary() -> PrimaryMap {
        let primary = PrimaryMap::new(View::new(Some(Point::new(0.0, 0.0)), 100.0));
        primary.set_size(800, 600);
        primary
    }

    fn herald_for(primary: &PrimaryMap) -> (LayersHerald, SecondaryMap) {
        let secondary = SecondaryMap::new(800, 600);
        let herald = LayersHerald::new(
            primary.clone(),
            secondary.clone(),
            WatchOptions::default(),
            true,
        );
        (herald, secondary)
    }

    fn proxy_layer(map_type: MapTypeId) -> Layer {
        Layer::proxy(ProxySource::new(map_type))
    }

    #[test]
    fn test_visible_proxy_activates_and_hiding_deactivates() {
        let primary = ready_primary();
        let (herald, _secondary) = herald_for(&primary);
        let proxy = proxy_layer(MapTypeId::Satellite);
        proxy.visible().set(false);
        primary.layers().push(proxy.clone());

        herald.activate();
        assert_eq!(herald.state(), ActivationState::Inactive);

        proxy.visible().set(true);
        assert_eq!(herald.state(), ActivationState::Active);
        assert_eq!(herald.stage().mounted(), MountedWidget::Secondary);

        proxy.visible().set(false);
        assert_eq!(herald.state(), ActivationState::Inactive);
        assert_eq!(herald.stage().mounted(), MountedWidget::Primary);
    }

    #[test]
    fn test_topmost_proxy_wins_and_falls_back() {
        let primary = ready_primary();
        let (herald, secondary) = herald_for(&primary);
        primary.layers().push(proxy_layer(MapTypeId::Roadmap));
        herald.activate();
        assert_eq!(secondary.map_type(), MapTypeId::Roadmap);
        assert_eq!(herald.state(), ActivationState::Active);

        let upper = proxy_layer(MapTypeId::Hybrid);
        primary.layers().push(upper.clone());
        assert_eq!(secondary.map_type(), MapTypeId::Hybrid);
        assert_eq!(herald.state(), ActivationState::Active);

        // Hiding the upper proxy falls back without re-activation.
        upper.visible().set(false);
        assert_eq!(secondary.map_type(), MapTypeId::Roadmap);
        assert_eq!(herald.state(), ActivationState::Active);
    }

    #[test]
    fn test_activation_guarded_by_primary_readiness() {
        let primary = PrimaryMap::new(View::new(None, 100.0));
        let (herald, _secondary) = herald_for(&primary);
        primary.layers().push(proxy_layer(MapTypeId::Roadmap));

        herald.activate();
        assert_eq!(herald.state(), ActivationState::Inactive);
    }

    #[test]
    fn test_opt_out_layer_never_watched() {
        let primary = ready_primary();
        let (herald, _secondary) = herald_for(&primary);
        let layer = Layer::tile(TileSource::uninitialized(TileGrid::xyz()));
        layer.set_no_bridge(true);
        primary.layers().push(layer.clone());

        herald.activate();
        assert_eq!(layer.opacity().listener_count(), 0);
    }

    #[test]
    fn test_deactivate_is_idempotent_and_symmetric() {
        let primary = ready_primary();
        let (herald, _secondary) = herald_for(&primary);
        let proxy = proxy_layer(MapTypeId::Roadmap);
        let tile = Layer::tile(TileSource::uninitialized(TileGrid::xyz()));
        tile.opacity().set(0.5);
        primary.layers().push(proxy);
        primary.layers().push(tile.clone());

        herald.activate();
        herald.activate();
        assert_eq!(herald.state(), ActivationState::Active);
        assert_eq!(tile.opacity().get(), 0.0);

        herald.deactivate();
        herald.deactivate();
        assert_eq!(herald.state(), ActivationState::Inactive);
        assert_eq!(tile.opacity().get(), 0.5);
        assert_eq!(primary.layers().added().listener_count(), 0);
        assert_eq!(tile.opacity().listener_count(), 0);
    }

    #[test]
    fn test_watch_policy_flags_gate_families() {
        let primary = ready_primary();
        let secondary = SecondaryMap::new(800, 600);
        let herald = LayersHerald::new(
            primary.clone(),
            secondary,
            WatchOptions {
                tile: false,
                image: true,
                vector: true,
            },
            true,
        );
        let tile = Layer::tile(TileSource::uninitialized(TileGrid::xyz()));
        primary.layers().push(tile.clone());

        herald.activate();
        assert_eq!(tile.opacity().listener_count(), 0);
    }
}
