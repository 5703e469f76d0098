use crate::events::{Property, Signal};
use crate::primary::stack::LayerStack;
use crate::primary::view::View;
use std::rc::Rc;

struct PrimaryMapInner {
    /// The view object itself is replaceable by the host, which is why
    /// heralds track it through a property rather than holding it directly.
    view: Property<View>,
    layers: LayerStack,
    /// Viewport pixel size; `None` until the first render pass
    size: Property<Option<(u32, u32)>>,
    /// Host window resize events
    window_resized: Signal<()>,
}

/// Handle to the primary interactive map: a view, a layer stack and a
/// rendered size.
#[derive(Clone)]
pub struct PrimaryMap {
    inner: Rc<PrimaryMapInner>,
}

impl PrimaryMap {
    pub fn new(view: View) -> Self {
        Self {
            inner: Rc::new(PrimaryMapInner {
                view: Property::new(view),
                layers: LayerStack::new(),
                size: Property::new(None),
                window_resized: Signal::new(),
            }),
        }
    }

    pub fn view(&self) -> &Property<View> {
        &self.inner.view
    }

    pub fn layers(&self) -> &LayerStack {
        &self.inner.layers
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.inner.size.get()
    }

    /// Records the rendered viewport size (set by the host after a render
    /// pass)
    pub fn set_size(&self, width: u32, height: u32) {
        self.inner.size.set(Some((width, height)));
    }

    pub fn window_resized(&self) -> &Signal<()> {
        &self.inner.window_resized
    }

    /// Whether the map has completed at least one render pass and has a
    /// defined center, the guard for showing the secondary map.
    pub fn ready_for_swap(&self) -> bool {
        self.size().is_some() && self.inner.view.get().center().get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;

    #[test]
    fn test_ready_for_swap_guards() {
        let map = PrimaryMap::new(View::new(None, 100.0));
        assert!(!map.ready_for_swap());

        map.set_size(800, 600);
        assert!(!map.ready_for_swap());

        map.view().get().center().set(Some(Point::new(0.0, 0.0)));
        assert!(map.ready_for_swap());
    }
}
