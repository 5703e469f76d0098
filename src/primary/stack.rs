use crate::events::Signal;
use crate::primary::layer::Layer;
use std::cell::RefCell;
use std::rc::Rc;

struct LayerStackInner {
    layers: RefCell<Vec<Layer>>,
    added: Signal<Layer>,
    removed: Signal<Layer>,
}

/// The primary map's ordered layer collection. Position in the vector is
/// the stacking order: later layers render on top.
#[derive(Clone)]
pub struct LayerStack {
    inner: Rc<LayerStackInner>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(LayerStackInner {
                layers: RefCell::new(Vec::new()),
                added: Signal::new(),
                removed: Signal::new(),
            }),
        }
    }

    pub fn push(&self, layer: Layer) {
        self.inner.layers.borrow_mut().push(layer.clone());
        self.inner.added.emit(&layer);
    }

    pub fn insert(&self, index: usize, layer: Layer) {
        self.inner.layers.borrow_mut().insert(index, layer.clone());
        self.inner.added.emit(&layer);
    }

    /// Removes a layer; unknown layers are a no-op
    pub fn remove(&self, layer: &Layer) {
        let mut layers = self.inner.layers.borrow_mut();
        let before = layers.len();
        layers.retain(|l| !l.same(layer));
        let removed = layers.len() < before;
        drop(layers);
        if removed {
            self.inner.removed.emit(layer);
        }
    }

    /// Snapshot of the current stack, bottom to top
    pub fn layers(&self) -> Vec<Layer> {
        self.inner.layers.borrow().clone()
    }

    /// Stacking position of a layer, bottom = 0
    pub fn position_of(&self, layer: &Layer) -> Option<usize> {
        self.inner.layers.borrow().iter().position(|l| l.same(layer))
    }

    pub fn len(&self) -> usize {
        self.inner.layers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.layers.borrow().is_empty()
    }

    pub fn added(&self) -> &Signal<Layer> {
        &self.inner.added
    }

    pub fn removed(&self) -> &Signal<Layer> {
        &self.inner.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::source::VectorSource;
    use std::cell::Cell;

    #[test]
    fn test_push_and_remove_notify() {
        let stack = LayerStack::new();
        let layer = Layer::vector(VectorSource::new());

        let adds = Rc::new(Cell::new(0));
        let removes = Rc::new(Cell::new(0));
        let adds_clone = Rc::clone(&adds);
        let removes_clone = Rc::clone(&removes);
        let _a = stack.added().listen(move |_| adds_clone.set(adds_clone.get() + 1));
        let _r = stack
            .removed()
            .listen(move |_| removes_clone.set(removes_clone.get() + 1));

        stack.push(layer.clone());
        assert_eq!(adds.get(), 1);
        assert_eq!(stack.position_of(&layer), Some(0));

        stack.remove(&layer);
        assert_eq!(removes.get(), 1);
        assert!(stack.is_empty());

        // Removing again is a no-op.
        stack.remove(&layer);
        assert_eq!(removes.get(), 1);
    }

    #[test]
    fn test_insert_ordering() {
        let stack = LayerStack::new();
        let bottom = Layer::vector(VectorSource::new());
        let top = Layer::vector(VectorSource::new());
        let middle = Layer::vector(VectorSource::new());

        stack.push(bottom.clone());
        stack.push(top.clone());
        stack.insert(1, middle.clone());

        assert_eq!(stack.position_of(&bottom), Some(0));
        assert_eq!(stack.position_of(&middle), Some(1));
        assert_eq!(stack.position_of(&top), Some(2));
    }
}
