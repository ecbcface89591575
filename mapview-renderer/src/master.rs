use std::cell::{Cell, RefCell};

use crate::container::{NodeContainer, SharedContainer};
use crate::viewport::Viewport;

/// What a layer renderer needs from the map that owns it.
pub trait MapContext {
    /// Current viewport, `None` until the map has been sized and positioned.
    fn viewport(&self) -> Option<Viewport>;

    /// The container new nodes are placed into.
    fn current_container(&self) -> Option<SharedContainer>;

    /// Called when a renderer starts placing nodes into a different
    /// container, so the map can restack its layers.
    fn resolve_layer_overlay(&self) {}
}

/// A plain map context: a viewport plus a stack of containers, the last of
/// which is current.
#[derive(Default)]
pub struct MapFrame {
    viewport: RefCell<Option<Viewport>>,
    containers: RefCell<Vec<SharedContainer>>,
    overlay_requests: Cell<usize>,
}

impl MapFrame {
    pub fn new(viewport: Viewport) -> Self {
        let frame = Self::default();
        frame.set_viewport(viewport);
        frame
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.borrow_mut() = Some(viewport);
    }

    pub fn update_viewport(&self, f: impl FnOnce(&mut Viewport)) {
        if let Some(viewport) = self.viewport.borrow_mut().as_mut() {
            f(viewport);
        }
    }

    /// Open a container for the current viewport and make it current.
    pub fn push_container(&self) -> Option<SharedContainer> {
        let viewport = self.viewport()?;
        let container = NodeContainer::new(viewport.bbox(), viewport.resolution).into_shared();
        self.containers.borrow_mut().push(container.clone());
        Some(container)
    }

    /// Drop every container except the current one.
    pub fn retain_current_container(&self) {
        let mut containers = self.containers.borrow_mut();
        let keep = containers.len().saturating_sub(1);
        containers.drain(..keep);
    }

    pub fn containers(&self) -> Vec<SharedContainer> {
        self.containers.borrow().clone()
    }

    pub fn overlay_requests(&self) -> usize {
        self.overlay_requests.get()
    }
}

impl MapContext for MapFrame {
    fn viewport(&self) -> Option<Viewport> {
        self.viewport.borrow().clone()
    }

    fn current_container(&self) -> Option<SharedContainer> {
        self.containers.borrow().last().cloned()
    }

    fn resolve_layer_overlay(&self) {
        self.overlay_requests.set(self.overlay_requests.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_core::{Crs, Point};

    #[test]
    fn test_last_pushed_container_is_current() {
        let frame = MapFrame::new(Viewport::new(
            Point::new(0.0, 0.0),
            1.0,
            100.0,
            100.0,
            Crs::web_mercator(),
        ));
        assert!(frame.current_container().is_none());

        let first = frame.push_container().unwrap();
        frame.update_viewport(|v| v.set_resolution(2.0));
        let second = frame.push_container().unwrap();

        let current = frame.current_container().unwrap();
        assert_eq!(current.borrow().id(), second.borrow().id());
        assert_eq!(current.borrow().resolution(), 2.0);
        assert_ne!(first.borrow().id(), second.borrow().id());

        frame.retain_current_container();
        assert_eq!(frame.containers().len(), 1);
    }

    #[test]
    fn test_no_container_without_viewport() {
        let frame = MapFrame::default();
        assert!(frame.viewport().is_none());
        assert!(frame.push_container().is_none());
    }
}
