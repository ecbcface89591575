use std::cell::RefCell;
use std::rc::Rc;

use mapview_core::{BBox, Node, NodeId, Point};
use uuid::Uuid;

use crate::render_data::{ContainerSnapshot, PlacedNodeSnapshot, Placement};

pub type ContainerId = Uuid;

/// A compositing target bound to one resolution.
///
/// Adding a node that is already present moves it to the new placement.
pub trait Container {
    fn id(&self) -> ContainerId;

    /// Map units per pixel the container was laid out for.
    fn resolution(&self) -> f64;

    /// Place a node so that it covers `bbox`, stretching its `width` x
    /// `height` intrinsic size.
    fn add_node(&mut self, node: Node, width: f64, height: f64, bbox: &BBox);

    /// Place a node at a fixed pixel anchor plus an optional pixel offset.
    /// The node does not scale with the map.
    fn add_fixed_size_node(&mut self, node: Node, position: Point, offset: Option<Point>);

    fn remove_node(&mut self, id: NodeId) -> Option<Node>;

    fn set_z_index(&mut self, id: NodeId, z_index: i32) -> bool;

    fn has_node(&self, id: NodeId) -> bool;

    /// Placed nodes ordered bottom to top.
    fn snapshot(&self) -> ContainerSnapshot;
}

pub type SharedContainer = Rc<RefCell<dyn Container>>;

#[derive(Debug, Clone)]
struct PlacedNode {
    node: Node,
    placement: Placement,
}

/// Default container: keeps placed nodes in insertion order and lays them
/// out relative to the top-left corner of its extent.
#[derive(Debug, Clone)]
pub struct NodeContainer {
    id: ContainerId,
    bbox: BBox,
    resolution: f64,
    nodes: Vec<PlacedNode>,
}

impl NodeContainer {
    pub fn new(bbox: BBox, resolution: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            bbox,
            resolution,
            nodes: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedContainer {
        Rc::new(RefCell::new(self))
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    fn place(&mut self, node: Node, placement: Placement) {
        match self.nodes.iter_mut().find(|p| p.node.id == node.id) {
            Some(existing) => {
                existing.node = node;
                existing.placement = placement;
            }
            None => self.nodes.push(PlacedNode { node, placement }),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|p| p.node.id == id).map(|p| &p.node)
    }

    pub fn placement(&self, id: NodeId) -> Option<Placement> {
        self.nodes.iter().find(|p| p.node.id == id).map(|p| p.placement)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Container for NodeContainer {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn add_node(&mut self, node: Node, width: f64, height: f64, bbox: &BBox) {
        let css_width = bbox.width() / self.resolution;
        let css_height = bbox.height() / self.resolution;
        log::trace!(
            "Container {}: node {} ({}x{}) stretched to {:.1}x{:.1}",
            self.id,
            node.id,
            width,
            height,
            css_width,
            css_height
        );
        let placement = Placement {
            left: (bbox.min.x - self.bbox.min.x) / self.resolution,
            top: (self.bbox.max.y - bbox.max.y) / self.resolution,
            width: css_width,
            height: css_height,
            scaled: true,
        };
        self.place(node, placement);
    }

    fn add_fixed_size_node(&mut self, node: Node, position: Point, offset: Option<Point>) {
        let offset = offset.unwrap_or(Point::new(0.0, 0.0));
        let origin = Point::new(
            self.bbox.min.x / self.resolution,
            -self.bbox.max.y / self.resolution,
        );
        let placement = Placement {
            left: position.x - origin.x + offset.x,
            top: position.y - origin.y + offset.y,
            width: node.width,
            height: node.height,
            scaled: false,
        };
        self.place(node, placement);
    }

    fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let index = self.nodes.iter().position(|p| p.node.id == id)?;
        Some(self.nodes.remove(index).node)
    }

    fn set_z_index(&mut self, id: NodeId, z_index: i32) -> bool {
        match self.nodes.iter_mut().find(|p| p.node.id == id) {
            Some(placed) => {
                placed.node.z_index = z_index;
                true
            }
            None => false,
        }
    }

    fn has_node(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|p| p.node.id == id)
    }

    /// By z-index, then insertion order.
    fn snapshot(&self) -> ContainerSnapshot {
        let mut nodes: Vec<PlacedNodeSnapshot> = self
            .nodes
            .iter()
            .map(|p| PlacedNodeSnapshot {
                node: p.node.id,
                content: p.node.content.clone(),
                z_index: p.node.z_index,
                placement: p.placement,
            })
            .collect();
        nodes.sort_by_key(|n| n.z_index);
        ContainerSnapshot {
            id: self.id,
            resolution: self.resolution,
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapview_core::NodeContent;

    fn image(width: f64, height: f64) -> Node {
        Node::new(
            NodeContent::Image {
                src: "tile.png".to_string(),
            },
            width,
            height,
        )
    }

    fn container() -> NodeContainer {
        NodeContainer::new(BBox::from_corners(0.0, 0.0, 200.0, 100.0), 2.0)
    }

    #[test]
    fn test_bbox_node_is_stretched() {
        let mut c = container();
        let node = image(256.0, 256.0);
        let id = node.id;
        c.add_node(node, 256.0, 256.0, &BBox::from_corners(20.0, 40.0, 60.0, 80.0));
        let placement = c.placement(id).unwrap();
        assert_eq!(placement.left, 10.0);
        assert_eq!(placement.top, 10.0);
        assert_eq!(placement.width, 20.0);
        assert!(placement.scaled);
    }

    #[test]
    fn test_fixed_node_uses_anchor_and_offset() {
        let mut c = container();
        let node = image(10.0, 10.0);
        let id = node.id;
        // Map point (40, 60) at resolution 2 is pixel (20, -30).
        c.add_fixed_size_node(node, Point::new(20.0, -30.0), Some(Point::new(-5.0, -10.0)));
        let placement = c.placement(id).unwrap();
        assert_eq!(placement.left, 15.0);
        assert_eq!(placement.top, 10.0);
        assert!(!placement.scaled);
    }

    #[test]
    fn test_re_adding_moves_node() {
        let mut c = container();
        let node = image(10.0, 10.0);
        let id = node.id;
        c.add_fixed_size_node(node.clone(), Point::new(0.0, -50.0), None);
        c.add_fixed_size_node(node, Point::new(10.0, -50.0), None);
        assert_eq!(c.node_count(), 1);
        assert_eq!(c.placement(id).unwrap().left, 10.0);
    }

    #[test]
    fn test_remove_and_z_index() {
        let mut c = container();
        let low = image(1.0, 1.0);
        let high = image(1.0, 1.0);
        let (low_id, high_id) = (low.id, high.id);
        c.add_fixed_size_node(high, Point::new(0.0, 0.0), None);
        c.add_fixed_size_node(low, Point::new(0.0, 0.0), None);
        assert!(c.set_z_index(high_id, 5));
        assert!(c.set_z_index(low_id, 2));

        let order: Vec<NodeId> = c.snapshot().nodes.iter().map(|n| n.node).collect();
        assert_eq!(order, vec![low_id, high_id]);

        assert!(c.remove_node(low_id).is_some());
        assert!(!c.has_node(low_id));
        assert!(c.remove_node(low_id).is_none());
        assert!(!c.set_z_index(low_id, 1));
    }
}
