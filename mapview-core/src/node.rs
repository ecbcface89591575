use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::geometry::Point;
use crate::render_item::RenderId;

/// Unique identifier of a displayable node.
pub type NodeId = Uuid;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Failed to create node for render {render}: {reason}")]
    NodeCreation { render: RenderId, reason: String },

    #[error("No viewport is set for the map")]
    NoViewport,

    #[error("No container is available to place nodes into")]
    NoContainer,

    #[error("Render {0} cannot be converted into a node")]
    UnsupportedItem(RenderId),
}

// ── Nodes ─────────────────────────────────────────────────────────────

/// What a node shows once it is placed into a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    /// Standalone SVG markup produced from a vector render item.
    Svg(String),
    /// An image element.
    Image { src: String },
    /// The shared raster surface of a layer.
    Raster { width: f64, height: f64, commands: usize },
}

/// A displayable element. Nodes are moved into containers by value and
/// addressed there by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub content: NodeContent,
    pub width: f64,
    pub height: f64,
    pub z_index: i32,
}

impl Node {
    pub fn new(content: NodeContent, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            width,
            height,
            z_index: 0,
        }
    }
}

/// A finished node plus the pixel anchor it should be shown at, when the
/// builder computed one (SVG conversion does, images anchor through their
/// render item).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNode {
    pub node: Node,
    pub position: Option<Point>,
}

/// The result of an asynchronous node build. The outcome becomes visible to
/// the renderer only after `ready_after` has elapsed on its clock.
#[derive(Debug, Clone)]
pub struct NodeTask {
    pub ready_after: Duration,
    pub outcome: Result<RenderedNode, RenderError>,
}

impl NodeTask {
    pub fn ready(node: RenderedNode) -> Self {
        Self {
            ready_after: Duration::ZERO,
            outcome: Ok(node),
        }
    }

    pub fn failed(error: RenderError) -> Self {
        Self {
            ready_after: Duration::ZERO,
            outcome: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.ready_after = delay;
        self
    }
}

/// Builds the node for a node-based render item.
pub trait NodeSource: fmt::Debug {
    fn get_node(&self, render: RenderId) -> NodeTask;
}

/// An image node loaded from `src`. Loading takes `load_time` on the
/// renderer clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub src: String,
    pub width: f64,
    pub height: f64,
    pub load_time: Duration,
}

impl ImageSource {
    pub fn new(src: &str, width: f64, height: f64) -> Self {
        Self {
            src: src.to_string(),
            width,
            height,
            load_time: Duration::ZERO,
        }
    }

    pub fn with_load_time(mut self, load_time: Duration) -> Self {
        self.load_time = load_time;
        self
    }
}

impl NodeSource for ImageSource {
    fn get_node(&self, render: RenderId) -> NodeTask {
        if self.src.trim().is_empty() {
            return NodeTask::failed(RenderError::NodeCreation {
                render,
                reason: "image source is empty".to_string(),
            })
            .after(self.load_time);
        }

        let node = Node::new(
            NodeContent::Image {
                src: self.src.clone(),
            },
            self.width,
            self.height,
        );
        NodeTask::ready(RenderedNode {
            node,
            position: None,
        })
        .after(self.load_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_builds_node() {
        let source = ImageSource::new("marker.png", 16.0, 24.0)
            .with_load_time(Duration::from_millis(30));
        let task = source.get_node(Uuid::new_v4());
        assert_eq!(task.ready_after, Duration::from_millis(30));
        let rendered = task.outcome.unwrap();
        assert_eq!(rendered.node.width, 16.0);
        assert_eq!(
            rendered.node.content,
            NodeContent::Image {
                src: "marker.png".to_string()
            }
        );
    }

    #[test]
    fn test_empty_image_source_fails() {
        let render = Uuid::new_v4();
        let task = ImageSource::new("  ", 1.0, 1.0).get_node(render);
        match task.outcome {
            Err(RenderError::NodeCreation { render: r, .. }) => assert_eq!(r, render),
            other => panic!("expected node creation error, got {other:?}"),
        }
    }
}
