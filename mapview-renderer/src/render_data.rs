use mapview_core::{FeatureId, NodeContent, NodeId, RenderId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A path rasterized onto a layer canvas, in canvas-local pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    pub render: RenderId,
    /// Flat vertex arrays, one per ring: [x0, y0, x1, y1, ...]
    pub rings: Vec<Vec<f64>>,
    pub closed: bool,
    pub fill: Option<[f32; 4]>, // RGBA
    pub stroke: Option<[f32; 4]>,
    pub stroke_width: f64,
}

/// Where a node sits inside its container, in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// False for nodes pinned to a pixel anchor that do not scale with the map.
    pub scaled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNodeSnapshot {
    pub node: NodeId,
    pub content: NodeContent,
    pub z_index: i32,
    pub placement: Placement,
}

/// Serializable view of a container, ordered bottom to top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: Uuid,
    pub resolution: f64,
    pub nodes: Vec<PlacedNodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub feature: FeatureId,
    pub current: Vec<RenderId>,
    pub outdated: Vec<RenderId>,
    pub pending_removal: Vec<RenderId>,
}

/// Bookkeeping state of one layer renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererSnapshot {
    pub index: Option<usize>,
    pub z_index: i32,
    pub loading: Vec<RenderId>,
    pub features: Vec<FeatureSnapshot>,
    pub canvas_attached: bool,
    pub canvas_commands: usize,
}

impl RendererSnapshot {
    pub fn feature(&self, id: FeatureId) -> Option<&FeatureSnapshot> {
        self.features.iter().find(|f| f.feature == id)
    }
}
