use std::collections::HashSet;

use mapview_core::{BBox, Node, NodeContent, NodeId, Point, RenderId, RenderItem, VectorShape};
use uuid::Uuid;

use crate::render_data::DrawCommand;

/// The shared raster surface of one layer.
///
/// Vector items drawn since the last [`Canvas::reset`] are kept as draw
/// commands in canvas-local pixels; the surface is shown through a single
/// raster node with a stable id.
#[derive(Debug)]
pub struct Canvas {
    node_id: NodeId,
    bbox: Option<BBox>,
    resolution: f64,
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
    drawn: HashSet<RenderId>,
    z_index: i32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            node_id: Uuid::new_v4(),
            bbox: None,
            resolution: 1.0,
            width: 0.0,
            height: 0.0,
            commands: Vec::new(),
            drawn: HashSet::new(),
            z_index: 0,
        }
    }

    /// Clear the surface and set up the transform for a new viewport.
    pub fn reset(&mut self, bbox: BBox, resolution: f64, width: f64, height: f64) {
        self.bbox = Some(bbox);
        self.resolution = resolution;
        self.width = width;
        self.height = height;
        self.commands.clear();
        self.drawn.clear();
    }

    /// Rasterize a vector item. Returns false when nothing was drawn: the
    /// item is not vector, or it is already on the surface.
    pub fn draw(&mut self, item: &RenderItem) -> bool {
        let Some(shape) = item.shape() else {
            return false;
        };
        if !self.drawn.insert(item.id) {
            return false;
        }

        let origin = self.origin();
        let rings: Vec<Vec<f64>> = shape
            .rings()
            .iter()
            .map(|ring| {
                ring.iter()
                    .flat_map(|p| [p.x - origin.x, p.y - origin.y])
                    .collect()
            })
            .collect();
        let (closed, fill) = match shape {
            VectorShape::Polyline { .. } => (false, None),
            VectorShape::Polygon { fill, .. } => (true, Some(fill.to_f32_array())),
        };
        let stroke = shape.stroke();

        self.commands.push(DrawCommand {
            render: item.id,
            rings,
            closed,
            fill,
            stroke: stroke.map(|s| s.color.to_f32_array()),
            stroke_width: stroke.map_or(0.0, |s| s.width),
        });
        true
    }

    /// Pixel position of the canvas' top-left corner in render-item space.
    fn origin(&self) -> Point {
        match self.bbox {
            Some(bbox) => Point::new(bbox.min.x / self.resolution, -bbox.max.y / self.resolution),
            None => Point::new(0.0, 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn has_drawn(&self, render: RenderId) -> bool {
        self.drawn.contains(&render)
    }

    pub fn set_index(&mut self, z_index: i32) {
        self.z_index = z_index;
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The raster node showing the current surface.
    pub fn node(&self) -> Node {
        Node {
            id: self.node_id,
            content: NodeContent::Raster {
                width: self.width,
                height: self.height,
                commands: self.commands.len(),
            },
            width: self.width,
            height: self.height,
            z_index: self.z_index,
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.bbox
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}
