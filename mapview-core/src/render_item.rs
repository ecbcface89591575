use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Point};
use crate::node::NodeSource;

/// Identity of a single render item. Two items are the same render only if
/// their ids match; content is never compared.
pub type RenderId = Uuid;

/// Identity of the item list a feature produced for one render call.
pub type RenderSetId = Uuid;

/// Pointer events a layer can route back to features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "dblclick")]
    DoubleClick,
    #[serde(rename = "dragStart")]
    DragStart,
    #[serde(rename = "mousemove")]
    MouseMove,
    #[serde(rename = "mouseover")]
    MouseOver,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Click,
        EventKind::DoubleClick,
        EventKind::DragStart,
        EventKind::MouseMove,
        EventKind::MouseOver,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::DoubleClick => "dblclick",
            EventKind::DragStart => "dragStart",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseOver => "mouseover",
        }
    }
}

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(mut self, a: u8) -> Self {
        self.a = a;
        self
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn to_css(&self) -> String {
        format!(
            "rgba({},{},{},{:.3})",
            self.r,
            self.g,
            self.b,
            self.a as f64 / 255.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::default(),
            width: 1.0,
        }
    }
}

/// Geometry of a vector render item, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorShape {
    Polyline {
        rings: Vec<Vec<Point>>,
        stroke: Stroke,
    },
    Polygon {
        rings: Vec<Vec<Point>>,
        fill: Color,
        stroke: Option<Stroke>,
    },
}

impl VectorShape {
    pub fn rings(&self) -> &[Vec<Point>] {
        match self {
            VectorShape::Polyline { rings, .. } | VectorShape::Polygon { rings, .. } => rings,
        }
    }

    pub fn stroke(&self) -> Option<&Stroke> {
        match self {
            VectorShape::Polyline { stroke, .. } => Some(stroke),
            VectorShape::Polygon { stroke, .. } => stroke.as_ref(),
        }
    }

    /// Pixel extent including half the stroke width.
    pub fn bbox(&self) -> Option<BBox> {
        let points: Vec<Point> = self.rings().iter().flatten().copied().collect();
        let half_stroke = self.stroke().map_or(0.0, |s| s.width / 2.0);
        BBox::from_points(&points).map(|b| b.expand(half_stroke))
    }

    /// The same shape with every coordinate multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        let scale_rings = |rings: &[Vec<Point>]| -> Vec<Vec<Point>> {
            rings
                .iter()
                .map(|r| r.iter().map(|p| p.scale(k)).collect())
                .collect()
        };
        match self {
            VectorShape::Polyline { rings, stroke } => VectorShape::Polyline {
                rings: scale_rings(rings),
                stroke: *stroke,
            },
            VectorShape::Polygon { rings, fill, stroke } => VectorShape::Polygon {
                rings: scale_rings(rings),
                fill: *fill,
                stroke: *stroke,
            },
        }
    }

    fn stroke_hit(&self, px: &Point, tolerance: f64, closed: bool) -> Option<HitKind> {
        let reach = self.stroke().map_or(0.0, |s| s.width / 2.0) + tolerance;
        for (ring_index, ring) in self.rings().iter().enumerate() {
            let mut segments: Vec<(usize, &Point, &Point)> = ring
                .windows(2)
                .enumerate()
                .map(|(i, w)| (i, &w[0], &w[1]))
                .collect();
            if closed && ring.len() > 2 {
                segments.push((ring.len() - 1, &ring[ring.len() - 1], &ring[0]));
            }
            for (segment, a, b) in segments {
                if px.distance_to_segment(a, b) <= reach {
                    return Some(HitKind::Stroke {
                        ring: ring_index,
                        segment,
                    });
                }
            }
        }
        None
    }

    /// Even-odd fill test over all rings.
    fn fill_hit(&self, px: &Point) -> bool {
        let mut inside = false;
        for ring in self.rings() {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            let mut j = n - 1;
            for i in 0..n {
                let (pi, pj) = (ring[i], ring[j]);
                if (pi.y > px.y) != (pj.y > px.y)
                    && px.x < (pj.x - pi.x) * (px.y - pi.y) / (pj.y - pi.y) + pi.x
                {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }

    pub fn contains(&self, px: &Point, tolerance: f64) -> Option<HitKind> {
        match self {
            VectorShape::Polyline { .. } => self.stroke_hit(px, tolerance, false),
            VectorShape::Polygon { .. } => self
                .stroke_hit(px, tolerance, true)
                .or_else(|| self.fill_hit(px).then_some(HitKind::Fill)),
        }
    }
}

/// Which part of a render item a pointer position intersects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitKind {
    Fill,
    Stroke { ring: usize, segment: usize },
    Node,
}

#[derive(Clone)]
pub enum RenderKind {
    /// Can be rasterized onto the shared layer surface.
    Vector(VectorShape),
    /// Needs its own node, built by the source.
    Node(Rc<dyn NodeSource>),
}

impl fmt::Debug for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderKind::Vector(shape) => f.debug_tuple("Vector").field(shape).finish(),
            RenderKind::Node(source) => f.debug_tuple("Node").field(source).finish(),
        }
    }
}

/// One drawable primitive produced by a feature.
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub id: RenderId,
    pub kind: RenderKind,
    /// Geographic placement for bbox-scaled nodes.
    pub bbox: Option<BBox>,
    /// Fixed pixel anchor at the resolution the item was rendered for.
    pub position: Option<Point>,
    pub offset: Option<Point>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub ignore_events: bool,
    /// The item this one was derived from; it stays relevant while the base does.
    pub base_render: Option<RenderId>,
}

impl RenderItem {
    fn with_kind(kind: RenderKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            bbox: None,
            position: None,
            offset: None,
            width: None,
            height: None,
            ignore_events: false,
            base_render: None,
        }
    }

    pub fn vector(shape: VectorShape) -> Self {
        Self::with_kind(RenderKind::Vector(shape))
    }

    pub fn node(source: Rc<dyn NodeSource>) -> Self {
        Self::with_kind(RenderKind::Node(source))
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_position(mut self, position: Point, offset: Option<Point>) -> Self {
        self.position = Some(position);
        self.offset = offset;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_base_render(mut self, base: RenderId) -> Self {
        self.base_render = Some(base);
        self
    }

    pub fn ignoring_events(mut self) -> Self {
        self.ignore_events = true;
        self
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, RenderKind::Vector(_))
    }

    pub fn shape(&self) -> Option<&VectorShape> {
        match &self.kind {
            RenderKind::Vector(shape) => Some(shape),
            RenderKind::Node(_) => None,
        }
    }

    /// Hit-test a pixel position against this item.
    ///
    /// Node items only answer when they are anchored at a fixed pixel
    /// position and know their size.
    pub fn contains(&self, px: &Point, tolerance: f64) -> Option<HitKind> {
        match &self.kind {
            RenderKind::Vector(shape) => shape.contains(px, tolerance),
            RenderKind::Node(_) => {
                let position = self.position?;
                let offset = self.offset.unwrap_or(Point::new(0.0, 0.0));
                let (width, height) = (self.width?, self.height?);
                let min = position.translate(offset.x, offset.y);
                let area = BBox::new(min, min.translate(width, height)).expand(tolerance);
                area.contains_point(px).then_some(HitKind::Node)
            }
        }
    }
}

/// The ordered item list a feature returned from one render call.
///
/// Cloning shares the items and keeps the identity.
#[derive(Debug, Clone)]
pub struct RenderSet {
    id: RenderSetId,
    items: Rc<[RenderItem]>,
}

impl RenderSet {
    pub fn new(items: Vec<RenderItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn id(&self) -> RenderSetId {
        self.id
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn same_as(&self, other: &RenderSet) -> bool {
        self.id == other.id
    }

    pub fn has_render(&self, render: RenderId) -> bool {
        self.items.iter().any(|item| item.id == render)
    }

    pub fn ids(&self) -> impl Iterator<Item = RenderId> + '_ {
        self.items.iter().map(|item| item.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ImageSource;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_polygon_hit_fill_and_stroke() {
        let shape = VectorShape::Polygon {
            rings: vec![square(10.0)],
            fill: Color::rgb(255, 0, 0),
            stroke: Some(Stroke::default()),
        };
        assert_eq!(shape.contains(&Point::new(5.0, 5.0), 0.0), Some(HitKind::Fill));
        // Closing edge from the last vertex back to the first.
        assert_eq!(
            shape.contains(&Point::new(0.2, 5.0), 0.0),
            Some(HitKind::Stroke { ring: 0, segment: 3 })
        );
        assert_eq!(shape.contains(&Point::new(20.0, 5.0), 2.0), None);
    }

    #[test]
    fn test_polyline_hit_uses_tolerance() {
        let shape = VectorShape::Polyline {
            rings: vec![vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]],
            stroke: Stroke::default(),
        };
        assert_eq!(shape.contains(&Point::new(5.0, 2.0), 0.0), None);
        assert_eq!(
            shape.contains(&Point::new(5.0, 2.0), 2.0),
            Some(HitKind::Stroke { ring: 0, segment: 0 })
        );
    }

    #[test]
    fn test_node_item_hit_area() {
        let item = RenderItem::node(Rc::new(ImageSource::new("pin.png", 10.0, 20.0)))
            .with_position(Point::new(100.0, 100.0), Some(Point::new(-5.0, -20.0)))
            .with_size(10.0, 20.0);
        assert_eq!(item.contains(&Point::new(100.0, 90.0), 0.0), Some(HitKind::Node));
        assert_eq!(item.contains(&Point::new(100.0, 101.0), 0.0), None);
        assert!(!item.is_vector());
    }

    #[test]
    fn test_shape_bbox_includes_stroke() {
        let shape = VectorShape::Polyline {
            rings: vec![vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]],
            stroke: Stroke {
                color: Color::default(),
                width: 4.0,
            },
        };
        let bbox = shape.bbox().unwrap();
        assert_eq!(bbox.min, Point::new(-2.0, -2.0));
        assert_eq!(bbox.max, Point::new(12.0, 2.0));
    }

    #[test]
    fn test_render_set_identity() {
        let set = RenderSet::new(vec![RenderItem::vector(VectorShape::Polyline {
            rings: vec![],
            stroke: Stroke::default(),
        })]);
        let shared = set.clone();
        assert!(set.same_as(&shared));
        assert!(!set.same_as(&RenderSet::new(set.items().to_vec())));
        assert!(set.has_render(set.items()[0].id));
    }

    #[test]
    fn test_event_kind_names_match_serde() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
