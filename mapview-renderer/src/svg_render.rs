use std::fmt::Write;

use mapview_core::{
    Node, NodeContent, NodeTask, Point, RenderError, RenderItem, RenderedNode, VectorShape,
};

/// Converts a vector render item into a standalone SVG node.
///
/// A ratio other than 1 re-renders the item at a different scale, which is
/// how nodes follow a container with a different resolution.
#[derive(Debug)]
pub struct SvgRender<'a> {
    item: &'a RenderItem,
    ratio: f64,
}

impl<'a> SvgRender<'a> {
    pub fn new(item: &'a RenderItem) -> Self {
        Self::with_ratio(item, 1.0)
    }

    pub fn with_ratio(item: &'a RenderItem, ratio: f64) -> Self {
        Self { item, ratio }
    }

    fn scaled_shape(&self) -> Option<VectorShape> {
        self.item.shape().map(|shape| shape.scaled(self.ratio))
    }

    /// Pixel anchor of the node's top-left corner.
    pub fn position(&self) -> Option<Point> {
        self.scaled_shape()?.bbox().map(|b| b.min)
    }

    /// Build the node. The outcome is delivered through the renderer's
    /// scheduler, so it is never observed synchronously.
    pub fn get_node(&self) -> NodeTask {
        let Some(shape) = self.scaled_shape() else {
            return NodeTask::failed(RenderError::UnsupportedItem(self.item.id));
        };
        let Some(bbox) = shape.bbox().filter(|b| b.is_valid()) else {
            return NodeTask::failed(RenderError::NodeCreation {
                render: self.item.id,
                reason: "shape has no drawable points".to_string(),
            });
        };

        let width = bbox.width().max(1.0);
        let height = bbox.height().max(1.0);
        let markup = svg_markup(&shape, bbox.min, width, height);
        NodeTask::ready(RenderedNode {
            node: Node::new(NodeContent::Svg(markup), width, height),
            position: Some(bbox.min),
        })
    }
}

fn path_data(shape: &VectorShape, origin: Point, closed: bool) -> String {
    let mut d = String::new();
    for ring in shape.rings().iter().filter(|r| !r.is_empty()) {
        for (i, p) in ring.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            let _ = write!(d, "{command}{:.2} {:.2} ", p.x - origin.x, p.y - origin.y);
        }
        if closed {
            d.push_str("Z ");
        }
    }
    d.trim_end().to_string()
}

fn svg_markup(shape: &VectorShape, origin: Point, width: f64, height: f64) -> String {
    let (closed, fill) = match shape {
        VectorShape::Polyline { .. } => (false, "none".to_string()),
        VectorShape::Polygon { fill, .. } => (true, fill.to_css()),
    };
    let stroke = match shape.stroke() {
        Some(s) => format!(
            r#" stroke="{}" stroke-width="{}""#,
            s.color.to_css(),
            s.width
        ),
        None => String::new(),
    };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.2}" height="{h:.2}" viewBox="0 0 {w:.2} {h:.2}"><path d="{d}" fill="{fill}" fill-rule="evenodd"{stroke}/></svg>"#,
        w = width,
        h = height,
        d = path_data(shape, origin, closed),
    )
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use mapview_core::{Color, ImageSource, Stroke};

    fn line() -> RenderItem {
        RenderItem::vector(VectorShape::Polyline {
            rings: vec![vec![Point::new(10.0, 10.0), Point::new(30.0, 20.0)]],
            stroke: Stroke {
                color: Color::rgb(255, 0, 0),
                width: 2.0,
            },
        })
    }

    #[test]
    fn test_node_is_anchored_at_shape_corner() {
        let item = line();
        let svg = SvgRender::new(&item);
        assert_eq!(svg.position(), Some(Point::new(9.0, 9.0)));

        let rendered = svg.get_node().outcome.unwrap();
        assert_eq!(rendered.position, Some(Point::new(9.0, 9.0)));
        assert_eq!(rendered.node.width, 22.0);
        match rendered.node.content {
            NodeContent::Svg(markup) => {
                assert!(markup.contains(r#"d="M1.00 1.00 L21.00 11.00""#));
                assert!(markup.contains(r#"fill="none""#));
            }
            other => panic!("expected svg content, got {other:?}"),
        }
    }

    #[test]
    fn test_ratio_rescales_shape() {
        let item = line();
        let svg = SvgRender::with_ratio(&item, 2.0);
        assert_eq!(svg.position(), Some(Point::new(19.0, 19.0)));
        let rendered = svg.get_node().outcome.unwrap();
        assert_eq!(rendered.node.width, 42.0);
    }

    #[test]
    fn test_polygon_path_is_closed() {
        let item = RenderItem::vector(VectorShape::Polygon {
            rings: vec![vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
            ]],
            fill: Color::rgb(0, 0, 255),
            stroke: None,
        });
        let rendered = SvgRender::new(&item).get_node().outcome.unwrap();
        let NodeContent::Svg(markup) = rendered.node.content else {
            panic!("expected svg content");
        };
        assert!(markup.contains(" Z\""));
        assert!(!markup.contains("stroke="));
    }

    #[test]
    fn test_node_items_are_unsupported() {
        let item = RenderItem::node(Rc::new(ImageSource::new("a.png", 1.0, 1.0)));
        let task = SvgRender::new(&item).get_node();
        assert_eq!(task.outcome.unwrap_err(), RenderError::UnsupportedItem(item.id));
    }

    #[test]
    fn test_empty_shape_fails() {
        let item = RenderItem::vector(VectorShape::Polyline {
            rings: vec![vec![]],
            stroke: Stroke::default(),
        });
        assert!(SvgRender::new(&item).get_node().outcome.is_err());
    }
}
