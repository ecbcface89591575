use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Crs, Point};
use crate::node::ImageSource;
use crate::render_item::{Color, EventKind, RenderItem, RenderSet, Stroke, VectorShape};

/// Unique feature identifier.
pub type FeatureId = Uuid;

/// A map object that knows how to turn itself into render items.
pub trait Feature: fmt::Debug {
    fn id(&self) -> FeatureId;

    /// Extent in the feature's own CRS, `None` when there is no geometry.
    fn bbox(&self) -> Option<BBox>;

    fn crs(&self) -> &Crs;

    fn projectable_to(&self, crs: &Crs) -> bool {
        self.crs().can_project_to(crs)
    }

    /// Produce the render items for a resolution and CRS. Returning the same
    /// [`RenderSet`] identity means nothing changed since the previous call.
    fn render(&self, resolution: f64, crs: &Crs) -> RenderSet;

    fn has_listeners(&self, event: EventKind) -> bool;
}

pub type SharedFeature = Rc<dyn Feature>;

/// Feature geometry in map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    Polyline(Vec<Vec<Point>>),
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    fn points(&self) -> Vec<Point> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::Polyline(rings) | Geometry::Polygon(rings) => {
                rings.iter().flatten().copied().collect()
            }
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points()).filter(|b| b.is_valid())
    }

    fn is_valid(&self) -> bool {
        let points = self.points();
        !points.is_empty() && points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// How a [`SimpleFeature`] is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Symbol {
    Line {
        stroke: Stroke,
    },
    Fill {
        fill: Color,
        stroke: Option<Stroke>,
    },
    /// A fixed-size image anchored at a point. `anchor` is the pixel offset of
    /// the image's top-left corner from the point.
    Image {
        src: String,
        width: f64,
        height: f64,
        anchor: Point,
    },
}

#[derive(Debug)]
struct RenderCache {
    resolution: f64,
    crs: Crs,
    set: RenderSet,
}

/// A feature with plain geometry and one symbol.
///
/// Render output is cached per resolution and CRS; changing geometry or
/// symbol drops the cache.
#[derive(Debug)]
pub struct SimpleFeature {
    id: FeatureId,
    crs: Crs,
    geometry: RefCell<Geometry>,
    symbol: RefCell<Symbol>,
    listeners: RefCell<HashSet<EventKind>>,
    cache: RefCell<Option<RenderCache>>,
}

impl SimpleFeature {
    pub fn new(geometry: Geometry, symbol: Symbol, crs: Crs) -> Self {
        Self {
            id: Uuid::new_v4(),
            crs,
            geometry: RefCell::new(geometry),
            symbol: RefCell::new(symbol),
            listeners: RefCell::new(HashSet::new()),
            cache: RefCell::new(None),
        }
    }

    pub fn with_listener(self, event: EventKind) -> Self {
        self.listen(event);
        self
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry.borrow().clone()
    }

    pub fn set_geometry(&self, geometry: Geometry) {
        *self.geometry.borrow_mut() = geometry;
        self.invalidate();
    }

    pub fn set_symbol(&self, symbol: Symbol) {
        *self.symbol.borrow_mut() = symbol;
        self.invalidate();
    }

    pub fn listen(&self, event: EventKind) {
        self.listeners.borrow_mut().insert(event);
    }

    pub fn unlisten(&self, event: EventKind) {
        self.listeners.borrow_mut().remove(&event);
    }

    pub fn invalidate(&self) {
        self.cache.borrow_mut().take();
    }

    fn build_items(&self, resolution: f64, crs: &Crs) -> Vec<RenderItem> {
        let geometry = self.geometry.borrow();
        if !self.projectable_to(crs) || !geometry.is_valid() || resolution <= 0.0 {
            return Vec::new();
        }

        let to_px = |p: &Point| Point::new(p.x / resolution, p.y / -resolution);
        let project = |rings: &[Vec<Point>]| -> Vec<Vec<Point>> {
            rings.iter().map(|ring| ring.iter().map(to_px).collect()).collect()
        };

        match (&*geometry, &*self.symbol.borrow()) {
            (Geometry::Polyline(rings), Symbol::Line { stroke })
            | (Geometry::Polygon(rings), Symbol::Line { stroke }) => {
                let mut rings = project(rings);
                if matches!(&*geometry, Geometry::Polygon(_)) {
                    for ring in &mut rings {
                        if let Some(first) = ring.first().copied() {
                            ring.push(first);
                        }
                    }
                }
                vec![RenderItem::vector(VectorShape::Polyline {
                    rings,
                    stroke: *stroke,
                })]
            }
            (Geometry::Polygon(rings), Symbol::Fill { fill, stroke }) => {
                vec![RenderItem::vector(VectorShape::Polygon {
                    rings: project(rings),
                    fill: *fill,
                    stroke: *stroke,
                })]
            }
            (
                Geometry::Point(point),
                Symbol::Image {
                    src,
                    width,
                    height,
                    anchor,
                },
            ) => {
                let source = ImageSource::new(src, *width, *height);
                vec![RenderItem::node(Rc::new(source))
                    .with_position(to_px(point), Some(*anchor))
                    .with_size(*width, *height)]
            }
            _ => Vec::new(),
        }
    }
}

impl Feature for SimpleFeature {
    fn id(&self) -> FeatureId {
        self.id
    }

    fn bbox(&self) -> Option<BBox> {
        self.geometry.borrow().bbox()
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn render(&self, resolution: f64, crs: &Crs) -> RenderSet {
        if let Some(cache) = self.cache.borrow().as_ref() {
            if cache.resolution == resolution && &cache.crs == crs {
                return cache.set.clone();
            }
        }

        let set = RenderSet::new(self.build_items(resolution, crs));
        *self.cache.borrow_mut() = Some(RenderCache {
            resolution,
            crs: crs.clone(),
            set: set.clone(),
        });
        set
    }

    fn has_listeners(&self, event: EventKind) -> bool {
        self.listeners.borrow().contains(&event)
    }
}
