//! # Mapview Core
//!
//! Contracts shared by map layers and the layer renderer: geometry and CRS
//! types, features and the render items they produce, node sources, and
//! feature layers with R-tree viewport culling.

pub mod geometry;
pub mod feature;
pub mod layer;
pub mod node;
pub mod render_item;
pub mod spatial;

pub use feature::{Feature, FeatureId, Geometry, SharedFeature, SimpleFeature, Symbol};
pub use geometry::{BBox, Crs, Point};
pub use layer::{FeatureLayer, FeatureLayerSettings, Layer, LayerError, LayerId, ResolutionLimits, SharedLayer};
pub use node::{ImageSource, Node, NodeContent, NodeId, NodeSource, NodeTask, RenderError, RenderedNode};
pub use render_item::{
    Color, EventKind, HitKind, RenderId, RenderItem, RenderKind, RenderSet, RenderSetId, Stroke,
    VectorShape,
};
