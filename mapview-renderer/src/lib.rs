//! # Mapview Renderer
//!
//! Per-layer rendering for the map: decides which features are drawn, how
//! (batched onto a shared canvas or as individual nodes), when superseded
//! output is torn down, and which feature answers a pointer event.
//!
//! Everything runs on a single-threaded virtual clock; asynchronous node
//! builds and delayed work are delivered by [`LayerRenderer::advance`].

pub mod canvas;
pub mod container;
pub mod layer_renderer;
pub mod master;
pub mod render_data;
pub mod scheduler;
pub mod settings;
pub mod svg_render;
pub mod viewport;

pub use canvas::Canvas;
pub use container::{Container, ContainerId, NodeContainer, SharedContainer};
pub use layer_renderer::{EventCatch, LayerRenderer};
pub use master::{MapContext, MapFrame};
pub use render_data::{
    ContainerSnapshot, DrawCommand, FeatureSnapshot, PlacedNodeSnapshot, Placement,
    RendererSnapshot,
};
pub use scheduler::{Scheduler, TaskId};
pub use settings::{RendererSettings, SettingsError};
pub use svg_render::SvgRender;
pub use viewport::Viewport;
