//! Drives a small city layer through a pan burst and a zoom, then prints the
//! composed frame as JSON.
//!
//! Usage: `mapview-demo [renderer-settings.json]`

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use mapview_core::{
    Color, Crs, EventKind, FeatureLayer, FeatureLayerSettings, Geometry, Point, SharedFeature,
    SimpleFeature, Stroke, Symbol,
};
use mapview_renderer::{
    ContainerSnapshot, LayerRenderer, MapContext, MapFrame, RendererSettings, RendererSnapshot,
    Viewport,
};
use serde::Serialize;

#[derive(Serialize)]
struct FrameReport {
    renderer: RendererSnapshot,
    container: ContainerSnapshot,
}

fn load_settings() -> Result<RendererSettings, String> {
    match std::env::args().nth(1) {
        Some(path) => RendererSettings::load(Path::new(&path)).map_err(|e| e.to_string()),
        None => Ok(RendererSettings::default()),
    }
}

fn road(y: f64) -> SharedFeature {
    Rc::new(SimpleFeature::new(
        Geometry::Polyline(vec![vec![Point::new(0.0, y), Point::new(1000.0, y)]]),
        Symbol::Line {
            stroke: Stroke {
                color: Color::rgb(120, 120, 120),
                width: 3.0,
            },
        },
        Crs::web_mercator(),
    ))
}

fn marker(x: f64, y: f64, src: &str) -> SharedFeature {
    Rc::new(SimpleFeature::new(
        Geometry::Point(Point::new(x, y)),
        Symbol::Image {
            src: src.to_string(),
            width: 24.0,
            height: 24.0,
            anchor: Point::new(-12.0, -24.0),
        },
        Crs::web_mercator(),
    ))
}

fn park() -> SharedFeature {
    let ring = vec![
        Point::new(300.0, 300.0),
        Point::new(500.0, 300.0),
        Point::new(500.0, 500.0),
        Point::new(300.0, 500.0),
    ];
    Rc::new(
        SimpleFeature::new(
            Geometry::Polygon(vec![ring]),
            Symbol::Fill {
                fill: Color::rgb(60, 160, 80).with_alpha(200),
                stroke: None,
            },
            Crs::web_mercator(),
        )
        .with_listener(EventKind::Click),
    )
}

fn step(renderer: &mut LayerRenderer, ms: u64) -> Result<(), String> {
    renderer
        .advance(Duration::from_millis(ms))
        .map_err(|e| e.to_string())
}

fn run() -> Result<(), String> {
    let settings = load_settings()?;

    let frame = Rc::new(MapFrame::new(Viewport::new(
        Point::new(500.0, 500.0),
        2.0,
        800.0,
        600.0,
        Crs::web_mercator(),
    )));
    frame
        .push_container()
        .ok_or_else(|| "map has no viewport".to_string())?;

    let layer = Rc::new(FeatureLayer::with_settings(
        "city",
        FeatureLayerSettings {
            transition_time_ms: 250,
            ..Default::default()
        },
    ));
    layer
        .add(&[
            road(400.0),
            road(600.0),
            park(),
            marker(350.0, 450.0, "cafe.png"),
            marker(800.0, 700.0, "museum.png"),
        ])
        .map_err(|e| e.to_string())?;

    let mut renderer = LayerRenderer::new(frame.clone(), layer.clone(), 0, settings);
    renderer.update().map_err(|e| e.to_string())?;
    step(&mut renderer, 100)?;
    log::info!("Initial draw: {} loading", renderer.loading_count());

    // A burst of pans collapses into one redraw.
    for _ in 0..3 {
        frame.update_viewport(|v| v.pan(120.0, 0.0));
        renderer.update().map_err(|e| e.to_string())?;
        step(&mut renderer, 100)?;
    }
    step(&mut renderer, 1000)?;

    frame.update_viewport(|v| v.zoom_at(400.0, 300.0, 2.0));
    frame
        .push_container()
        .ok_or_else(|| "map has no viewport".to_string())?;
    renderer.move_to_last_container();
    renderer.force_update();
    renderer.update().map_err(|e| e.to_string())?;
    step(&mut renderer, 1000)?;
    frame.retain_current_container();

    let viewport = frame
        .viewport()
        .ok_or_else(|| "map has no viewport".to_string())?;
    let px = viewport.screen_to_render_px(viewport.map_to_screen(Point::new(400.0, 400.0)));
    match renderer.get_event_catcher(EventKind::Click, px) {
        Some(hit) => log::info!(
            "Click at {:?} hits feature {} ({:?})",
            px,
            hit.feature.id(),
            hit.intersection
        ),
        None => log::info!("Click at {:?} hits nothing", px),
    }

    let container = frame
        .current_container()
        .ok_or_else(|| "map has no container".to_string())?;
    let report = FrameReport {
        renderer: renderer.snapshot(),
        container: container.borrow().snapshot(),
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
