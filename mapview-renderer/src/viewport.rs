use mapview_core::{BBox, Crs, Point};
use serde::{Deserialize, Serialize};

/// Represents the current viewport state of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center in map coordinates.
    pub center: Point,
    /// Map units per pixel.
    pub resolution: f64,
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
    pub crs: Crs,
}

impl Viewport {
    pub fn new(center: Point, resolution: f64, width: f64, height: f64, crs: Crs) -> Self {
        Self {
            center,
            resolution,
            width,
            height,
            crs,
        }
    }

    /// Pan the viewport by a delta in screen pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center.x -= dx * self.resolution;
        self.center.y += dy * self.resolution;
    }

    /// Zoom in/out centered on a screen position. A factor above 1 zooms in.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let anchor = self.screen_to_map(Point::new(screen_x, screen_y));

        self.resolution /= factor;

        // Adjust center so the point under the cursor stays fixed
        let moved = self.screen_to_map(Point::new(screen_x, screen_y));
        self.center.x -= moved.x - anchor.x;
        self.center.y -= moved.y - anchor.y;
    }

    pub fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    /// Convert a screen position to map coordinates.
    pub fn screen_to_map(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.width / 2.0) * self.resolution + self.center.x,
            (self.height / 2.0 - screen.y) * self.resolution + self.center.y,
        )
    }

    /// Convert map coordinates to a screen position.
    pub fn map_to_screen(&self, map: Point) -> Point {
        Point::new(
            (map.x - self.center.x) / self.resolution + self.width / 2.0,
            (self.center.y - map.y) / self.resolution + self.height / 2.0,
        )
    }

    /// Convert a screen position into the pixel space render items are
    /// produced in (`x / resolution`, `y / -resolution`).
    pub fn screen_to_render_px(&self, screen: Point) -> Point {
        let map = self.screen_to_map(screen);
        Point::new(map.x / self.resolution, map.y / -self.resolution)
    }

    /// Get the visible bounding box in map coordinates.
    pub fn bbox(&self) -> BBox {
        let half_w = self.width * self.resolution / 2.0;
        let half_h = self.height * self.resolution / 2.0;
        BBox::from_corners(
            self.center.x - half_w,
            self.center.y - half_h,
            self.center.x + half_w,
            self.center.y + half_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Point::new(100.0, 50.0), 2.0, 200.0, 100.0, Crs::web_mercator())
    }

    #[test]
    fn test_bbox_covers_canvas() {
        let bbox = viewport().bbox();
        assert_eq!(bbox.min, Point::new(-100.0, -50.0));
        assert_eq!(bbox.max, Point::new(300.0, 150.0));
    }

    #[test]
    fn test_screen_map_roundtrip_corner() {
        let v = viewport();
        let top_left = v.screen_to_map(Point::new(0.0, 0.0));
        assert_eq!(top_left, Point::new(-100.0, 150.0));
        assert_eq!(v.map_to_screen(top_left), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut v = viewport();
        let anchor = v.screen_to_map(Point::new(20.0, 30.0));
        v.zoom_at(20.0, 30.0, 2.0);
        assert!((v.resolution - 1.0).abs() < 1e-12);
        let after = v.screen_to_map(Point::new(20.0, 30.0));
        assert!(anchor.distance_to(&after) < 1e-9);
    }

    #[test]
    fn test_render_px_matches_feature_projection() {
        let v = viewport();
        let px = v.screen_to_render_px(Point::new(0.0, 0.0));
        assert_eq!(px, Point::new(-50.0, -75.0));
    }
}
