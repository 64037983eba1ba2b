use serde::{Deserialize, Serialize};
use studio_core::geometry::{BBox, Point};

/// Pan and zoom state of the design canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center X in scene coordinates.
    pub center_x: f64,
    /// Center Y in scene coordinates.
    pub center_y: f64,
    /// Zoom level (screen pixels per scene unit).
    pub zoom: f64,
    /// Canvas width in pixels.
    pub canvas_width: f64,
    /// Canvas height in pixels.
    pub canvas_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    /// A viewport showing the scene from its origin at 1:1.
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            center_x: canvas_width / 2.0,
            center_y: canvas_height / 2.0,
            zoom: 1.0,
            canvas_width,
            canvas_height,
        }
    }

    /// Pan the viewport by a delta in screen pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x -= dx / self.zoom;
        self.center_y -= dy / self.zoom;
    }

    /// Zoom in/out centered on a screen position.
    pub fn zoom_at(&mut self, screen_x: f64, screen_y: f64, factor: f64) {
        let before = self.screen_to_scene(screen_x, screen_y);

        self.zoom = (self.zoom * factor).clamp(0.01, 100.0);

        // Keep the point under the cursor fixed
        let after = self.screen_to_scene(screen_x, screen_y);
        self.center_x -= after.x - before.x;
        self.center_y -= after.y - before.y;
    }

    /// Zoom to fit a bounding box with a 10% margin.
    pub fn fit_bbox(&mut self, bbox: &BBox) {
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return;
        }
        let center = bbox.center();
        self.center_x = center.x;
        self.center_y = center.y;

        let zoom_x = self.canvas_width / bbox.width() * 0.9;
        let zoom_y = self.canvas_height / bbox.height() * 0.9;
        self.zoom = zoom_x.min(zoom_y);
    }

    pub fn screen_to_scene(&self, screen_x: f64, screen_y: f64) -> Point {
        Point::new(
            (screen_x - self.canvas_width / 2.0) / self.zoom + self.center_x,
            (screen_y - self.canvas_height / 2.0) / self.zoom + self.center_y,
        )
    }

    pub fn scene_to_screen(&self, scene: &Point) -> Point {
        Point::new(
            (scene.x - self.center_x) * self.zoom + self.canvas_width / 2.0,
            (scene.y - self.center_y) * self.zoom + self.canvas_height / 2.0,
        )
    }

    /// The visible rectangle in scene coordinates.
    pub fn visible_bounds(&self) -> BBox {
        let half_w = self.canvas_width / (2.0 * self.zoom);
        let half_h = self.canvas_height / (2.0 * self.zoom);
        BBox::new(
            Point::new(self.center_x - half_w, self.center_y - half_h),
            Point::new(self.center_x + half_w, self.center_y + half_h),
        )
    }

    /// Visible rectangle grown by `padding` scene units on every side.
    pub fn padded_bounds(&self, padding: f64) -> BBox {
        self.visible_bounds().expand(padding)
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shows_origin() {
        let vp = Viewport::new(800.0, 600.0);
        let bounds = vp.visible_bounds();
        assert_eq!(bounds.min, Point::new(0.0, 0.0));
        assert_eq!(bounds.max, Point::new(800.0, 600.0));
    }

    #[test]
    fn test_pan_moves_visible_window() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.zoom = 2.0;
        vp.pan(100.0, 0.0);
        assert!((vp.center_x - 350.0).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_at_keeps_cursor_point() {
        let mut vp = Viewport::new(800.0, 600.0);
        let before = vp.screen_to_scene(200.0, 150.0);
        vp.zoom_at(200.0, 150.0, 2.5);
        let after = vp.screen_to_scene(200.0, 150.0);
        assert!(before.approx_eq(&after, 1e-9));
    }

    #[test]
    fn test_screen_scene_roundtrip() {
        let mut vp = Viewport::new(1024.0, 768.0);
        vp.zoom = 0.5;
        vp.pan(-40.0, 25.0);
        let p = Point::new(123.0, -45.0);
        let back = vp.screen_to_scene(vp.scene_to_screen(&p).x, vp.scene_to_screen(&p).y);
        assert!(p.approx_eq(&back, 1e-9));
    }

    #[test]
    fn test_padded_bounds() {
        let vp = Viewport::new(100.0, 100.0);
        let padded = vp.padded_bounds(50.0);
        assert_eq!(padded.min, Point::new(-50.0, -50.0));
        assert_eq!(padded.max, Point::new(150.0, 150.0));
    }

    #[test]
    fn test_fit_bbox() {
        let mut vp = Viewport::new(1000.0, 1000.0);
        vp.fit_bbox(&BBox::from_origin_size(0.0, 0.0, 500.0, 250.0));
        assert!((vp.zoom - 1.8).abs() < 1e-10);
        assert_eq!(vp.center(), Point::new(250.0, 125.0));
    }
}
