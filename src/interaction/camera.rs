use eframe::egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 4.0;

/// Render-time view transform. Simulation coordinates never pass through it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub pan: Vec2,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn world_to_screen(&self, viewport: Rect, world: Vec2) -> Pos2 {
        viewport.min + self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, viewport: Rect, screen: Pos2) -> Vec2 {
        (screen - viewport.min - self.pan) / self.zoom
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Scales by `factor` while keeping the world point under `pointer` fixed on screen.
    pub fn zoom_at(&mut self, viewport: Rect, pointer: Pos2, factor: f32) {
        let world_before = self.screen_to_world(viewport, pointer);
        self.set_zoom(self.zoom * factor);
        self.pan = pointer - viewport.min - world_before * self.zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
