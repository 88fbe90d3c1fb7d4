use eframe::egui::ecolor::Hsva;
use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::graph::{LinkKind, Node, NodeKind};
use crate::interaction::Camera;
use crate::util::stable_unit;

pub(super) const DOCUMENT_COLOR: Color32 = Color32::from_rgb(110, 170, 235);
pub(super) const PINNED_RING: Color32 = Color32::from_rgb(250, 205, 95);
pub(super) const SELECTED_RING: Color32 = Color32::WHITE;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;
    let mix = |a: u8, b: u8| ((a as f32 * inverse) + (b as f32 * amount)) as u8;

    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * camera.zoom().clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + camera.pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Cheap bounding-box rejection for segments entirely outside `rect`.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    !(max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom())
}

pub(super) fn node_color(node: &Node) -> Color32 {
    match node.kind {
        NodeKind::Document => DOCUMENT_COLOR,
        NodeKind::Tag => Hsva::new(stable_unit(&node.id), 0.55, 0.9, 1.0).into(),
    }
}

pub(super) fn link_color(kind: LinkKind, similarity: Option<f32>) -> Color32 {
    match kind {
        LinkKind::ExplicitReference => Color32::from_rgba_unmultiplied(150, 160, 175, 150),
        LinkKind::SemanticSimilarity => {
            let strength = similarity.unwrap_or(0.0).clamp(0.0, 1.0);
            Color32::from_rgba_unmultiplied(
                (120.0 + 100.0 * strength) as u8,
                (110.0 + 40.0 * strength) as u8,
                230,
                (90.0 + 120.0 * strength) as u8,
            )
        }
        LinkKind::TagMembership => Color32::from_rgba_unmultiplied(140, 200, 150, 90),
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn offscreen_edges_are_rejected() {
        let rect = Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 1.0));
        assert!(!edge_visible(rect, pos2(-50.0, -50.0), pos2(-10.0, -20.0), 1.0));
        assert!(circle_visible(rect, pos2(-3.0, 50.0), 5.0));
        assert!(!circle_visible(rect, pos2(-6.0, 50.0), 5.0));
    }

    #[test]
    fn tag_colors_are_stable_per_id() {
        let tag = Node::tag("#rust", 2);
        assert_eq!(node_color(&tag), node_color(&Node::tag("#rust", 9)));
        assert_eq!(node_color(&Node::document("a.md", "a", None)), DOCUMENT_COLOR);
    }
}
