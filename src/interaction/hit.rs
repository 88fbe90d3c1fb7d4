use eframe::egui::{Pos2, Rect};

use crate::graph::{GraphSnapshot, Link, Node};

use super::Camera;

/// Extra screen-space slack around a node's radius.
pub const NODE_HIT_EPSILON_PX: f32 = 3.0;
pub const LINK_HIT_TOLERANCE_PX: f32 = 5.0;

pub fn point_segment_distance(point: Pos2, start: Pos2, end: Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Closest visible node whose radius (plus slack) contains `pointer`.
pub fn node_at<'a>(
    snapshot: &'a GraphSnapshot,
    camera: &Camera,
    viewport: Rect,
    pointer: Pos2,
    node_size: f32,
) -> Option<&'a Node> {
    let world = camera.screen_to_world(viewport, pointer);
    let slack = NODE_HIT_EPSILON_PX / camera.zoom();

    snapshot
        .nodes()
        .filter(|node| node.visible)
        .filter_map(|node| {
            let distance = (node.position - world).length();
            (distance <= node.radius(node_size) + slack).then_some((node, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(node, _)| node)
}

/// Closest visible link within [`LINK_HIT_TOLERANCE_PX`] of `pointer`, measured on screen.
pub fn link_at<'a>(
    snapshot: &'a GraphSnapshot,
    camera: &Camera,
    viewport: Rect,
    pointer: Pos2,
) -> Option<&'a Link> {
    snapshot
        .links()
        .iter()
        .filter(|link| snapshot.link_visible(link))
        .filter_map(|link| {
            let source = snapshot.node(&link.source)?;
            let target = snapshot.node(&link.target)?;
            let distance = point_segment_distance(
                pointer,
                camera.world_to_screen(viewport, source.position),
                camera.world_to_screen(viewport, target.position),
            );
            (distance <= LINK_HIT_TOLERANCE_PX).then_some((link, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(link, _)| link)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn placed(id: &str, x: f32, y: f32) -> Node {
        let mut node = Node::document(id, id, None);
        node.position = vec2(x, y);
        node
    }

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(400.0, 400.0))
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let start = pos2(0.0, 0.0);
        let end = pos2(10.0, 0.0);
        assert_eq!(point_segment_distance(pos2(5.0, 3.0), start, end), 3.0);
        assert_eq!(point_segment_distance(pos2(-4.0, 3.0), start, end), 5.0);
        assert_eq!(point_segment_distance(pos2(1.0, 1.0), start, start), 2.0_f32.sqrt());
    }

    #[test]
    fn closest_visible_node_wins() {
        let mut snapshot = GraphSnapshot::new(
            [placed("a", 100.0, 100.0), placed("b", 106.0, 100.0)],
            [],
            1,
        );
        let camera = Camera::default();

        let hit = node_at(&snapshot, &camera, viewport(), pos2(104.0, 100.0), 6.0);
        assert_eq!(hit.map(|node| node.id.as_str()), Some("b"));

        snapshot.apply_visibility(|node| node.id != "b");
        let hit = node_at(&snapshot, &camera, viewport(), pos2(104.0, 100.0), 6.0);
        assert_eq!(hit.map(|node| node.id.as_str()), Some("a"));

        assert!(node_at(&snapshot, &camera, viewport(), pos2(200.0, 200.0), 6.0).is_none());
    }

    #[test]
    fn node_slack_applies_beyond_radius() {
        let snapshot = GraphSnapshot::new([placed("a", 100.0, 100.0)], [], 1);
        let camera = Camera::default();

        assert!(node_at(&snapshot, &camera, viewport(), pos2(108.0, 100.0), 6.0).is_some());
        assert!(node_at(&snapshot, &camera, viewport(), pos2(110.0, 100.0), 6.0).is_none());
    }

    #[test]
    fn links_hit_within_pixel_tolerance() {
        let mut snapshot = GraphSnapshot::new(
            [placed("a", 0.0, 100.0), placed("b", 200.0, 100.0)],
            [Link::explicit_reference("a", "b", 1.0)],
            1,
        );
        let mut camera = Camera::default();
        camera.set_zoom(2.0);

        let on_screen = camera.world_to_screen(viewport(), vec2(100.0, 100.0));
        assert!(link_at(&snapshot, &camera, viewport(), on_screen + vec2(0.0, 4.0)).is_some());
        assert!(link_at(&snapshot, &camera, viewport(), on_screen + vec2(0.0, 6.0)).is_none());

        snapshot.apply_visibility(|node| node.id == "a");
        assert!(link_at(&snapshot, &camera, viewport(), on_screen).is_none());
    }
}
