use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const COINCIDENT_DISTANCE: f32 = 0.0001;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) strength: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
    /// Squared interaction radius; cells entirely beyond it contribute nothing.
    pub(super) cutoff_sq: Option<f32>,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_distance_sq: f32,
}

/// Unit vector from `to` towards `from`, with a deterministic fallback for coincident points.
fn separation(from: Vec2, to: Vec2, from_index: usize, to_index: usize) -> (Vec2, f32) {
    let delta = from - to;
    let distance = delta.length();
    if distance > COINCIDENT_DISTANCE {
        return (delta / distance, distance);
    }

    let (low, high) = (from_index.min(to_index), from_index.max(to_index));
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * std::f32::consts::TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if from_index < to_index {
        (direction, distance)
    } else {
        (-direction, distance)
    }
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: RepulsionParams,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    if let Some(cutoff_sq) = params.cutoff_sq
        && node.bounds.distance_sq_to_point(point) > cutoff_sq
    {
        return;
    }

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let (direction, distance) = separation(point, positions[other], index, other);
            let distance_sq = distance * distance;
            if params.cutoff_sq.is_some_and(|cutoff_sq| distance_sq > cutoff_sq) {
                continue;
            }
            *force += direction * (params.strength / (distance_sq + params.softening));
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_sq().max(COINCIDENT_DISTANCE);
    let distance = distance_sq.sqrt();
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < params.theta
        && node.mass > 1.0;

    if can_approximate {
        let scaled = (params.strength * node.mass) / (distance_sq + params.softening);
        *force += (delta / distance) * scaled;
        return;
    }

    for child in node.children() {
        accumulate_repulsion_for_node(child, index, positions, params, force);
    }
}

fn push_apart(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    let (direction, distance) = separation(positions[from], positions[to], from, to);
    let min_distance = radii[from] + radii[to];
    if distance < min_distance {
        let push = direction * ((min_distance - distance) * params.strength);
        forces[from] += push;
        forces[to] -= push;
    }
}

/// Dual-tree walk pushing apart every pair closer than the sum of their radii.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    push_apart(from, to, positions, radii, params, forces);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_apart(from, to, positions, radii, params, forces);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(child_a, child_a, true, positions, radii, params, forces);
            for child_b in &children[offset + 1..] {
                accumulate_collision_pairs(child_a, child_b, false, positions, radii, params, forces);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, params, forces);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, params, forces);
        }
    }
}

/// Hooke spring between two endpoints; returns the force on `from` (negate for `to`).
pub(super) fn spring_force(
    from: Vec2,
    to: Vec2,
    relative_velocity: Vec2,
    rest_length: f32,
    stiffness: f32,
    damping: f32,
) -> Vec2 {
    let delta = from - to;
    let distance = delta.length();
    if distance <= COINCIDENT_DISTANCE {
        return Vec2::ZERO;
    }
    let direction = delta / distance;
    let stretch = (distance - rest_length) * stiffness;
    let damping_force = relative_velocity.dot(direction) * damping;
    -direction * (stretch + damping_force)
}
