//! Force-directed layout over a [`GraphSnapshot`].
//!
//! The simulation owns the live snapshot once initialized: node positions and
//! velocities are only written here (and through the drag/pin mutators).

mod animation;
mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};
use thiserror::Error;

use crate::graph::GraphSnapshot;
use crate::settings::Settings;

pub use animation::{AnimationLoop, FrameScheduler};
use forces::{
    CollisionParams, RepulsionParams, accumulate_collision_pairs, accumulate_repulsion_for_node,
    spring_force,
};
use quadtree::QuadNode;

const ALPHA_START: f32 = 1.0;
const ALPHA_MIN: f32 = 0.001;
const ALPHA_DECAY: f32 = 0.0228;
const DRAG_ALPHA_TARGET: f32 = 0.3;
const VELOCITY_DAMPING: f32 = 0.88;
const BARNES_HUT_THETA: f32 = 0.72;
const REPULSION_SCALE: f32 = 100.0;
const REPULSION_SOFTENING: f32 = 100.0;
const SPRING_STIFFNESS: f32 = 0.05;
const SPRING_DAMPING: f32 = 0.1;
const CENTER_SCALE: f32 = 0.1;
const COLLISION_STRENGTH: f32 = 0.7;
const MAX_FORCE: f32 = 250.0;
const MAX_SPEED: f32 = 40.0;
/// Arc length reserved per node on the initial circle, in node sizes.
const INITIAL_SPACING: f32 = 4.0;
const RESIZE_EPSILON: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    Uninitialized,
    Running,
    Paused,
    Destroyed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("simulation is already initialized")]
    AlreadyInitialized,
    #[error("simulation has been destroyed")]
    Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ForceParams {
    node_size: f32,
    link_distance: f32,
    repulsion_force: f32,
    center_force: f32,
    repulsion_cutoff: Option<f32>,
}

impl ForceParams {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            node_size: settings.node_size,
            link_distance: settings.link_distance,
            repulsion_force: settings.repulsion_force,
            center_force: settings.center_force,
            repulsion_cutoff: settings.repulsion_cutoff,
        }
    }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
    forces: Vec<Vec2>,
}

impl PhysicsScratch {
    fn clear(&mut self) {
        self.positions.clear();
        self.velocities.clear();
        self.radii.clear();
        self.forces.clear();
    }
}

pub struct ForceSimulation {
    state: SimulationState,
    snapshot: GraphSnapshot,
    params: ForceParams,
    center: Vec2,
    alpha: f32,
    alpha_target: f32,
    dragging: Option<String>,
    scratch: PhysicsScratch,
}

impl ForceSimulation {
    pub fn new(settings: &Settings, width: f32, height: f32) -> Self {
        Self {
            state: SimulationState::Uninitialized,
            snapshot: GraphSnapshot::default(),
            params: ForceParams::from_settings(settings),
            center: vec2(width, height) * 0.5,
            alpha: ALPHA_START,
            alpha_target: 0.0,
            dragging: None,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// View-level edits only (visibility flags); structure changes go through [`Self::update_data`].
    pub fn snapshot_mut(&mut self) -> &mut GraphSnapshot {
        &mut self.snapshot
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn is_settled(&self) -> bool {
        self.dragging.is_none() && self.alpha < ALPHA_MIN
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    fn ensure_alive(&self) -> Result<(), SimulationError> {
        match self.state {
            SimulationState::Destroyed => Err(SimulationError::Destroyed),
            SimulationState::Uninitialized => Err(SimulationError::NotInitialized),
            SimulationState::Running | SimulationState::Paused => Ok(()),
        }
    }

    fn reheat(&mut self) {
        self.alpha = ALPHA_START;
    }

    pub fn initialize(&mut self, snapshot: GraphSnapshot) -> Result<(), SimulationError> {
        match self.state {
            SimulationState::Uninitialized => {}
            SimulationState::Destroyed => return Err(SimulationError::Destroyed),
            SimulationState::Running | SimulationState::Paused => {
                return Err(SimulationError::AlreadyInitialized);
            }
        }

        self.load(snapshot);
        self.state = SimulationState::Running;
        tracing::debug!(nodes = self.snapshot.node_count(), "simulation initialized");
        Ok(())
    }

    /// Replaces the graph and restarts from a fresh circular layout. Pins survive by node id.
    pub fn update_data(&mut self, snapshot: GraphSnapshot) -> Result<(), SimulationError> {
        self.ensure_alive()?;
        self.load(snapshot);
        Ok(())
    }

    pub fn update_forces(&mut self, settings: &Settings) -> Result<(), SimulationError> {
        if self.state == SimulationState::Destroyed {
            return Err(SimulationError::Destroyed);
        }
        self.params = ForceParams::from_settings(settings);
        self.reheat();
        Ok(())
    }

    pub fn toggle_animation(&mut self, run: bool) -> Result<(), SimulationError> {
        self.ensure_alive()?;
        self.state = if run {
            SimulationState::Running
        } else {
            SimulationState::Paused
        };
        Ok(())
    }

    /// Re-centres the layout on the new viewport; unchanged sizes are a no-op.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), SimulationError> {
        if self.state == SimulationState::Destroyed {
            return Err(SimulationError::Destroyed);
        }
        let center = vec2(width, height) * 0.5;
        if (center - self.center).length() > RESIZE_EPSILON {
            self.center = center;
            self.reheat();
        }
        Ok(())
    }

    pub fn destroy(&mut self) {
        if self.state == SimulationState::Destroyed {
            return;
        }
        self.state = SimulationState::Destroyed;
        self.snapshot = GraphSnapshot::default();
        self.scratch = PhysicsScratch::default();
        self.dragging = None;
        tracing::debug!("simulation destroyed");
    }

    fn load(&mut self, mut snapshot: GraphSnapshot) {
        let previous = std::mem::take(&mut self.snapshot);

        let count = snapshot.node_count();
        let radius = self
            .params
            .link_distance
            .max(count as f32 * INITIAL_SPACING * self.params.node_size / std::f32::consts::TAU);
        for (index, node) in snapshot.nodes_mut().enumerate() {
            node.velocity = Vec2::ZERO;
            node.pinned = previous.node(&node.id).and_then(|old| old.pinned);
            node.position = match node.pinned {
                Some(pin) => pin,
                None if count == 1 => self.center,
                None => {
                    let angle = index as f32 / count as f32 * std::f32::consts::TAU;
                    self.center + vec2(angle.cos(), angle.sin()) * radius
                }
            };
        }

        if let Some(id) = &self.dragging
            && snapshot.node(id).is_none()
        {
            self.dragging = None;
            self.alpha_target = 0.0;
        }

        self.snapshot = snapshot;
        self.reheat();
    }

    pub fn begin_drag(&mut self, id: &str) -> bool {
        if self.ensure_alive().is_err() {
            return false;
        }
        let Some(node) = self.snapshot.node_mut(id) else {
            return false;
        };
        node.pinned = Some(node.position);
        node.velocity = Vec2::ZERO;

        self.dragging = Some(id.to_owned());
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.alpha = self.alpha.max(DRAG_ALPHA_TARGET);
        true
    }

    pub fn drag_to(&mut self, position: Vec2) {
        let Some(id) = self.dragging.as_deref() else {
            return;
        };
        if let Some(node) = self.snapshot.node_mut(id) {
            node.pinned = Some(position);
            node.position = position;
            node.velocity = Vec2::ZERO;
        }
    }

    /// `keep_pinned` leaves the node fixed at its drop point; otherwise it rejoins the layout.
    pub fn end_drag(&mut self, keep_pinned: bool) {
        let Some(id) = self.dragging.take() else {
            return;
        };
        self.alpha_target = 0.0;
        if !keep_pinned && let Some(node) = self.snapshot.node_mut(&id) {
            node.pinned = None;
        }
    }

    pub fn release_pin(&mut self, id: &str) -> bool {
        if self.dragging.as_deref() == Some(id) {
            return false;
        }
        let Some(node) = self.snapshot.node_mut(id) else {
            return false;
        };
        if node.pinned.take().is_none() {
            return false;
        }
        self.alpha = self.alpha.max(DRAG_ALPHA_TARGET);
        true
    }

    /// Advances one step. Returns `false` when nothing moved (paused, settled or torn down).
    pub fn tick(&mut self, delta_seconds: f32) -> bool {
        if self.state != SimulationState::Running || self.is_settled() {
            return false;
        }

        let time_step_scale = (delta_seconds * 60.0).clamp(0.25, 3.0);
        self.step(time_step_scale);
        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY * time_step_scale;
        true
    }

    fn step(&mut self, time_step_scale: f32) {
        let Self {
            snapshot,
            params,
            center,
            alpha,
            scratch,
            ..
        } = self;

        let node_count = snapshot.node_count();
        if node_count == 0 {
            return;
        }

        scratch.clear();
        let mut max_radius = 0.0_f32;
        for node in snapshot.nodes() {
            let radius = node.radius(params.node_size);
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
            scratch.radii.push(radius);
            max_radius = max_radius.max(radius);
        }
        scratch.forces.resize(node_count, Vec2::ZERO);

        let positions = &scratch.positions;
        let forces = &mut scratch.forces;

        if node_count >= 2
            && let Some(tree) = QuadNode::build(positions)
        {
            let repulsion = RepulsionParams {
                strength: params.repulsion_force * REPULSION_SCALE,
                softening: REPULSION_SOFTENING,
                theta: BARNES_HUT_THETA,
                cutoff_sq: params.repulsion_cutoff.map(|cutoff| cutoff * cutoff),
            };
            for (index, force) in forces.iter_mut().enumerate() {
                accumulate_repulsion_for_node(&tree, index, positions, repulsion, force);
            }

            let reach = max_radius * 2.0;
            accumulate_collision_pairs(
                &tree,
                &tree,
                true,
                positions,
                &scratch.radii,
                CollisionParams {
                    strength: COLLISION_STRENGTH,
                    max_distance_sq: reach * reach,
                },
                forces,
            );
        }

        let mut dangling = 0usize;
        for link in snapshot.links() {
            let Some((from, to)) = snapshot.link_endpoints(link) else {
                dangling += 1;
                continue;
            };
            if from == to {
                continue;
            }
            let pull = spring_force(
                positions[from],
                positions[to],
                scratch.velocities[from] - scratch.velocities[to],
                params.link_distance,
                SPRING_STIFFNESS,
                SPRING_DAMPING,
            );
            forces[from] += pull;
            forces[to] -= pull;
        }
        if dangling > 0 {
            tracing::trace!(dangling, "skipped links with missing endpoints");
        }

        let center_pull = params.center_force * CENTER_SCALE;
        for (force, position) in forces.iter_mut().zip(positions) {
            *force += (*center - *position) * center_pull;
        }

        let damping = VELOCITY_DAMPING.powf(time_step_scale);
        for (node, force) in snapshot.nodes_mut().zip(forces.iter()) {
            if let Some(pin) = node.pinned {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let mut force = *force * *alpha;
            let force_length = force.length();
            if force_length > MAX_FORCE {
                force *= MAX_FORCE / force_length;
            }

            let mut velocity = (node.velocity + force * time_step_scale) * damping;
            let speed = velocity.length();
            if speed > MAX_SPEED {
                velocity *= MAX_SPEED / speed;
            }

            node.velocity = velocity;
            node.position += velocity * time_step_scale;
            if !(node.position.x.is_finite() && node.position.y.is_finite()) {
                node.position = *center;
                node.velocity = Vec2::ZERO;
            }
        }
    }
}
