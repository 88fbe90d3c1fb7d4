//! Pointer handling on top of the live simulation: hit-testing, dragging, selection.

mod camera;
mod hit;

use anyhow::Result;
use eframe::egui::{Pos2, Rect, Vec2};

use crate::graph::NodeKind;
use crate::physics::ForceSimulation;

pub use camera::Camera;
pub use hit::{link_at, node_at};

/// Host hook for opening a document in an editor or viewer.
pub trait DocumentOpener {
    fn open_document(&mut self, id: &str) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Node(String),
    Link(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        node_id: String,
        /// Node position minus the pointer's world position at grab time.
        grab_offset: Vec2,
    },
}

#[derive(Debug, Default)]
pub struct Interaction {
    pub camera: Camera,
    drag: DragState,
    selection: Option<Selection>,
}

impl Interaction {
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Starts a drag when the pointer lands on a node. Returns whether one started.
    pub fn pointer_down(
        &mut self,
        simulation: &mut ForceSimulation,
        viewport: Rect,
        pointer: Pos2,
        node_size: f32,
    ) -> bool {
        let world = self.camera.screen_to_world(viewport, pointer);
        let Some(node) = node_at(simulation.snapshot(), &self.camera, viewport, pointer, node_size)
        else {
            return false;
        };
        let node_id = node.id.clone();
        let grab_offset = node.position - world;

        if !simulation.begin_drag(&node_id) {
            return false;
        }
        self.drag = DragState::Dragging {
            node_id,
            grab_offset,
        };
        true
    }

    pub fn pointer_move(&mut self, simulation: &mut ForceSimulation, viewport: Rect, pointer: Pos2) {
        if let DragState::Dragging { grab_offset, .. } = &self.drag {
            let world = self.camera.screen_to_world(viewport, pointer);
            simulation.drag_to(world + *grab_offset);
        }
    }

    /// Ends the current drag; returns the dragged node id.
    pub fn pointer_up(&mut self, simulation: &mut ForceSimulation, keep_pinned: bool) -> Option<String> {
        match std::mem::take(&mut self.drag) {
            DragState::Idle => None,
            DragState::Dragging { node_id, .. } => {
                simulation.end_drag(keep_pinned);
                Some(node_id)
            }
        }
    }

    /// Selects whatever is under the pointer (nodes before links). A document node is also
    /// handed to `opener`; open failures are logged and do not affect selection.
    pub fn click(
        &mut self,
        simulation: &ForceSimulation,
        viewport: Rect,
        pointer: Pos2,
        node_size: f32,
        opener: &mut dyn DocumentOpener,
    ) -> Option<&Selection> {
        let snapshot = simulation.snapshot();
        self.selection = if let Some(node) = node_at(snapshot, &self.camera, viewport, pointer, node_size) {
            if node.kind == NodeKind::Document
                && let Err(error) = opener.open_document(&node.id)
            {
                tracing::warn!(id = %node.id, "failed to open document: {error:#}");
            }
            Some(Selection::Node(node.id.clone()))
        } else {
            link_at(snapshot, &self.camera, viewport, pointer).map(|link| Selection::Link(link.id.clone()))
        };
        self.selection.as_ref()
    }

    /// Unpins the node under the pointer. Returns its id when something was released.
    pub fn secondary_click(
        &mut self,
        simulation: &mut ForceSimulation,
        viewport: Rect,
        pointer: Pos2,
        node_size: f32,
    ) -> Option<String> {
        let id = node_at(simulation.snapshot(), &self.camera, viewport, pointer, node_size)?
            .id
            .clone();
        simulation.release_pin(&id).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;
    use crate::graph::{GraphSnapshot, Link, Node};
    use crate::settings::Settings;

    #[derive(Default)]
    struct RecordingOpener {
        opened: Vec<String>,
    }

    impl DocumentOpener for RecordingOpener {
        fn open_document(&mut self, id: &str) -> Result<()> {
            self.opened.push(id.to_owned());
            Ok(())
        }
    }

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(800.0, 600.0))
    }

    fn simulation() -> ForceSimulation {
        let mut simulation = ForceSimulation::new(&Settings::default(), 800.0, 600.0);
        simulation
            .initialize(GraphSnapshot::new(
                [
                    Node::document("a.md", "a", None),
                    Node::document("b.md", "b", None),
                    Node::tag("#x", 1),
                ],
                [
                    Link::explicit_reference("a.md", "b.md", 1.0),
                    Link::tag_membership("a.md", "#x"),
                ],
                1,
            ))
            .unwrap();
        simulation
    }

    fn screen_of(interaction: &Interaction, simulation: &ForceSimulation, id: &str) -> Pos2 {
        let node = simulation.snapshot().node(id).unwrap();
        interaction.camera.world_to_screen(viewport(), node.position)
    }

    #[test]
    fn drag_keeps_grab_offset_and_pins_on_release() {
        let mut simulation = simulation();
        let mut interaction = Interaction::default();
        let grab = screen_of(&interaction, &simulation, "b.md") + vec2(2.0, 0.0);

        assert!(interaction.pointer_down(&mut simulation, viewport(), grab, 6.0));
        assert!(simulation.is_dragging());

        interaction.pointer_move(&mut simulation, viewport(), pos2(102.0, 100.0));
        simulation.tick(1.0 / 60.0);
        assert_eq!(interaction.pointer_up(&mut simulation, true).as_deref(), Some("b.md"));
        assert_eq!(interaction.drag_state(), &DragState::Idle);

        simulation.tick(1.0 / 60.0);
        let node = simulation.snapshot().node("b.md").unwrap();
        assert!((node.position - vec2(100.0, 100.0)).length() < 1e-3);
        assert_eq!(node.pinned, Some(vec2(100.0, 100.0)));
    }

    #[test]
    fn pointer_down_on_empty_space_does_nothing() {
        let mut simulation = simulation();
        let mut interaction = Interaction::default();
        assert!(!interaction.pointer_down(&mut simulation, viewport(), pos2(-500.0, -500.0), 6.0));
        assert_eq!(interaction.pointer_up(&mut simulation, true), None);
    }

    #[test]
    fn clicking_a_document_selects_and_opens_it() {
        let simulation = simulation();
        let mut interaction = Interaction::default();
        let mut opener = RecordingOpener::default();

        let pointer = screen_of(&interaction, &simulation, "a.md");
        let selection = interaction.click(&simulation, viewport(), pointer, 6.0, &mut opener);
        assert_eq!(selection, Some(&Selection::Node("a.md".to_owned())));
        assert_eq!(opener.opened, vec!["a.md"]);

        let pointer = screen_of(&interaction, &simulation, "#x");
        interaction.click(&simulation, viewport(), pointer, 6.0, &mut opener);
        assert_eq!(interaction.selection(), Some(&Selection::Node("#x".to_owned())));
        assert_eq!(opener.opened.len(), 1);
    }

    #[test]
    fn clicking_a_link_midpoint_selects_the_link() {
        let simulation = simulation();
        let mut interaction = Interaction::default();
        let mut opener = RecordingOpener::default();

        let a = screen_of(&interaction, &simulation, "a.md");
        let b = screen_of(&interaction, &simulation, "b.md");
        let midpoint = a + (b - a) * 0.5;
        interaction.click(&simulation, viewport(), midpoint, 6.0, &mut opener);

        assert_eq!(
            interaction.selection(),
            Some(&Selection::Link("ref:a.md->b.md".to_owned()))
        );
        assert!(opener.opened.is_empty());
    }

    #[test]
    fn secondary_click_unpins() {
        let mut simulation = simulation();
        let mut interaction = Interaction::default();
        let pointer = screen_of(&interaction, &simulation, "a.md");

        interaction.pointer_down(&mut simulation, viewport(), pointer, 6.0);
        interaction.pointer_up(&mut simulation, true);
        assert!(simulation.snapshot().node("a.md").unwrap().pinned.is_some());

        assert_eq!(
            interaction.secondary_click(&mut simulation, viewport(), pointer, 6.0).as_deref(),
            Some("a.md")
        );
        assert!(simulation.snapshot().node("a.md").unwrap().pinned.is_none());
    }
}
