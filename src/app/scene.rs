use eframe::egui::{self, Align2, Color32, FontId, PointerButton, Rect, Sense, Stroke, Ui, vec2};

use crate::graph::GraphSnapshot;
use crate::interaction::{Camera, DragState, Selection, node_at};
use crate::physics::FrameScheduler;
use crate::settings::Settings;

use super::ViewModel;
use super::render_utils::{
    PINNED_RING, SELECTED_RING, blend_color, circle_visible, dim_color, draw_background, edge_visible,
    link_color, node_color,
};

struct EguiScheduler(egui::Context);

impl FrameScheduler for EguiScheduler {
    fn request_frame(&mut self) {
        self.0.request_repaint();
    }
}

struct SceneStyle<'a> {
    settings: &'a Settings,
    selection: Option<&'a Selection>,
    hovered: Option<&'a str>,
}

fn paint_snapshot(
    painter: &egui::Painter,
    rect: Rect,
    camera: &Camera,
    snapshot: &GraphSnapshot,
    style: &SceneStyle<'_>,
) {
    let zoom = camera.zoom();
    let focused_node = match style.selection {
        Some(Selection::Node(id)) => Some(id.as_str()),
        _ => None,
    };

    for link in snapshot.links() {
        if !snapshot.link_visible(link) {
            continue;
        }
        let (Some(source), Some(target)) = (snapshot.node(&link.source), snapshot.node(&link.target))
        else {
            continue;
        };

        let start = camera.world_to_screen(rect, source.position);
        let end = camera.world_to_screen(rect, target.position);
        if !edge_visible(rect, start, end, 2.0) {
            continue;
        }

        let selected = matches!(style.selection, Some(Selection::Link(id)) if *id == link.id);
        let width = (link.effective_thickness(style.settings) * zoom.sqrt()).clamp(0.5, 12.0);
        let mut color = link_color(link.kind, link.similarity);
        if focused_node.is_some_and(|id| link.source != id && link.target != id) {
            color = dim_color(color, 0.45);
        }

        let stroke = if selected {
            Stroke::new(width + 1.5, SELECTED_RING)
        } else {
            Stroke::new(width, color)
        };
        painter.line_segment([start, end], stroke);
    }

    let show_labels = zoom >= 0.8;
    for node in snapshot.nodes().filter(|node| node.visible) {
        let center = camera.world_to_screen(rect, node.position);
        let radius = node.radius(style.settings.node_size) * zoom;
        if !circle_visible(rect, center, radius + 60.0) {
            continue;
        }

        let is_selected = focused_node == Some(node.id.as_str());
        let is_hovered = style.hovered == Some(node.id.as_str());
        let fill = if is_hovered {
            blend_color(node_color(node), Color32::WHITE, 0.3)
        } else {
            node_color(node)
        };

        painter.circle_filled(center, radius, fill);
        if node.pinned.is_some() {
            painter.circle_stroke(center, radius + 2.0, Stroke::new(1.5, PINNED_RING));
        }
        if is_selected {
            painter.circle_stroke(center, radius + 4.5, Stroke::new(2.0, SELECTED_RING));
        }

        if show_labels || is_hovered || is_selected {
            painter.text(
                center + vec2(0.0, radius + 4.0),
                Align2::CENTER_TOP,
                node.display_name.as_str(),
                FontId::proportional(12.0),
                Color32::from_gray(220),
            );
        }
    }
}

impl ViewModel {
    fn handle_pointer(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        let node_size = self.settings.node_size;

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                let pointer = response.hover_pos().unwrap_or_else(|| rect.center());
                let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
                self.interaction.camera.zoom_at(rect, pointer, factor);
            }
        }

        if response.drag_started_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.interaction
                .pointer_down(&mut self.simulation, rect, pointer, node_size);
        }

        let dragging_node = matches!(self.interaction.drag_state(), DragState::Dragging { .. });
        if response.dragged_by(PointerButton::Primary) {
            if dragging_node {
                if let Some(pointer) = response.interact_pointer_pos() {
                    self.interaction.pointer_move(&mut self.simulation, rect, pointer);
                }
            } else {
                self.interaction.camera.pan_by(response.drag_delta());
            }
        }
        if response.dragged_by(PointerButton::Middle) {
            self.interaction.camera.pan_by(response.drag_delta());
        }

        if response.drag_stopped() && dragging_node {
            self.interaction
                .pointer_up(&mut self.simulation, self.settings.pin_on_release);
        }

        if response.clicked_by(PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.interaction.click(
                &self.simulation,
                rect,
                pointer,
                node_size,
                &mut self.opener,
            );
        }

        if response.clicked_by(PointerButton::Secondary)
            && let Some(pointer) = response.interact_pointer_pos()
            && let Some(id) =
                self.interaction
                    .secondary_click(&mut self.simulation, rect, pointer, node_size)
        {
            tracing::debug!(%id, "node unpinned");
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        if let Err(error) = self.simulation.resize(rect.width(), rect.height()) {
            tracing::trace!(%error, "resize ignored");
        }
        if self.graph_dirty {
            self.rebuild_graph();
        }
        self.refresh_visibility();

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.interaction.camera);

        self.handle_pointer(ui, rect, &response);

        let hovered = response
            .hover_pos()
            .and_then(|pointer| {
                node_at(
                    self.simulation.snapshot(),
                    &self.interaction.camera,
                    rect,
                    pointer,
                    self.settings.node_size,
                )
            })
            .map(|node| node.id.clone());
        if hovered.is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        if self.simulation.snapshot().is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No Markdown documents found in this vault.",
                FontId::proportional(16.0),
                Color32::from_gray(180),
            );
        }

        let delta_seconds = ui
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let camera = self.interaction.camera;
        let style = SceneStyle {
            settings: &self.settings,
            selection: self.interaction.selection(),
            hovered: hovered.as_deref(),
        };
        let mut scheduler = EguiScheduler(ui.ctx().clone());
        self.animation.run_frame(
            &mut self.simulation,
            delta_seconds,
            &mut scheduler,
            |snapshot| paint_snapshot(&painter, rect, &camera, snapshot, &style),
        );
    }
}
