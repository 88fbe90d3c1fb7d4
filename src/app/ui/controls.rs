use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, Ui};

use super::super::ViewModel;
use super::super::filter::FilterMode;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn slider_key_step(range: &RangeInclusive<f32>) -> f32 {
    ((range.end() - range.start()) / 200.0).max(0.0005)
}

/// Holding an arrow key on a focused slider moves it faster the longer it is held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    range: RangeInclusive<f32>,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let delta = direction as f32 * slider_key_step(&range) * speed * delta_time;

    let old_value = *value;
    *value = (*value + delta).clamp(*range.start(), *range.end());
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

/// Returns true once the drag or keyboard edit is finished and the value should be committed.
fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.clone())
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }

    let keyed = apply_slider_arrow_acceleration(ui, &response, value, range);
    keyed || edit_finished(&response)
}

/// A drag has been released, or the value changed without a drag (keyboard, click).
pub(super) fn edit_finished(response: &Response) -> bool {
    response.drag_stopped() || (response.changed() && !response.dragged())
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("controls_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_filter_controls(ui);
                ui.separator();
                self.draw_link_controls(ui);
                ui.separator();
                self.draw_layout_controls(ui);
                ui.separator();
                self.draw_embedding_controls(ui);
            });
    }

    fn draw_filter_controls(&mut self, ui: &mut Ui) {
        ui.label("Search documents and tags")
            .on_hover_text("Fuzzy-match display names. Links to hidden nodes are hidden too.");
        ui.text_edit_singleline(&mut self.filter.query);

        ui.horizontal_wrapped(|ui| {
            for mode in FilterMode::ALL {
                ui.selectable_value(&mut self.filter.mode, mode, mode.label());
            }
        });

        if self.filter.is_active() {
            ui.small(format!(
                "{} of {} nodes match",
                self.visible_node_count,
                self.simulation.snapshot().node_count()
            ));
        }
    }

    fn draw_link_controls(&mut self, ui: &mut Ui) {
        let mut commit = false;

        commit |= ui
            .checkbox(
                &mut self.settings.use_embedding_linking,
                "Link by semantic similarity",
            )
            .on_hover_text("Connect documents whose embeddings are similar instead of following references.")
            .changed();
        commit |= ui
            .checkbox(&mut self.settings.show_tags, "Show tag nodes")
            .on_hover_text("Add one node per tag, linked to every document carrying it.")
            .changed();

        ui.add_enabled_ui(self.settings.use_embedding_linking, |ui| {
            commit |= tuning_slider(
                ui,
                &mut self.settings.similarity_threshold,
                0.0..=1.0,
                "Similarity threshold",
                "Only pairs at or above this cosine similarity are linked.",
            );
            commit |= tuning_slider(
                ui,
                &mut self.settings.min_link_thickness,
                0.1..=10.0,
                "Min link thickness",
                "Thickness of a link right at the threshold.",
            );
            commit |= tuning_slider(
                ui,
                &mut self.settings.max_link_thickness,
                0.1..=10.0,
                "Max link thickness",
                "Thickness of a link between identical embeddings.",
            );
        });

        commit |= tuning_slider(
            ui,
            &mut self.settings.default_link_thickness,
            0.1..=10.0,
            "Default link thickness",
            "Thickness of reference links without an override.",
        );

        if !self.settings.link_thickness_overrides.is_empty()
            && ui
                .button(format!(
                    "Clear {} thickness overrides",
                    self.settings.link_thickness_overrides.len()
                ))
                .clicked()
        {
            self.settings.link_thickness_overrides.clear();
            commit = true;
        }

        if commit {
            self.commit_settings();
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui) {
        let mut commit = false;

        commit |= tuning_slider(
            ui,
            &mut self.settings.node_size,
            1.0..=30.0,
            "Node size",
            "Base radius of document nodes.",
        );
        commit |= tuning_slider(
            ui,
            &mut self.settings.link_distance,
            10.0..=400.0,
            "Link distance",
            "Rest length of every link spring.",
        );
        commit |= tuning_slider(
            ui,
            &mut self.settings.repulsion_force,
            0.0..=2000.0,
            "Repulsion",
            "How strongly nodes push away from each other.",
        );
        commit |= tuning_slider(
            ui,
            &mut self.settings.center_force,
            0.0..=1.0,
            "Center force",
            "Pull toward the middle of the canvas.",
        );

        let mut limit_range = self.settings.repulsion_cutoff.is_some();
        if ui
            .checkbox(&mut limit_range, "Limit repulsion range")
            .on_hover_text("Ignore repulsion between nodes farther apart than the cutoff.")
            .changed()
        {
            self.settings.repulsion_cutoff = limit_range.then_some(800.0);
            commit = true;
        }
        if let Some(cutoff) = self.settings.repulsion_cutoff.as_mut() {
            commit |= tuning_slider(
                ui,
                cutoff,
                50.0..=4000.0,
                "Repulsion cutoff",
                "Distance beyond which nodes stop repelling.",
            );
        }

        commit |= ui
            .checkbox(&mut self.settings.pin_on_release, "Pin nodes after dragging")
            .on_hover_text("Dropped nodes stay put until right-clicked.")
            .changed();

        ui.horizontal(|ui| {
            if ui.button("Reset camera").clicked() {
                self.interaction.camera.reset();
            }
            ui.label(format!("zoom {:.2}x", self.interaction.camera.zoom()));
        });

        if commit {
            self.commit_settings();
        }
    }

    fn draw_embedding_controls(&mut self, ui: &mut Ui) {
        let cached = self.model.cache().cached_count();
        ui.label(format!(
            "Embeddings cached: {cached} of {} documents",
            self.documents.len()
        ));

        let running = self.generation.is_some();
        if ui
            .add_enabled(!running, egui::Button::new("Generate missing embeddings"))
            .on_hover_text("Request an embedding for every document without one.")
            .clicked()
        {
            self.start_generation();
        }

        ui.collapsing("Embedding service", |ui| {
            let embedding = &mut self.settings.embedding;
            let mut commit = false;

            ui.label("API base URL");
            commit |= ui.text_edit_singleline(&mut embedding.api_base_url).lost_focus();
            ui.label("Model");
            commit |= ui.text_edit_singleline(&mut embedding.model).lost_focus();
            ui.label("API key environment variable")
                .on_hover_text("The key itself is never written to the settings file.");
            commit |= ui.text_edit_singleline(&mut embedding.api_key_env).lost_focus();

            ui.label("Remote store URL (optional)")
                .on_hover_text("Leave blank to keep vectors in the local cache only.");
            commit |= ui.text_edit_singleline(&mut embedding.store_url).lost_focus();

            let delay = ui.add(
                egui::Slider::new(&mut embedding.request_delay_ms, 0..=5000)
                    .text("Delay between requests (ms)"),
            );
            commit |= edit_finished(&delay);

            if commit {
                self.commit_settings();
            }
        });
    }
}
