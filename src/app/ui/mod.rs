use eframe::egui::{self, Align, Layout, Ui};

use crate::physics::SimulationState;

use super::ViewModel;

mod controls;
mod details;
mod notices;

pub(super) use notices::{NoticeLevel, Notices};

impl ViewModel {
    pub(in crate::app) fn draw_top_bar(
        &mut self,
        ui: &mut Ui,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        ui.horizontal(|ui| {
            ui.heading("vault-graph");
            ui.separator();
            ui.label(format!("vault: {}", self.vault.root().display()));
            ui.label(format!("documents: {}", self.documents.len()));
            ui.label(format!("nodes: {}", self.simulation.snapshot().node_count()));
            ui.label(format!("links: {}", self.simulation.snapshot().link_count()));

            let rescan_button = ui.add_enabled(!is_reloading, egui::Button::new("Rescan vault"));
            if rescan_button.clicked() {
                *reload_requested = true;
            }
            if ui.button("Rebuild graph").clicked() {
                self.graph_dirty = true;
            }

            let toggle_label = if self.animate { "Pause" } else { "Resume" };
            if ui.button(toggle_label).clicked() {
                self.animate = !self.animate;
                if let Err(error) = self.simulation.toggle_animation(self.animate) {
                    tracing::warn!(%error, "animation toggle ignored");
                }
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(self.status_text());
                if let Some(run) = &self.generation {
                    ui.spinner();
                    ui.label(format!(
                        "embedding {}/{} ({} failed)",
                        run.embedded, run.total, run.failed
                    ));
                }
            });
        });
    }

    fn status_text(&self) -> String {
        let visible = format!(
            "visible {}/{}",
            self.visible_node_count,
            self.simulation.snapshot().node_count()
        );
        match self.simulation.state() {
            SimulationState::Running if self.simulation.is_settled() => {
                format!("{visible} | settled")
            }
            SimulationState::Running => {
                format!("{visible} | alpha {:.3}", self.simulation.alpha())
            }
            SimulationState::Paused => format!("{visible} | paused"),
            SimulationState::Uninitialized => format!("{visible} | waiting for layout"),
            SimulationState::Destroyed => visible,
        }
    }
}
