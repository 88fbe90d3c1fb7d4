use eframe::egui::{self, RichText, Ui};

use crate::graph::{Link, Node, NodeKind};
use crate::interaction::{DocumentOpener, Selection};

use super::super::ViewModel;
use super::NoticeLevel;
use super::controls::edit_finished;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        match self.interaction.selection().cloned() {
            None => {
                ui.label("Click a node or link in the graph.");
                ui.small("Drag nodes to move them. Right-click a pinned node to release it.");
            }
            Some(Selection::Node(id)) => {
                let Some(node) = self.simulation.snapshot().node(&id).cloned() else {
                    ui.label("Selected node no longer exists in the graph.");
                    return;
                };
                self.draw_node_details(ui, &node);
            }
            Some(Selection::Link(id)) => {
                let Some(link) = self.simulation.snapshot().link(&id).cloned() else {
                    ui.label("Selected link no longer exists in the graph.");
                    return;
                };
                self.draw_link_details(ui, &link);
            }
        }
    }

    fn draw_node_details(&mut self, ui: &mut Ui, node: &Node) {
        ui.label(RichText::new(node.display_name.as_str()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        let degree = self.simulation.snapshot().degree(&node.id);
        match node.kind {
            NodeKind::Document => {
                ui.label("Kind: document");
                ui.label(format!("Links: {degree}"));
                match &node.embedding {
                    Some(vector) => ui.label(format!("Embedding: {} dimensions", vector.len())),
                    None => ui.label("Embedding: not generated"),
                };
            }
            NodeKind::Tag => {
                ui.label("Kind: tag");
                ui.label(format!("Tagged documents: {}", node.tag_connection_count));
            }
        }

        ui.separator();
        match node.pinned {
            Some(pin) => {
                ui.horizontal(|ui| {
                    ui.label(format!("Pinned at ({:.0}, {:.0})", pin.x, pin.y));
                    if ui.button("Unpin").clicked() && self.simulation.release_pin(&node.id) {
                        tracing::debug!(id = %node.id, "node unpinned");
                    }
                });
            }
            None => {
                ui.label(format!(
                    "Position ({:.0}, {:.0})",
                    node.position.x, node.position.y
                ));
            }
        }

        if node.kind == NodeKind::Document && ui.button("Open document").clicked() {
            if let Err(error) = self.opener.open_document(&node.id) {
                tracing::warn!(id = %node.id, "failed to open document: {error:#}");
                self.notices
                    .push(NoticeLevel::Error, format!("Could not open {}: {error:#}", node.id));
            }
        }

        let neighbors = self.neighbor_names(&node.id);
        if !neighbors.is_empty() {
            ui.separator();
            ui.label(RichText::new("Connected nodes").strong());
            egui::ScrollArea::vertical()
                .id_salt("neighbor_scroll")
                .max_height(260.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for (id, name) in neighbors {
                        if ui.link(name).on_hover_text(id.as_str()).clicked() {
                            self.interaction.select(Selection::Node(id));
                        }
                    }
                });
        }
    }

    fn neighbor_names(&self, id: &str) -> Vec<(String, String)> {
        let snapshot = self.simulation.snapshot();
        let mut neighbors = snapshot
            .links()
            .iter()
            .filter_map(|link| {
                if link.source == id {
                    Some(link.target.as_str())
                } else if link.target == id {
                    Some(link.source.as_str())
                } else {
                    None
                }
            })
            .filter_map(|other| snapshot.node(other))
            .map(|node| (node.id.clone(), node.display_name.clone()))
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        neighbors.dedup();
        neighbors
    }

    fn draw_link_details(&mut self, ui: &mut Ui, link: &Link) {
        let snapshot = self.simulation.snapshot();
        let name_of = |id: &str| {
            snapshot
                .node(id)
                .map(|node| node.display_name.clone())
                .unwrap_or_else(|| id.to_owned())
        };
        let source_name = name_of(&link.source);
        let target_name = name_of(&link.target);

        ui.label(RichText::new(link.kind.label()).strong());
        ui.small(link.id.as_str());
        ui.add_space(6.0);
        ui.label(format!("From: {source_name}"));
        ui.label(format!("To: {target_name}"));
        if let Some(similarity) = link.similarity {
            ui.label(format!("Similarity: {similarity:.3}"));
        }

        ui.separator();
        let mut thickness = link.effective_thickness(&self.settings);
        let has_override = self.settings.link_thickness_overrides.contains_key(&link.id);
        let response = ui
            .add(
                egui::Slider::new(&mut thickness, 0.1..=12.0)
                    .text("Thickness")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Overrides the derived thickness for this link only.");
        if response.changed() {
            self.settings
                .link_thickness_overrides
                .insert(link.id.clone(), thickness);
        }

        let mut commit = edit_finished(&response);
        if has_override && ui.button("Reset thickness").clicked() {
            self.settings.link_thickness_overrides.remove(&link.id);
            commit = true;
        }
        if commit {
            self.commit_settings();
        }
    }
}
