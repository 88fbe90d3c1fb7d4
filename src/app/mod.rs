use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use eframe::egui::{self, Context};

use crate::embed::{
    EmbeddingCache, GenerationEvent, GenerationRequest, HttpEmbeddingService, JsonEmbeddingStore,
    spawn_generation,
};
use crate::graph::GraphModel;
use crate::interaction::{Interaction, Selection};
use crate::physics::{AnimationLoop, ForceSimulation, SimulationState};
use crate::settings::Settings;
use crate::vault::{Document, DocumentSource, MarkdownVault};

mod filter;
mod opener;
mod render_utils;
mod scene;
mod ui;

use filter::VisibilityFilter;
use opener::SystemOpener;
use ui::{NoticeLevel, Notices};

/// Where the vault, its settings and its embedding cache live on disk.
pub struct AppConfig {
    pub vault_root: PathBuf,
    pub settings_path: PathBuf,
    pub embeddings_path: PathBuf,
}

pub struct VaultGraphApp {
    config: Arc<AppConfig>,
    settings: Settings,
    state: AppState,
    reload_rx: Option<Receiver<Result<Vec<Document>, String>>>,
}

struct LoadedVault {
    documents: Vec<Document>,
    store: JsonEmbeddingStore,
}

enum AppState {
    Loading {
        rx: Receiver<Result<LoadedVault, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct GenerationRun {
    rx: Receiver<GenerationEvent>,
    total: usize,
    embedded: usize,
    failed: usize,
}

struct ViewModel {
    config: Arc<AppConfig>,
    vault: MarkdownVault,
    settings: Settings,
    committed_settings: Settings,
    documents: Vec<Document>,
    model: GraphModel<JsonEmbeddingStore>,
    simulation: ForceSimulation,
    animation: AnimationLoop,
    interaction: Interaction,
    filter: VisibilityFilter,
    applied_filter: Option<(VisibilityFilter, u64)>,
    visible_node_count: usize,
    animate: bool,
    graph_dirty: bool,
    generation: Option<GenerationRun>,
    notices: Notices,
    opener: SystemOpener,
}

fn load_vault(config: &AppConfig) -> Result<LoadedVault> {
    let documents = MarkdownVault::new(&config.vault_root).list_documents()?;
    let store = JsonEmbeddingStore::open(&config.embeddings_path).with_context(|| {
        format!(
            "failed to open embedding cache {}",
            config.embeddings_path.display()
        )
    })?;
    tracing::info!(
        documents = documents.len(),
        cached_embeddings = store.cached_count(),
        "vault loaded"
    );
    Ok(LoadedVault { documents, store })
}

impl VaultGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig, settings: Settings) -> Self {
        let config = Arc::new(config);
        let state = Self::start_load(Arc::clone(&config));
        Self {
            config,
            settings,
            state,
            reload_rx: None,
        }
    }

    fn start_load(config: Arc<AppConfig>) -> AppState {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_vault(&config).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }

    fn spawn_rescan(config: Arc<AppConfig>) -> Receiver<Result<Vec<Document>, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = MarkdownVault::new(&config.vault_root)
                .list_documents()
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }
}

impl eframe::App for VaultGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => {
                        transition = Some(AppState::Ready(Box::new(ViewModel::new(
                            Arc::clone(&self.config),
                            self.settings.clone(),
                            loaded,
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error("Vault loader stopped unexpectedly".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Scanning vault...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint_after(Duration::from_millis(50));
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the vault");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(Arc::clone(&self.config)));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                model.show(ctx, &mut reload_requested, self.reload_rx.is_some());
                self.settings.clone_from(&model.settings);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_rescan(Arc::clone(&self.config)));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(documents)) => model.replace_documents(documents),
                        Ok(Err(error)) => {
                            model.notices.push(NoticeLevel::Error, format!("Rescan failed: {error}"));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint_after(Duration::from_millis(50));
                        }
                        Err(TryRecvError::Disconnected) => {
                            model
                                .notices
                                .push(NoticeLevel::Error, "Vault rescan worker disconnected");
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(config: Arc<AppConfig>, settings: Settings, loaded: LoadedVault) -> Self {
        let simulation = ForceSimulation::new(&settings, 1280.0, 800.0);
        Self {
            vault: MarkdownVault::new(&config.vault_root),
            opener: SystemOpener::new(config.vault_root.clone()),
            config,
            committed_settings: settings.clone(),
            settings,
            documents: loaded.documents,
            model: GraphModel::new(loaded.store),
            simulation,
            animation: AnimationLoop::default(),
            interaction: Interaction::default(),
            filter: VisibilityFilter::default(),
            applied_filter: None,
            visible_node_count: 0,
            animate: true,
            graph_dirty: true,
            generation: None,
            notices: Notices::default(),
        }
    }

    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_reloading: bool) {
        self.poll_generation();
        if self.generation.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui, reload_requested, is_reloading));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));

        self.notices.show(ctx);
    }

    fn rebuild_graph(&mut self) {
        self.graph_dirty = false;
        let snapshot = self.model.rebuild(&self.documents, &self.settings);

        let result = if self.simulation.state() == SimulationState::Uninitialized {
            self.simulation.initialize(snapshot)
        } else {
            self.simulation.update_data(snapshot)
        };
        if let Err(error) = result {
            tracing::warn!(%error, "graph was not loaded into the simulation");
            return;
        }

        self.applied_filter = None;
        let still_present = match self.interaction.selection() {
            Some(Selection::Node(id)) => self.simulation.snapshot().node(id).is_some(),
            Some(Selection::Link(id)) => self.simulation.snapshot().link(id).is_some(),
            None => true,
        };
        if !still_present {
            self.interaction.clear_selection();
        }
    }

    fn replace_documents(&mut self, documents: Vec<Document>) {
        tracing::info!(documents = documents.len(), "vault rescanned");
        self.documents = documents;
        self.graph_dirty = true;
    }

    fn refresh_visibility(&mut self) {
        let revision = self.simulation.snapshot().revision();
        if self
            .applied_filter
            .as_ref()
            .is_some_and(|(filter, applied)| *applied == revision && *filter == self.filter)
        {
            return;
        }

        self.visible_node_count = self.filter.apply(self.simulation.snapshot_mut());
        self.applied_filter = Some((self.filter.clone(), revision));
    }

    /// Applies pending settings edits: rebuilds, re-energizes and persists as needed.
    fn commit_settings(&mut self) {
        self.settings = self.settings.clone().sanitized();
        if self.settings == self.committed_settings {
            return;
        }
        let previous = std::mem::replace(&mut self.committed_settings, self.settings.clone());

        if self.settings.link_derivation_differs(&previous) {
            self.graph_dirty = true;
        }
        if self.settings.forces_differ(&previous)
            && let Err(error) = self.simulation.update_forces(&self.settings)
        {
            tracing::warn!(%error, "force update ignored");
        }

        if let Err(error) = self.settings.save(&self.config.settings_path) {
            tracing::warn!("failed to save settings: {error:#}");
            self.notices
                .push(NoticeLevel::Error, format!("Settings not saved: {error:#}"));
        }
    }

    fn start_generation(&mut self) {
        if self.generation.is_some() {
            return;
        }

        let service = match HttpEmbeddingService::from_settings(&self.settings.embedding) {
            Ok(service) => service,
            Err(error) => {
                self.notices
                    .push(NoticeLevel::Error, format!("Embedding service unavailable: {error}"));
                return;
            }
        };

        let mut requests = Vec::new();
        for document in &self.documents {
            if self.model.cache().get_cached_embedding(&document.id).is_some() {
                continue;
            }
            match self.vault.document_text(&document.id) {
                Ok(text) => requests.push(GenerationRequest {
                    document_id: document.id.clone(),
                    text,
                }),
                Err(error) => self.notices.push(
                    NoticeLevel::Error,
                    format!("{}: {error:#}", document.display_name),
                ),
            }
        }

        if requests.is_empty() {
            self.notices
                .push(NoticeLevel::Info, "Every document already has an embedding");
            return;
        }

        let total = requests.len();
        let delay = Duration::from_millis(self.settings.embedding.request_delay_ms);
        self.generation = Some(GenerationRun {
            rx: spawn_generation(Arc::new(service), requests, delay),
            total,
            embedded: 0,
            failed: 0,
        });
        self.notices.push(
            NoticeLevel::Info,
            format!("Generating embeddings for {total} documents"),
        );
    }

    fn poll_generation(&mut self) {
        let Some(run) = self.generation.as_mut() else {
            return;
        };

        let mut finished = false;
        let mut embedded = Vec::new();
        loop {
            match run.rx.try_recv() {
                Ok(GenerationEvent::Embedded {
                    document_id,
                    vector,
                }) => {
                    run.embedded += 1;
                    embedded.push((document_id, vector));
                }
                Ok(GenerationEvent::Failed { document_id, error }) => {
                    run.failed += 1;
                    self.notices
                        .push(NoticeLevel::Error, format!("{document_id}: {error}"));
                }
                Ok(GenerationEvent::Finished { succeeded, failed }) => {
                    self.notices.push(
                        NoticeLevel::Info,
                        format!("Embeddings done: {succeeded} succeeded, {failed} failed"),
                    );
                    finished = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.notices
                        .push(NoticeLevel::Error, "Embedding worker stopped unexpectedly");
                    finished = true;
                    break;
                }
            }
        }

        let received = embedded.len();
        if let Err(error) = self.model.cache_mut().put_cached_embeddings(embedded) {
            tracing::warn!(received, %error, "failed to cache embeddings");
            self.notices
                .push(NoticeLevel::Error, format!("Embedding cache write failed: {error}"));
        }

        if finished {
            self.generation = None;
            self.graph_dirty = true;
        }
    }
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        self.generation = None;
        self.simulation.destroy();
        tracing::debug!(frames = self.animation.frames(), "graph view closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::Sender;

    use super::*;

    fn view_model(dir: &std::path::Path) -> ViewModel {
        let config = AppConfig {
            vault_root: dir.to_path_buf(),
            settings_path: dir.join("settings.json"),
            embeddings_path: dir.join("embeddings.json"),
        };
        let store = JsonEmbeddingStore::open(&config.embeddings_path).unwrap();
        let loaded = LoadedVault {
            documents: vec![Document::new("a.md"), Document::new("b.md")],
            store,
        };
        let mut model = ViewModel::new(Arc::new(config), Settings::default(), loaded);
        model.graph_dirty = false;
        model
    }

    fn attach_run(model: &mut ViewModel, total: usize) -> Sender<GenerationEvent> {
        let (tx, rx) = mpsc::channel();
        model.generation = Some(GenerationRun {
            rx,
            total,
            embedded: 0,
            failed: 0,
        });
        tx
    }

    #[test]
    fn partial_events_update_counts_without_rebuilding() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = view_model(dir.path());
        let tx = attach_run(&mut model, 2);

        tx.send(GenerationEvent::Embedded {
            document_id: "a.md".to_owned(),
            vector: vec![1.0, 0.0],
        })
        .unwrap();
        tx.send(GenerationEvent::Failed {
            document_id: "b.md".to_owned(),
            error: "service returned 500".to_owned(),
        })
        .unwrap();
        model.poll_generation();

        let run = model.generation.as_ref().unwrap();
        assert_eq!((run.embedded, run.failed), (1, 1));
        assert!(!model.graph_dirty);
        assert_eq!(
            model.model.cache().get_cached_embedding("a.md"),
            Some(vec![1.0, 0.0])
        );
        assert!(
            model
                .notices
                .messages()
                .any(|(level, message)| level == NoticeLevel::Error && message.contains("b.md"))
        );
    }

    #[test]
    fn finished_event_ends_the_run_and_rebuilds_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = view_model(dir.path());
        let tx = attach_run(&mut model, 2);

        tx.send(GenerationEvent::Embedded {
            document_id: "a.md".to_owned(),
            vector: vec![1.0, 0.0],
        })
        .unwrap();
        tx.send(GenerationEvent::Embedded {
            document_id: "b.md".to_owned(),
            vector: vec![0.0, 1.0],
        })
        .unwrap();
        tx.send(GenerationEvent::Finished {
            succeeded: 2,
            failed: 0,
        })
        .unwrap();
        model.poll_generation();

        assert!(model.generation.is_none());
        assert!(model.graph_dirty);
        assert!(
            model
                .notices
                .messages()
                .any(|(_, message)| message.contains("2 succeeded, 0 failed"))
        );

        let reopened = JsonEmbeddingStore::open(dir.path().join("embeddings.json")).unwrap();
        assert_eq!(reopened.cached_count(), 2);

        model.graph_dirty = false;
        model.poll_generation();
        assert!(!model.graph_dirty);
    }

    #[test]
    fn vanished_worker_ends_the_run_with_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = view_model(dir.path());
        let tx = attach_run(&mut model, 1);
        drop(tx);

        model.poll_generation();

        assert!(model.generation.is_none());
        assert!(model.graph_dirty);
        assert!(
            model
                .notices
                .messages()
                .any(|(level, message)| level == NoticeLevel::Error && message.contains("stopped"))
        );
    }
}
