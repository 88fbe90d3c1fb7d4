mod app;
mod embed;
mod graph;
mod interaction;
mod physics;
mod settings;
mod util;
mod vault;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use tracing::Level;

use crate::settings::Settings;

const STATE_DIR: &str = ".vault-graph";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Root directory of the Markdown vault.
    #[arg(long, default_value = ".")]
    vault: PathBuf,

    /// Settings file. Defaults to `.vault-graph/settings.json` inside the vault.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Embedding cache file. Defaults to `.vault-graph/embeddings.json` inside the vault.
    #[arg(long)]
    embeddings: Option<PathBuf>,

    /// More log output; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .init();

    let state_dir = args.vault.join(STATE_DIR);
    let config = app::AppConfig {
        settings_path: args
            .settings
            .unwrap_or_else(|| state_dir.join("settings.json")),
        embeddings_path: args
            .embeddings
            .unwrap_or_else(|| state_dir.join("embeddings.json")),
        vault_root: args.vault,
    };
    let settings = Settings::load(&config.settings_path).context("failed to load settings")?;
    tracing::info!(vault = %config.vault_root.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "vault-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::VaultGraphApp::new(cc, config, settings)))),
    )
    .map_err(|error| anyhow!("failed to start the window: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0), Level::WARN);
        assert_eq!(log_level(2), Level::DEBUG);
        assert_eq!(log_level(9), Level::TRACE);
    }

    #[test]
    fn args_default_to_current_directory() {
        let args = Args::parse_from(["vault-graph", "-vv"]);
        assert_eq!(args.vault, PathBuf::from("."));
        assert_eq!(args.verbose, 2);
        assert!(args.settings.is_none());
    }
}
