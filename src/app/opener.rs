use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::interaction::DocumentOpener;

/// Opens documents with the desktop's default handler for Markdown files.
pub(in crate::app) struct SystemOpener {
    root: PathBuf,
}

impl SystemOpener {
    pub(in crate::app) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn command(path: &std::path::Path) -> Command {
        #[cfg(target_os = "macos")]
        let command = {
            let mut command = Command::new("open");
            command.arg(path);
            command
        };

        #[cfg(target_os = "windows")]
        let command = {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let command = {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        };

        command
    }
}

impl DocumentOpener for SystemOpener {
    fn open_document(&mut self, id: &str) -> Result<()> {
        if id.split('/').any(|part| part == "..") {
            bail!("refusing to open {id}: path leaves the vault");
        }

        let path = self.root.join(id);
        Self::command(&path)
            .spawn()
            .with_context(|| format!("failed to launch a viewer for {}", path.display()))?;
        tracing::debug!(path = %path.display(), "opened document");
        Ok(())
    }
}
