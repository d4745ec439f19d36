//! Config and artifact-location flags shared by every command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backlog_core::{config, ProjectConfig};
use clap::Args;
use tracing::debug;

/// `--config` and `--state`.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Project config file. Defaults to `backlog.yaml` in the current
    /// directory when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sync-state snapshot (overrides `state` from the config).
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the config named by `--config`, or the default file if present.
    pub fn load(&self) -> Result<ProjectConfig> {
        let mut project = match &self.config {
            Some(path) => config::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                let default = Path::new(config::DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    config::load_at(default).context("failed to load backlog.yaml")?
                } else {
                    debug!("no config file; using flags only");
                    ProjectConfig::default()
                }
            }
        };
        if let Some(state) = &self.state {
            project.state = state.clone();
        }
        Ok(project)
    }
}

/// Artifact locations; each flag overrides the config.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Epic document.
    #[arg(long, value_name = "FILE")]
    pub epics: Option<PathBuf>,

    /// Directory holding story documents.
    #[arg(long, value_name = "DIR")]
    pub stories_dir: Option<PathBuf>,

    /// Sprint-status document with the `development_status:` block.
    #[arg(long, value_name = "FILE")]
    pub sprint_status: Option<PathBuf>,
}

impl SourceArgs {
    pub fn resolve(&self) -> Result<ProjectConfig> {
        let mut project = self.config.load()?;
        if let Some(epics) = &self.epics {
            project.epics = Some(epics.clone());
        }
        if let Some(dir) = &self.stories_dir {
            project.stories_dir = Some(dir.clone());
        }
        if let Some(sprint) = &self.sprint_status {
            project.sprint_status = Some(sprint.clone());
        }
        Ok(project)
    }
}

/// Print `json` to stdout, or write it to `output` when given.
pub fn emit_json(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
