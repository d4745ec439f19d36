//! Project configuration (`backlog.yaml`).
//!
//! ```yaml
//! epics: planning/epics.md
//! stories_dir: implementation
//! sprint_status: implementation/sprint-status.yaml
//! state: .backlog/sync-state.yaml
//! project_name: Contoso
//! iteration_root_path: Sprints
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "backlog.yaml";

/// Default location of the sync-state snapshot.
pub const DEFAULT_STATE_FILE: &str = ".backlog/sync-state.yaml";

/// Where the planning artifacts live and how write-back names iterations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Epic document. Missing at parse time is fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epics: Option<PathBuf>,
    /// Directory holding per-story documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories_dir: Option<PathBuf>,
    /// Document with the `development_status:` block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_status: Option<PathBuf>,
    #[serde(default = "default_state_path")]
    pub state: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_root_path: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            epics: None,
            stories_dir: None,
            sprint_status: None,
            state: default_state_path(),
            project_name: None,
            iteration_root_path: None,
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_FILE)
}

impl ProjectConfig {
    /// Rewrite every relative path so it is relative to `base` instead.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let join = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.epics = self.epics.map(join);
        self.stories_dir = self.stories_dir.map(join);
        self.sprint_status = self.sprint_status.map(join);
        self.state = join(self.state);
        self
    }
}

/// Load the project config at `path`, resolving relative paths against its
/// parent directory.
///
/// Returns `StoreError::ConfigNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<ProjectConfig, StoreError> {
    if !path.exists() {
        return Err(StoreError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: ProjectConfig =
        serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_relative_to(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_at(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, StoreError::ConfigNotFound { .. }));
        assert!(err.to_string().contains("backlog.yaml"));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "epics: planning/epics.md\nstories_dir: /abs/stories\nproject_name: Contoso\n",
        )
        .expect("write");

        let config = load_at(&path).expect("load");
        assert_eq!(config.epics, Some(dir.path().join("planning/epics.md")));
        assert_eq!(config.stories_dir, Some(PathBuf::from("/abs/stories")));
        assert_eq!(config.state, dir.path().join(DEFAULT_STATE_FILE));
        assert_eq!(config.project_name.as_deref(), Some("Contoso"));
        assert!(config.sprint_status.is_none());
    }

    #[test]
    fn unknown_shape_is_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "- just\n- a list\n").expect("write");
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    }
}
