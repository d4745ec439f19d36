//! Previously persisted sync state.
//!
//! # Storage layout
//!
//! ```text
//! lastFullSync: "2026-01-01T00:00:00Z"
//! epics:
//!   "1":
//!     devopsId: 101
//!     contentHash: "abc123def456"
//! stories:
//!   "1.1": { devopsId: 102, epicDevopsId: 101, contentHash: "...", attached: true }
//! tasks:
//!   "1.1-T1": { devopsId: 103, storyDevopsId: 102, contentHash: "..." }
//! iterations:
//!   epic-1-foundation: { epicId: "1", devopsId: "guid", devopsPath: "..." }
//! ```
//!
//! The snapshot is read once per run and never mutated by planning. A new
//! snapshot is produced by write-back and saved with the same atomic
//! `.tmp` + rename pattern the registry used.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{io_err, StoreError};

/// Remote work-item id. Work items use integers, iterations use GUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl RemoteId {
    /// `false` for the placeholder strings older snapshots wrote for missing ids.
    pub fn is_usable(&self) -> bool {
        match self {
            RemoteId::Number(_) => true,
            RemoteId::Text(s) => {
                let s = s.trim();
                !s.is_empty() && s != "None" && s != "null"
            }
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => n.fmt(f),
            RemoteId::Text(s) => s.fmt(f),
        }
    }
}

impl From<i64> for RemoteId {
    fn from(n: i64) -> Self {
        RemoteId::Number(n)
    }
}

/// Sync status written alongside each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Synced,
    /// Created locally but the remote call failed; retried next run.
    Pending,
}

/// Last-known state of one synced epic, story, or task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    #[serde(rename = "devopsId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    #[serde(rename = "epicDevopsId", default, skip_serializing_if = "Option::is_none")]
    pub epic_remote_id: Option<RemoteId>,
    #[serde(rename = "storyDevopsId", default, skip_serializing_if = "Option::is_none")]
    pub story_remote_id: Option<RemoteId>,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub attached: bool,
}

impl SyncRecord {
    /// The remote id, if one was recorded and is not a placeholder.
    pub fn usable_remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref().filter(|id| id.is_usable())
    }

    /// Synced with a stored digest. Pending or hashless records were never
    /// created remotely and are retried.
    pub fn is_settled(&self) -> bool {
        self.status != RecordStatus::Pending && !self.content_hash.is_empty()
    }
}

/// A previously created iteration, keyed by slug in [`SyncState::iterations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    #[serde(default)]
    pub epic_id: String,
    #[serde(rename = "devopsId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    #[serde(rename = "devopsPath", default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
}

impl IterationRecord {
    pub fn usable_remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref().filter(|id| id.is_usable())
    }
}

/// Root of the sync-state YAML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_full_sync: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub epics: BTreeMap<String, SyncRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stories: BTreeMap<String, SyncRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: BTreeMap<String, SyncRecord>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub iterations: BTreeMap<String, IterationRecord>,
}

impl SyncState {
    /// First iteration slug (in slug order) recorded for `epic_id`.
    pub fn iteration_for_epic(&self, epic_id: &str) -> Option<(&str, &IterationRecord)> {
        self.iterations
            .iter()
            .find(|(_, record)| record.epic_id == epic_id)
            .map(|(slug, record)| (slug.as_str(), record))
    }

    pub fn is_empty(&self) -> bool {
        self.epics.is_empty()
            && self.stories.is_empty()
            && self.tasks.is_empty()
            && self.iterations.is_empty()
    }
}

/// An empty YAML section (`tasks:` with no entries) parses as null.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the sync state at `path`.
///
/// Returns an empty snapshot if the file does not yet exist (first run).
pub fn load_at(path: &Path) -> Result<SyncState, StoreError> {
    if !path.exists() {
        return Ok(SyncState::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(SyncState::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically save `state` to `path`.
///
/// Write flow: serialize → `<path>.tmp` sibling → `rename`. The `.tmp` file
/// is always in the target directory so the rename never crosses filesystems.
pub fn save_at(path: &Path, state: &SyncState) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let yaml = serde_yaml::to_string(state)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sync-state.yaml".to_string());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty_state() {
        let dir = TempDir::new().expect("tempdir");
        let state = load_at(&dir.path().join("nope.yaml")).expect("load");
        assert!(state.is_empty());
        assert!(state.last_full_sync.is_none());
    }

    #[test]
    fn loads_snapshot_written_by_previous_tooling() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sync.yaml");
        std::fs::write(
            &path,
            concat!(
                "# Sync State\n",
                "lastFullSync: \"2026-01-05T10:00:00Z\"\n",
                "\n",
                "epics:\n",
                "  \"1\":\n",
                "    devopsId: 12345\n",
                "    contentHash: \"abc123def456\"\n",
                "    lastSynced: \"2026-01-05T10:00:00Z\"\n",
                "    status: \"synced\"\n",
                "stories:\n",
                "  \"1.1\":\n",
                "    devopsId: 12346\n",
                "    epicDevopsId: 12345\n",
                "    contentHash: \"def456ghi789\"\n",
                "    attached: true\n",
                "tasks:\n",
                "\n",
                "iterations:\n",
                "  epic-1-foundation:\n",
                "    epicId: \"1\"\n",
                "    devopsId: \"9a1c-guid\"\n",
            ),
        )
        .expect("write");

        let state = load_at(&path).expect("load");
        assert_eq!(state.epics["1"].remote_id, Some(RemoteId::Number(12345)));
        assert_eq!(state.epics["1"].content_hash, "abc123def456");
        assert_eq!(
            state.stories["1.1"].epic_remote_id,
            Some(RemoteId::Number(12345))
        );
        assert!(state.stories["1.1"].attached);
        assert!(state.tasks.is_empty());
        assert_eq!(
            state.iterations["epic-1-foundation"].remote_id,
            Some(RemoteId::Text("9a1c-guid".to_string()))
        );
    }

    #[test]
    fn iteration_lookup_by_epic() {
        let mut state = SyncState::default();
        state.iterations.insert(
            "epic-2-security".to_string(),
            IterationRecord {
                epic_id: "2".to_string(),
                ..IterationRecord::default()
            },
        );
        let (slug, _) = state.iteration_for_epic("2").expect("found");
        assert_eq!(slug, "epic-2-security");
        assert!(state.iteration_for_epic("3").is_none());
    }

    #[test]
    fn placeholder_remote_ids_are_unusable() {
        assert!(RemoteId::Number(0).is_usable());
        assert!(!RemoteId::Text("None".to_string()).is_usable());
        assert!(!RemoteId::Text("  ".to_string()).is_usable());
        assert!(RemoteId::Text("guid".to_string()).is_usable());
    }

    #[test]
    fn pending_and_hashless_records_are_unsettled() {
        let synced = SyncRecord {
            content_hash: "0123456789ab".to_string(),
            ..SyncRecord::default()
        };
        assert!(synced.is_settled());
        assert!(!SyncRecord {
            status: RecordStatus::Pending,
            ..synced.clone()
        }
        .is_settled());
        assert!(!SyncRecord::default().is_settled());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(".backlog").join("sync-state.yaml");
        let mut state = SyncState::default();
        state.tasks.insert(
            "1.1-T1".to_string(),
            SyncRecord {
                remote_id: Some(RemoteId::Number(7)),
                content_hash: "0123456789ab".to_string(),
                ..SyncRecord::default()
            },
        );
        save_at(&path, &state).expect("save");
        let loaded = load_at(&path).expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn atomic_save_cleans_up_tmp() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sync-state.yaml");
        save_at(&path, &SyncState::default()).expect("save");
        assert!(!dir.path().join("sync-state.yaml.tmp").exists());
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "epics: [unclosed").expect("write");
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("broken.yaml"));
    }
}
