//! Backlog core library: entity graph types, sync-state snapshot, project
//! configuration, errors.
//!
//! - [`types`]: id newtypes, epics, stories, tasks, parse warnings
//! - [`state`]: previously persisted sync state (load / atomic save)
//! - [`config`]: `backlog.yaml` project configuration
//! - [`error`]: [`StoreError`]

pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use config::ProjectConfig;
pub use error::StoreError;
pub use state::{IterationRecord, RecordStatus, RemoteId, SyncRecord, SyncState};
pub use types::{
    id_sort_key, ContentDigest, Epic, EpicId, EpicStatuses, IdSegment, ParseWarning, Story, StoryId,
    Subtask, Task, TaskEnrichment, TaskId, TaskKind, WarningKind,
};
