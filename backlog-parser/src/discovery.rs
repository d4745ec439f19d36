//! Story-file discovery.
//!
//! Story documents live in a stories directory in one of two layouts:
//! nested (`{N.M}/story.md`) or flat (`{N}-{M}-slug.md`). Three passes run
//! in a fixed order and an id claimed by an earlier pass is never revisited,
//! so a stale file in a later layout cannot shadow the one found first.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use backlog_core::StoryId;
use tracing::debug;

use crate::error::{io_err, ParseError};
use crate::patterns::{FLAT_STORY_FILE_RE, NESTED_STORY_DIR_RE};

const NESTED_FILE_NAME: &str = "story.md";

/// Which pass located a story document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPass {
    /// `{id}/story.md` for an id named in the epic document.
    KnownNested,
    /// `{N}-{M}-slug.md` directly in the stories directory.
    Flat,
    /// `{N.M}/story.md` for an id the epic document does not name.
    UnknownNested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryFileLocation {
    pub story_id: StoryId,
    pub path: PathBuf,
    pub pass: DiscoveryPass,
}

/// Locate story documents under `stories_dir`.
///
/// A missing directory yields no locations. Directory listings are sorted by
/// file name so the result never depends on filesystem enumeration order.
pub fn discover_story_files(
    stories_dir: &Path,
    known_ids: &[StoryId],
) -> Result<Vec<StoryFileLocation>, ParseError> {
    if !stories_dir.is_dir() {
        debug!("stories directory {} not found", stories_dir.display());
        return Ok(Vec::new());
    }

    let mut claimed: BTreeSet<StoryId> = BTreeSet::new();
    let mut found = Vec::new();
    let mut claim = |story_id: StoryId, path: PathBuf, pass: DiscoveryPass| {
        if claimed.insert(story_id.clone()) {
            debug!("story {story_id} -> {} ({pass:?})", path.display());
            found.push(StoryFileLocation {
                story_id,
                path,
                pass,
            });
        }
    };

    // Pass 1
    for id in known_ids {
        let path = stories_dir.join(id.as_str()).join(NESTED_FILE_NAME);
        if path.is_file() {
            claim(id.clone(), path, DiscoveryPass::KnownNested);
        }
    }

    let entries = sorted_entries(stories_dir)?;

    // Pass 2
    for (name, path) in &entries {
        if !name.ends_with(".md") || !path.is_file() {
            continue;
        }
        if let Some(caps) = FLAT_STORY_FILE_RE.captures(name) {
            let id = StoryId::from(format!("{}.{}", &caps[1], &caps[2]));
            claim(id, path.clone(), DiscoveryPass::Flat);
        }
    }

    // Pass 3
    for (name, path) in &entries {
        if !NESTED_STORY_DIR_RE.is_match(name) || !path.is_dir() {
            continue;
        }
        let file = path.join(NESTED_FILE_NAME);
        if file.is_file() {
            claim(StoryId::from(name.as_str()), file, DiscoveryPass::UnknownNested);
        }
    }

    Ok(found)
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, ParseError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path()));
    }
    entries.sort();
    Ok(entries)
}
