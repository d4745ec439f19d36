//! Content digests.
//!
//! A digest is the SHA-256 of an entity's normalized hash fields joined with
//! `|`, hex-encoded and cut to [`DIGEST_LEN`] characters. Field order is part
//! of the contract: reordering, adding or removing a field changes every
//! digest and must bump [`HASH_SCOPE_VERSION`].
//!
//! | Entity | Fields |
//! |--------|--------|
//! | Epic   | title, description, phase, requirements, status |
//! | Story  | title, user story text, acceptance criteria, status |
//! | Task   | description, `complete` / `incomplete` |
//!
//! Enrichment fields are never read here.

use std::fmt;

use backlog_core::{ContentDigest, Epic, Story, Task};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const HASH_SCOPE_VERSION: u32 = 1;

/// Hex characters kept from the SHA-256 output.
pub const DIGEST_LEN: usize = 12;

const FIELD_SEPARATOR: &str = "|";

/// Which id space an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Epic,
    Story,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Epic => write!(f, "epic"),
            EntityKind::Story => write!(f, "story"),
            EntityKind::Task => write!(f, "task"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Trim, collapse whitespace runs to one space, lowercase.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trim and lowercase each token, drop empties, sort, join with `,`.
pub fn normalize_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut tokens: Vec<String> = items
        .iter()
        .map(|item| item.as_ref().trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    tokens.sort();
    tokens.join(",")
}

/// Digest of already-normalized fields.
pub fn compute_digest<S: AsRef<str>>(fields: &[S]) -> ContentDigest {
    let joined = fields
        .iter()
        .map(|field| field.as_ref())
        .collect::<Vec<&str>>()
        .join(FIELD_SEPARATOR);
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(DIGEST_LEN);
    ContentDigest(hex)
}

// ---------------------------------------------------------------------------
// Fingerprinted
// ---------------------------------------------------------------------------

/// An entity with an id and a hash scope.
pub trait Fingerprinted {
    const KIND: EntityKind;

    fn entity_id(&self) -> String;

    /// Normalized hash fields in contract order.
    fn hash_fields(&self) -> Vec<String>;

    fn digest(&self) -> ContentDigest {
        compute_digest(&self.hash_fields())
    }
}

impl Fingerprinted for Epic {
    const KIND: EntityKind = EntityKind::Epic;

    fn entity_id(&self) -> String {
        self.id.to_string()
    }

    fn hash_fields(&self) -> Vec<String> {
        vec![
            normalize(&self.title),
            normalize(&self.description),
            normalize(&self.phase),
            normalize_list(&self.requirements),
            normalize(self.status.as_deref().unwrap_or_default()),
        ]
    }
}

impl Fingerprinted for Story {
    const KIND: EntityKind = EntityKind::Story;

    fn entity_id(&self) -> String {
        self.id.to_string()
    }

    fn hash_fields(&self) -> Vec<String> {
        vec![
            normalize(&self.title),
            normalize(&self.user_story_text),
            normalize(&self.acceptance_criteria),
            normalize(self.status.as_deref().unwrap_or_default()),
        ]
    }
}

impl Fingerprinted for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn entity_id(&self) -> String {
        self.id.to_string()
    }

    fn hash_fields(&self) -> Vec<String> {
        let state = if self.complete { "complete" } else { "incomplete" };
        vec![normalize(&self.description), state.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_core::{EpicId, StoryId, TaskEnrichment, TaskId, TaskKind};

    fn story(title: &str, status: Option<&str>) -> Story {
        Story {
            id: StoryId::from("1.1"),
            epic_id: EpicId::from("1"),
            title: title.to_string(),
            user_story_text: "As a user, I want it.".to_string(),
            acceptance_criteria: "- works".to_string(),
            requirements: vec!["FR-1".to_string()],
            status: status.map(str::to_string),
        }
    }

    fn task(description: &str, complete: bool) -> Task {
        Task {
            id: TaskId::from("1.1-T1"),
            story_id: StoryId::from("1.1"),
            description: description.to_string(),
            complete,
            kind: TaskKind::Task,
            subtasks: Vec::new(),
            enrichment: TaskEnrichment::default(),
        }
    }

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(normalize("  Hello \t  World\n"), "hello world");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("ÄBC\u{00a0}déf"), "äbc déf");
    }

    #[test]
    fn normalize_list_sorts_and_drops_empties() {
        assert_eq!(normalize_list(&["NFR-2", " fr-1 ", "", "FR-10"]), "fr-1,fr-10,nfr-2");
        assert_eq!(normalize_list::<&str>(&[]), "");
    }

    #[test]
    fn digest_is_twelve_lowercase_hex() {
        let digest = compute_digest(&["a", "b"]);
        assert_eq!(digest.as_str().len(), DIGEST_LEN);
        assert!(digest.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn known_digest_value() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb924...
        assert_eq!(compute_digest::<&str>(&[]).as_str(), "e3b0c44298fc");
    }

    #[test]
    fn whitespace_and_case_do_not_matter() {
        let a = story("Repository Scaffolding", Some("done"));
        let b = story("  repository   scaffolding ", Some("DONE"));
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn status_change_alters_story_digest() {
        assert_ne!(
            story("X", Some("draft")).digest(),
            story("X", Some("done")).digest()
        );
        assert_eq!(story("X", None).digest(), story("X", Some("")).digest());
    }

    #[test]
    fn story_requirements_are_outside_the_scope() {
        let mut other = story("X", None);
        other.requirements.push("NFR-9".to_string());
        assert_eq!(story("X", None).digest(), other.digest());
    }

    #[test]
    fn checkbox_state_alters_task_digest() {
        assert_ne!(task("Do it", false).digest(), task("Do it", true).digest());
    }

    #[test]
    fn enrichment_is_outside_the_scope() {
        let plain = task("[HIGH] Fix it (AC: 1)", false);
        let mut enriched = plain.clone();
        enriched.enrichment.priority = Some(1);
        enriched.enrichment.ac_references = vec![1];
        enriched.enrichment.tags = vec!["AI-Review".to_string()];
        enriched.enrichment.clean_title = Some("Fix it".to_string());
        assert_eq!(plain.digest(), enriched.digest());
    }

    #[test]
    fn review_round_is_outside_the_scope() {
        let plain = task("Fix it", false);
        let mut review = plain.clone();
        review.kind = TaskKind::ReviewFollowup { round: 2 };
        assert_eq!(plain.digest(), review.digest());
    }
}
