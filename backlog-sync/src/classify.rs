//! Diff classification against the prior sync-state snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use backlog_core::{id_sort_key, ContentDigest, RemoteId, SyncRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::digest::Fingerprinted;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// No usable prior record.
    New,
    /// Prior digest differs.
    Changed,
    Unchanged,
    /// Recorded previously, absent from the current parse.
    Orphaned,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::New => write!(f, "NEW"),
            Classification::Changed => write!(f, "CHANGED"),
            Classification::Unchanged => write!(f, "UNCHANGED"),
            Classification::Orphaned => write!(f, "ORPHANED"),
        }
    }
}

/// One classification record per id in `current ∪ prior`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classified<T> {
    pub id: String,
    pub classification: Classification,
    /// Current digest, or the stored one for orphans.
    pub content_hash: ContentDigest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_hash: Option<ContentDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub attached: bool,
    /// `None` only for orphans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<T>,
}

impl<T> Classified<T> {
    pub fn is_orphaned(&self) -> bool {
        self.classification == Classification::Orphaned
    }
}

/// Classify `current` against the `prior` records of the same id space.
///
/// A prior record counts only if it carries a digest and is not still
/// `pending`; a pending record was never created remotely, so its entity is
/// classified `NEW` again and retried. Current entities come first in input
/// order, then orphans in natural id order.
pub fn classify<T>(current: &[T], prior: &BTreeMap<String, SyncRecord>) -> Vec<Classified<T>>
where
    T: Fingerprinted + Clone,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(current.len());

    for entity in current {
        let id = entity.entity_id();
        let digest = entity.digest();
        let record = prior.get(&id);
        let prior_hash = record
            .filter(|r| r.is_settled())
            .map(|r| ContentDigest(r.content_hash.clone()));

        let classification = match &prior_hash {
            None => Classification::New,
            Some(stored) if *stored == digest => Classification::Unchanged,
            Some(_) => Classification::Changed,
        };
        debug!("{} {id}: {classification}", T::KIND);

        out.push(Classified {
            id: id.clone(),
            classification,
            content_hash: digest,
            prior_hash,
            remote_id: record.and_then(|r| r.usable_remote_id().cloned()),
            attached: record.is_some_and(|r| r.attached),
            entity: Some(entity.clone()),
        });
        seen.insert(id);
    }

    let mut orphans: Vec<(&String, &SyncRecord)> =
        prior.iter().filter(|(id, _)| !seen.contains(*id)).collect();
    orphans.sort_by_cached_key(|(id, _)| id_sort_key(id));
    for (id, record) in orphans {
        debug!("{} {id}: ORPHANED", T::KIND);
        out.push(Classified {
            id: id.clone(),
            classification: Classification::Orphaned,
            content_hash: ContentDigest(record.content_hash.clone()),
            prior_hash: Some(ContentDigest(record.content_hash.clone())),
            remote_id: record.usable_remote_id().cloned(),
            attached: record.attached,
            entity: None,
        });
    }

    out
}
