//! Enrichment pass over already-parsed tasks.
//!
//! Everything written here lands in [`TaskEnrichment`], which no digest reads.
//! Adding a new tag type can therefore never reclassify an existing task.

use backlog_core::{Subtask, Task, TaskEnrichment};

use crate::patterns::{
    AC_REFERENCE_RE, AI_REVIEW_TAG_RE, FILE_PATH_TAG_RE, KNOWN_TAG_RE, PRIORITY_TAG_RE,
};

/// Fill in enrichment fields for every task.
///
/// Regular tasks get AC references and a subtask checklist; review follow-ups
/// get their bracket-tag metadata.
pub fn enrich_tasks(tasks: &mut [Task]) {
    for task in tasks {
        task.enrichment = if task.is_review_followup() {
            review_metadata(&task.description)
        } else {
            TaskEnrichment {
                ac_references: ac_references(&task.description),
                subtask_html: subtask_html(&task.subtasks),
                ..TaskEnrichment::default()
            }
        };
    }
}

/// Priority, file path, tags and clean title from a review item's brackets.
pub fn review_metadata(description: &str) -> TaskEnrichment {
    let priority = PRIORITY_TAG_RE
        .captures(description)
        .map(|caps| match caps[1].to_ascii_uppercase().as_str() {
            "HIGH" => 1,
            "MEDIUM" => 2,
            _ => 3,
        });
    let file_path = FILE_PATH_TAG_RE
        .captures(description)
        .map(|caps| caps[1].to_string());
    let mut tags = Vec::new();
    if AI_REVIEW_TAG_RE.is_match(description) {
        tags.push("AI-Review".to_string());
    }

    let stripped = KNOWN_TAG_RE.replace_all(description, "");
    let stripped = FILE_PATH_TAG_RE.replace(&stripped, "");
    let clean = stripped.trim();
    let clean_title = if clean.is_empty() {
        description.trim()
    } else {
        clean
    };

    TaskEnrichment {
        priority,
        file_path,
        tags,
        clean_title: Some(clean_title.to_string()),
        ..TaskEnrichment::default()
    }
}

/// Sorted unique numbers from the first `(AC: …)` tag.
pub fn ac_references(description: &str) -> Vec<u32> {
    let Some(caps) = AC_REFERENCE_RE.captures(description) else {
        return Vec::new();
    };
    let mut refs: Vec<u32> = caps[1]
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    refs.sort_unstable();
    refs.dedup();
    refs
}

/// HTML checklist of subtasks, or an empty string when there are none.
pub fn subtask_html(subtasks: &[Subtask]) -> String {
    if subtasks.is_empty() {
        return String::new();
    }
    let items: String = subtasks
        .iter()
        .map(|st| {
            let check = if st.complete { "&#9745;" } else { "&#9744;" };
            format!("<li>{check} {}</li>", escape_html(&st.description))
        })
        .collect();
    format!("<div><ul>{items}</ul></div>")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
