//! Epic development status from the sprint-status document.
//!
//! Only the `development_status:` block is read. Story keys share the block
//! and are skipped; the block ends at the next unindented line.

use backlog_core::{EpicId, EpicStatuses};

use crate::patterns::{STATUS_BLOCK_START_RE, STATUS_ENTRY_RE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    BeforeBlock,
    InBlock,
    AfterBlock,
}

/// Line-by-line scanner over the status block.
#[derive(Debug)]
struct StatusScanner {
    state: BlockState,
}

impl StatusScanner {
    fn new() -> Self {
        Self {
            state: BlockState::BeforeBlock,
        }
    }

    /// Feed one line; returns an epic entry when the line carries one.
    fn feed(&mut self, line: &str) -> Option<(EpicId, String)> {
        match self.state {
            BlockState::BeforeBlock => {
                if STATUS_BLOCK_START_RE.is_match(line) {
                    self.state = BlockState::InBlock;
                }
                None
            }
            BlockState::InBlock => {
                if line.starts_with(|c: char| !c.is_whitespace()) {
                    self.state = BlockState::AfterBlock;
                    return None;
                }
                STATUS_ENTRY_RE.captures(line).map(|caps| {
                    let value = caps[2].trim_matches(|c| c == '"' || c == '\'');
                    (EpicId::from(&caps[1]), value.to_lowercase())
                })
            }
            BlockState::AfterBlock => None,
        }
    }

    fn is_done(&self) -> bool {
        self.state == BlockState::AfterBlock
    }
}

/// Map each `epic-N` key in the status block to its lowercased value.
pub fn parse_epic_statuses(content: &str) -> EpicStatuses {
    let mut scanner = StatusScanner::new();
    let mut statuses = EpicStatuses::new();
    for line in content.lines() {
        if let Some((id, status)) = scanner.feed(line) {
            statuses.insert(id, status);
        }
        if scanner.is_done() {
            break;
        }
    }
    statuses
}
