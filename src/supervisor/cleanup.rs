// src/supervisor/cleanup.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Timing;
use crate::exec::terminate::join_collector;
use crate::slot::ProcessSlot;
use crate::types::SlotStatus;

const RULE_WIDTH: usize = 40;

/// Human-readable marker appended when a finished slot is cleaned up.
pub fn completion_banner(status: SlotStatus, exit_code: Option<i32>) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let outcome = match (status, exit_code) {
        (SlotStatus::Finished, _) => "successfully".to_string(),
        (_, Some(code)) => format!("with exit code {code}"),
        (_, None) => "with error".to_string(),
    };
    format!("\n{rule}\nProcess completed {outcome}\n{rule}\n")
}

/// A slot reset by the cleanup pass, with the outcome it had before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanedSlot {
    pub index: usize,
    pub status: SlotStatus,
    pub exit_code: Option<i32>,
}

impl CleanedSlot {
    pub fn succeeded(&self) -> bool {
        self.status == SlotStatus::Finished
    }
}

pub(super) async fn cleanup_finished(slots: &[Arc<ProcessSlot>], timing: &Timing) -> Vec<CleanedSlot> {
    let mut cleaned = Vec::new();

    for slot in slots {
        // A slot being launched or terminated is not ours to touch right now.
        let Ok(_control) = slot.control().try_lock() else {
            continue;
        };

        let status = slot.status();
        if !status.is_terminal() {
            continue;
        }

        let exit_code = slot.exit_code();
        info!(
            slot = slot.index(),
            %status,
            ?exit_code,
            "auto-cleaning finished process"
        );

        join_collector(slot, timing).await;
        slot.push_output(completion_banner(status, exit_code));
        slot.reset_keep_output();
        cleaned.push(CleanedSlot {
            index: slot.index(),
            status,
            exit_code,
        });
    }

    if !cleaned.is_empty() {
        debug!(cleaned = cleaned.len(), "cleaned up finished processes");
    }

    cleaned
}
