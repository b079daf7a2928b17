// Scheduler decision and budget violation tallies

use crate::trace::{Payload, TraceEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Degrade reason emitted when the memory ceiling forced a downgrade
pub const MEMORY_CEILING_REASON: &str = "memoryCeiling";

/// Counts of scheduler actions over the run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerTally {
    pub degrade_count: u64,
    pub restore_count: u64,
    /// Degrades per reason ("unknown" when the decision named none)
    pub degrade_reasons: BTreeMap<String, u64>,
    pub actionable_violations: u64,
    pub observe_only_violations: u64,
    pub memory_triggered_degrades: u64,
}

/// Tally `scheduler_decision` and `budget_violation` entries
pub fn compute_scheduler_actions(entries: &[TraceEntry]) -> SchedulerTally {
    let mut tally = SchedulerTally::default();

    for entry in entries {
        match &entry.payload {
            Payload::SchedulerDecision { action, reason } => match action.as_deref() {
                Some("degrade") => {
                    tally.degrade_count += 1;
                    let reason = reason.as_deref().unwrap_or("unknown");
                    *tally.degrade_reasons.entry(reason.to_string()).or_default() += 1;
                    if reason == MEMORY_CEILING_REASON {
                        tally.memory_triggered_degrades += 1;
                    }
                }
                Some("restore") => tally.restore_count += 1,
                _ => {}
            },
            Payload::BudgetViolation { observe_only, .. } => {
                if *observe_only {
                    tally.observe_only_violations += 1;
                } else {
                    tally.actionable_violations += 1;
                }
            }
            _ => {}
        }
    }

    tally
}
