// src/checker/batch.rs
// =============================================================================
// "Check all": runs the check pipeline over a list of well-known sites.
//
// Targets are checked strictly one after another. The next check starts only
// once the previous one has returned, so a batch never puts more than one
// probe in flight.
//
// Progress lives in a `BatchState` owned by the run; observers get a look at
// each target as it changes.
// =============================================================================

use serde::Serialize;
use tracing::{info, warn};

use super::{CheckOutcome, CheckPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetProgress {
    Idle,
    Checking,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetState {
    pub target: String,
    pub progress: TargetProgress,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchState {
    pub targets: Vec<TargetState>,
}

impl BatchState {
    pub fn new(targets: &[String]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|target| TargetState {
                    target: target.clone(),
                    progress: TargetProgress::Idle,
                    status_code: None,
                    response_time_ms: None,
                    error: None,
                })
                .collect(),
        }
    }

    pub fn up_count(&self) -> usize {
        self.count(TargetProgress::Up)
    }

    pub fn down_count(&self) -> usize {
        self.count(TargetProgress::Down)
    }

    fn count(&self, progress: TargetProgress) -> usize {
        self.targets.iter().filter(|t| t.progress == progress).count()
    }

    fn mark_checking(&mut self, index: usize) -> &TargetState {
        let entry = &mut self.targets[index];
        entry.progress = TargetProgress::Checking;
        entry
    }

    fn mark_checked(&mut self, index: usize, outcome: &CheckOutcome) -> &TargetState {
        let entry = &mut self.targets[index];
        entry.progress = if outcome.is_up() {
            TargetProgress::Up
        } else {
            TargetProgress::Down
        };
        entry.status_code = outcome.status_code;
        entry.response_time_ms = Some(outcome.response_time_ms);
        entry.error = outcome.error_message.clone();
        entry
    }

    // Bad input for one target doesn't stop the batch
    fn mark_rejected(&mut self, index: usize, reason: String) -> &TargetState {
        let entry = &mut self.targets[index];
        entry.progress = TargetProgress::Down;
        entry.status_code = None;
        entry.response_time_ms = None;
        entry.error = Some(reason);
        entry
    }
}

/// Check every target in order and return the final state.
pub async fn check_all(pipeline: &CheckPipeline, targets: &[String]) -> BatchState {
    check_all_with(pipeline, targets, |_| {}).await
}

/// Like `check_all`, calling `observer` each time a target changes.
pub async fn check_all_with<F>(pipeline: &CheckPipeline, targets: &[String], mut observer: F) -> BatchState
where
    F: FnMut(&TargetState),
{
    let mut state = BatchState::new(targets);

    for (index, target) in targets.iter().enumerate() {
        observer(state.mark_checking(index));

        let entry = match pipeline.check_website(target).await {
            Ok(outcome) => state.mark_checked(index, &outcome),
            Err(e) => {
                warn!(%target, error = %e, "skipping batch target");
                state.mark_rejected(index, e.to_string())
            }
        };
        observer(entry);
    }

    info!(
        total = targets.len(),
        up = state.up_count(),
        down = state.down_count(),
        "batch check finished"
    );

    state
}
