use serde::Serialize;

// ---------------------------------------------------------------------------
// Step / StepOutcome
// ---------------------------------------------------------------------------

/// The repair steps of a reassignment or withdrawal sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    DetachStaleLinks,
    StationSideSweep,
    RemoveStationLinks,
    CreateActiveLink,
    RepairDuplicates,
    PropagateGrouping,
    WithdrawalSweep,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::DetachStaleLinks => "detach_stale_links",
            Step::StationSideSweep => "station_side_sweep",
            Step::RemoveStationLinks => "remove_station_links",
            Step::CreateActiveLink => "create_active_link",
            Step::RepairDuplicates => "repair_duplicates",
            Step::PropagateGrouping => "propagate_grouping",
            Step::WithdrawalSweep => "withdrawal_sweep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    /// Issue key the step acted on.
    pub subject: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

// ---------------------------------------------------------------------------
// SagaLog
// ---------------------------------------------------------------------------

/// Ordered outcome list of a best-effort, non-transactional mutation.
///
/// Nothing here rolls back; the log only reports what happened so callers
/// can decide on manual follow-up.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SagaLog {
    records: Vec<StepRecord>,
}

impl SagaLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&mut self, step: Step, subject: &str) {
        tracing::debug!(step = step.as_str(), subject = %subject, "step done");
        self.push(step, subject, StepOutcome::Done);
    }

    pub fn skipped(&mut self, step: Step, subject: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(step = step.as_str(), subject = %subject, reason = %reason, "step skipped");
        self.push(step, subject, StepOutcome::Skipped(reason));
    }

    pub fn failed(&mut self, step: Step, subject: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(step = step.as_str(), subject = %subject, reason = %reason, "step failed");
        self.push(step, subject, StepOutcome::Failed(reason));
    }

    fn push(&mut self, step: Step, subject: &str, outcome: StepOutcome) {
        self.records.push(StepRecord {
            step,
            subject: subject.to_string(),
            outcome,
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Failed(_)))
    }
}
