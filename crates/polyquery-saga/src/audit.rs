use std::time::{Duration, Instant};

/// Where a step ended up, as seen by the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    Running,
    Executed,
    Failed,
    Compensated,
    /// Committed, but rollback found nothing to run for it.
    CompensationSkipped,
    CompensationFailed,
}

impl StepStatus {
    fn symbol(self) -> &'static str {
        match self {
            Self::Running => "…",
            Self::Executed => "✓",
            Self::Failed => "✗",
            Self::Compensated => "↩",
            Self::CompensationSkipped => "-",
            Self::CompensationFailed => "⚠",
        }
    }
}

#[derive(Debug)]
pub struct StepRecord {
    /// One-based, matching the step's place in the saga.
    pub position: usize,
    pub name: String,
    pub status: StepStatus,
    pub started_at: Instant,
    /// Set when execution finishes and moved forward again by rollback.
    pub completed_at: Option<Instant>,
    pub compensation_description: Option<String>,
}

impl StepRecord {
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at
            .map(|completed| completed.duration_since(self.started_at))
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.completed_at = Some(Instant::now());
    }
}

/// Per-step trail of one saga run: execution, then any rollback.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, position: usize, name: String) {
        self.records.push(StepRecord {
            position,
            name,
            status: StepStatus::Running,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
    }

    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.finish(StepStatus::Failed);
        }
    }

    pub(crate) fn record_success(&mut self, compensation_description: String) {
        if let Some(record) = self.records.last_mut() {
            record.finish(StepStatus::Executed);
            record.compensation_description = Some(compensation_description);
        }
    }

    pub(crate) fn record_compensation(&mut self, position: usize, status: StepStatus) {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.position == position);
        if let Some(record) = record {
            record.finish(status);
        }
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// One line per step, `<symbol> <position>. <name>`.
    #[must_use]
    pub fn summary(&self) -> String {
        let lines: Vec<String> = self
            .records
            .iter()
            .map(|record| {
                format!(
                    "{} {}. {}",
                    record.status.symbol(),
                    record.position,
                    record.name
                )
            })
            .collect();
        lines.join("\n")
    }
}
