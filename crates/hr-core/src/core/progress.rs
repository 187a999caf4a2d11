//! Promotion progress model.
//!
//! Tracks a fixed list of steps as a data promotion runs. The model only
//! derives progress; rendering lives in `display::progress`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }

    /// `pending -> running -> completed | error`; terminal states never change.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Running, StepStatus::Completed)
                | (StepStatus::Running, StepStatus::Error)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl PromotionStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Pending,
            details: None,
            count: None,
        }
    }
}

/// Invalid status change on a step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step '{step_id}' cannot move from {from} to {to}")]
pub struct TransitionError {
    pub step_id: String,
    pub from: StepStatus,
    pub to: StepStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionProgress {
    pub steps: Vec<PromotionStep>,
    pub current_step: Option<String>,
    pub is_complete: bool,
}

impl PromotionProgress {
    pub fn new(steps: Vec<PromotionStep>) -> Self {
        Self {
            steps,
            current_step: None,
            is_complete: false,
        }
    }

    /// Percentage of completed steps, 100 once the run is complete.
    pub fn progress(&self) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if self.steps.is_empty() {
            return 0.0;
        }
        let completed = self.completed_count() as f64;
        completed / self.steps.len() as f64 * 100.0
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Error)
    }

    pub fn total_records(&self) -> u64 {
        self.steps.iter().filter_map(|s| s.count).sum()
    }

    pub fn step(&self, id: &str) -> Option<&PromotionStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Move a step to `status`. Unknown ids are ignored.
    pub fn set_status(&mut self, id: &str, status: StepStatus) -> Result<(), TransitionError> {
        let Some(step) = self.steps.iter_mut().find(|s| s.id == id) else {
            return Ok(());
        };
        if !step.status.can_transition_to(status) {
            return Err(TransitionError {
                step_id: id.to_string(),
                from: step.status,
                to: status,
            });
        }
        step.status = status;
        if status == StepStatus::Running {
            self.current_step = Some(id.to_string());
        } else if self.current_step.as_deref() == Some(id) {
            self.current_step = None;
        }
        Ok(())
    }

    pub fn start(&mut self, id: &str) -> Result<(), TransitionError> {
        self.set_status(id, StepStatus::Running)
    }

    pub fn complete(&mut self, id: &str, count: Option<u64>) -> Result<(), TransitionError> {
        self.set_status(id, StepStatus::Completed)?;
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            step.count = count.or(step.count);
        }
        Ok(())
    }

    pub fn fail(&mut self, id: &str, details: impl Into<String>) -> Result<(), TransitionError> {
        self.set_status(id, StepStatus::Error)?;
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            step.details = Some(details.into());
        }
        Ok(())
    }

    /// Mark the whole run finished.
    pub fn finish(&mut self) {
        self.current_step = None;
        self.is_complete = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_steps() -> PromotionProgress {
        PromotionProgress::new(vec![
            PromotionStep::new("validate", "Validate staging data"),
            PromotionStep::new("employees", "Promote employees"),
            PromotionStep::new("cost_centers", "Promote cost centers"),
            PromotionStep::new("cleanup", "Clean up staging tables"),
        ])
    }

    #[test]
    fn test_two_of_four_is_fifty() {
        let mut progress = four_steps();
        for id in ["validate", "employees"] {
            progress.start(id).unwrap();
            progress.complete(id, Some(10)).unwrap();
        }
        assert_eq!(progress.progress(), 50.0);
        assert_eq!(progress.total_records(), 20);
    }

    #[test]
    fn test_complete_forces_hundred() {
        let mut progress = four_steps();
        progress.finish();
        assert_eq!(progress.progress(), 100.0);
        assert!(progress.current_step.is_none());
    }

    #[test]
    fn test_empty_steps() {
        let mut progress = PromotionProgress::new(Vec::new());
        assert_eq!(progress.progress(), 0.0);
        progress.finish();
        assert_eq!(progress.progress(), 100.0);
    }

    #[test]
    fn test_transitions() {
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Running));
        assert!(StepStatus::Running.can_transition_to(StepStatus::Error));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Completed));
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::Running));
        assert!(!StepStatus::Error.can_transition_to(StepStatus::Completed));
        assert!(StepStatus::Error.is_terminal());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut progress = four_steps();
        let err = progress.complete("validate", None).unwrap_err();
        assert_eq!(err.from, StepStatus::Pending);
        assert_eq!(err.to, StepStatus::Completed);
        assert_eq!(progress.step("validate").unwrap().status, StepStatus::Pending);
    }

    #[test]
    fn test_current_step_tracking_and_failure() {
        let mut progress = four_steps();
        progress.start("employees").unwrap();
        assert_eq!(progress.current_step.as_deref(), Some("employees"));

        progress.fail("employees", "duplicate key").unwrap();
        assert!(progress.current_step.is_none());
        assert!(progress.has_errors());
        assert_eq!(
            progress.step("employees").unwrap().details.as_deref(),
            Some("duplicate key")
        );
        assert_eq!(progress.progress(), 0.0);
    }
}
