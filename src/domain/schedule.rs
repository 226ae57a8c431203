//! Scheduling engine for one (user, date) schedule.
//!
//! Mutations that would overlap existing tasks are parked as a
//! [`ConflictProposal`] until the caller confirms (cascade the conflicting
//! tasks forward) or cancels (leave the schedule untouched). While a proposal
//! is parked every other mutation is rejected.

use crate::domain::cascade::{resolve, CascadeMove};
use crate::domain::clamp::{clamp, fits_day_window};
use crate::domain::conflict::{find_conflicts, overlapping_pairs};
use crate::domain::error::ScheduleError;
use crate::domain::models::{next_id, validate_interval, NewTask, Task, TaskStatus};
use crate::domain::time::{is_slot_aligned, to_minutes};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    Create,
    Move,
    Resize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictProposal {
    pub kind: ProposalKind,
    /// The new or modified task as it would be committed.
    pub candidate: Task,
    /// Overlapped tasks, ascending by start time.
    pub conflicts: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Committed,
    Proposed(ConflictProposal),
    /// The operation was refused and nothing changed.
    Refused,
}

#[derive(Debug, Clone)]
pub struct ScheduleSession {
    user_id: String,
    date: String,
    tasks: Vec<Task>,
    pending: Option<ConflictProposal>,
}

impl ScheduleSession {
    /// Wraps a loaded task list. Tasks stored without a date inherit `date`.
    pub fn new(user_id: impl Into<String>, date: impl Into<String>, tasks: Vec<Task>) -> Self {
        let date = date.into();
        let tasks = tasks
            .into_iter()
            .map(|mut task| {
                if task.date.is_none() {
                    task.date = Some(date.clone());
                }
                task
            })
            .collect();
        Self {
            user_id: user_id.into(),
            date,
            tasks,
            pending: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pending(&self) -> Option<&ConflictProposal> {
        self.pending.as_ref()
    }

    pub fn create_task(&mut self, input: NewTask) -> Result<OperationOutcome, ScheduleError> {
        self.ensure_idle()?;
        let mut task = input.into_task(next_id("tsk"), &self.date)?;
        let (start, end) = task.interval()?;
        let (start, end) = clamp(start, end);
        task.set_interval(start, end);

        let conflicts = find_conflicts(start, end, &self.tasks, None);
        if conflicts.is_empty() {
            self.tasks.push(task);
            return Ok(OperationOutcome::Committed);
        }
        Ok(self.propose(ProposalKind::Create, task, conflicts))
    }

    /// Moves a task to `new_start`, keeping its duration. Moves that would leave
    /// the day window are refused rather than clamped.
    pub fn move_task(
        &mut self,
        task_id: &str,
        new_start: &str,
    ) -> Result<OperationOutcome, ScheduleError> {
        self.ensure_idle()?;
        let new_start = to_minutes(new_start)?;
        if !is_slot_aligned(new_start) {
            return Err(ScheduleError::InvalidTask(
                "task times must align to 15-minute slots".to_string(),
            ));
        }
        self.move_to(task_id, new_start)
    }

    /// Moves a task by a signed number of minutes, as produced by a drag.
    pub fn shift_task(
        &mut self,
        task_id: &str,
        delta_minutes: i32,
    ) -> Result<OperationOutcome, ScheduleError> {
        self.ensure_idle()?;
        if delta_minutes.unsigned_abs() % 15 != 0 {
            return Err(ScheduleError::InvalidTask(
                "shift must be a multiple of 15 minutes".to_string(),
            ));
        }
        let (start, _) = self.find(task_id)?.interval()?;
        let Some(new_start) = start.checked_add_signed(delta_minutes) else {
            return Ok(OperationOutcome::Refused);
        };
        self.move_to(task_id, new_start)
    }

    /// Sets both ends of a task. Out-of-window results are clamped.
    pub fn resize_task(
        &mut self,
        task_id: &str,
        new_start: &str,
        new_end: &str,
    ) -> Result<OperationOutcome, ScheduleError> {
        self.ensure_idle()?;
        let mut candidate = self.find(task_id)?.clone();
        let start = to_minutes(new_start)?;
        let end = to_minutes(new_end)?;
        validate_interval(start, end)?;

        let (start, end) = clamp(start, end);
        candidate.set_interval(start, end);
        Ok(self.place(ProposalKind::Resize, candidate, start, end))
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, ScheduleError> {
        self.ensure_idle()?;
        let index = self.position(task_id)?;
        Ok(self.tasks.remove(index))
    }

    pub fn change_status(
        &mut self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, ScheduleError> {
        self.ensure_idle()?;
        let index = self.position(task_id)?;
        let task = &mut self.tasks[index];
        task.status = status;
        Ok(task.clone())
    }

    /// Commits the pending proposal: the candidate lands where proposed and the
    /// conflicting tasks are chained after it.
    pub fn confirm(&mut self) -> Result<Vec<CascadeMove>, ScheduleError> {
        let proposal = self
            .pending
            .as_ref()
            .ok_or(ScheduleError::NoPendingProposal)?;
        let (_, anchor_end) = proposal.candidate.interval()?;
        let moves = resolve(anchor_end, &proposal.conflicts)?;

        let mut working = self.tasks.clone();
        match proposal.kind {
            ProposalKind::Create => working.push(proposal.candidate.clone()),
            ProposalKind::Move | ProposalKind::Resize => {
                let slot = working
                    .iter_mut()
                    .find(|task| task.id == proposal.candidate.id)
                    .ok_or_else(|| ScheduleError::TaskNotFound(proposal.candidate.id.clone()))?;
                *slot = proposal.candidate.clone();
            }
        }
        for placement in &moves {
            if let Some(task) = working.iter_mut().find(|task| task.id == placement.task_id) {
                task.start_time = placement.start_time.clone();
                task.end_time = placement.end_time.clone();
            }
        }

        self.tasks = working;
        self.pending = None;
        Ok(moves)
    }

    /// Drops the pending proposal without touching the schedule.
    pub fn cancel(&mut self) -> Result<ConflictProposal, ScheduleError> {
        self.pending.take().ok_or(ScheduleError::NoPendingProposal)
    }

    /// Pairs of tasks that currently overlap. Empty whenever the schedule is
    /// consistent.
    pub fn overlapping_pairs(&self) -> Vec<(String, String)> {
        overlapping_pairs(&self.tasks)
    }

    fn move_to(&mut self, task_id: &str, new_start: u32) -> Result<OperationOutcome, ScheduleError> {
        let mut candidate = self.find(task_id)?.clone();
        let duration = candidate.duration_minutes()?;
        let new_end = new_start.saturating_add(duration);
        if !fits_day_window(new_start, new_end) {
            return Ok(OperationOutcome::Refused);
        }

        candidate.set_interval(new_start, new_end);
        Ok(self.place(ProposalKind::Move, candidate, new_start, new_end))
    }

    fn place(
        &mut self,
        kind: ProposalKind,
        candidate: Task,
        start: u32,
        end: u32,
    ) -> OperationOutcome {
        let conflicts = find_conflicts(start, end, &self.tasks, Some(candidate.id.as_str()));
        if !conflicts.is_empty() {
            return self.propose(kind, candidate, conflicts);
        }
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == candidate.id) {
            *task = candidate;
        }
        OperationOutcome::Committed
    }

    fn propose(
        &mut self,
        kind: ProposalKind,
        candidate: Task,
        conflicts: Vec<Task>,
    ) -> OperationOutcome {
        let proposal = ConflictProposal {
            kind,
            candidate,
            conflicts,
        };
        self.pending = Some(proposal.clone());
        OperationOutcome::Proposed(proposal)
    }

    fn ensure_idle(&self) -> Result<(), ScheduleError> {
        if self.pending.is_some() {
            return Err(ScheduleError::ProposalPending);
        }
        Ok(())
    }

    fn position(&self, task_id: &str) -> Result<usize, ScheduleError> {
        self.tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| ScheduleError::TaskNotFound(task_id.to_string()))
    }

    fn find(&self, task_id: &str) -> Result<&Task, ScheduleError> {
        let index = self.position(task_id)?;
        Ok(&self.tasks[index])
    }
}
