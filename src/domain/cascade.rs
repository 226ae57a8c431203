use crate::domain::clamp::clamp;
use crate::domain::error::ScheduleError;
use crate::domain::models::Task;
use crate::domain::time::from_minutes;
use serde::Serialize;

/// New placement for one task displaced by a cascade.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CascadeMove {
    pub task_id: String,
    pub start_time: String,
    pub end_time: String,
}

/// Chains `conflicts` end to end starting at `anchor_end`.
///
/// Input order is kept, so callers pass the conflict detector's output as is.
/// Each placement is clamped to the day window and the next one starts where
/// the clamped placement ends. Tasks outside `conflicts` are not consulted.
pub fn resolve(anchor_end: u32, conflicts: &[Task]) -> Result<Vec<CascadeMove>, ScheduleError> {
    let mut cursor = anchor_end;
    let mut moves = Vec::with_capacity(conflicts.len());
    for task in conflicts {
        let duration = task.duration_minutes()?;
        let (start, end) = clamp(cursor, cursor.saturating_add(duration));
        moves.push(CascadeMove {
            task_id: task.id.clone(),
            start_time: from_minutes(start),
            end_time: from_minutes(end),
        });
        cursor = end;
    }
    Ok(moves)
}
