//! Interval overlap detection over a schedule.
//!
//! Intervals are half-open: a task ending at 09:00 and one starting at 09:00
//! touch but do not conflict.

use crate::domain::models::Task;

/// Returns the tasks overlapping `[start, end)`, ordered by ascending start.
///
/// `exclude_id` drops the task being edited in place. Tasks whose times do not
/// parse are ignored. Ties keep schedule order.
pub fn find_conflicts(start: u32, end: u32, tasks: &[Task], exclude_id: Option<&str>) -> Vec<Task> {
    let mut conflicts = tasks
        .iter()
        .filter(|task| exclude_id != Some(task.id.as_str()))
        .filter_map(|task| task.interval().ok().map(|interval| (interval, task)))
        .filter(|((task_start, task_end), _)| *task_start < end && *task_end > start)
        .collect::<Vec<_>>();
    conflicts.sort_by_key(|((task_start, _), _)| *task_start);
    conflicts
        .into_iter()
        .map(|(_, task)| task.clone())
        .collect()
}

/// Every pair of task ids whose intervals overlap, in schedule order.
pub fn overlapping_pairs(tasks: &[Task]) -> Vec<(String, String)> {
    let intervals = tasks
        .iter()
        .filter_map(|task| task.interval().ok().map(|interval| (task.id.as_str(), interval)))
        .collect::<Vec<_>>();

    let mut pairs = Vec::new();
    for (index, (left_id, (left_start, left_end))) in intervals.iter().enumerate() {
        for (right_id, (right_start, right_end)) in &intervals[index + 1..] {
            if left_start < right_end && right_start < left_end {
                pairs.push((left_id.to_string(), right_id.to_string()));
            }
        }
    }
    pairs
}
