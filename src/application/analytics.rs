//! Read-only views derived from stored schedules: status counts, completion
//! progress, per-day breakdowns and per-tag time totals.

use crate::domain::models::{Task, TaskStatus};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const TOP_TAGS: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub pending: usize,
    pub in_progress: usize,
    pub complete: usize,
    pub total: usize,
    pub pending_percent: f64,
    pub in_progress_percent: f64,
    pub complete_percent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagStats {
    pub tag: String,
    pub total_minutes: u32,
    pub average_minutes_per_day: u32,
    pub completion_rate: f64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

/// Task counts per status, always listing all three statuses in order.
pub fn status_distribution(tasks: &[Task]) -> Vec<StatusCount> {
    TaskStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: tasks.iter().filter(|task| task.status == *status).count(),
        })
        .collect()
}

pub fn progress(tasks: &[Task]) -> Progress {
    let total = tasks.len();
    let completed = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Complete)
        .count();
    let percent = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };
    Progress {
        completed,
        total,
        percent,
    }
}

/// The `days` dates ending at `end`, oldest first.
pub fn trailing_dates(end: NaiveDate, days: u32) -> Vec<String> {
    (0..i64::from(days))
        .rev()
        .map(|offset| (end - Duration::days(offset)).format("%Y-%m-%d").to_string())
        .collect()
}

/// Per-day status counts for `dates`. Tasks dated outside `dates` are ignored.
pub fn daily_breakdown(dates: &[String], tasks: &[Task]) -> Vec<DailyStats> {
    dates
        .iter()
        .map(|date| {
            let day = tasks
                .iter()
                .filter(|task| task.date.as_deref() == Some(date.as_str()));
            let (mut pending, mut in_progress, mut complete) = (0, 0, 0);
            for task in day {
                match task.status {
                    TaskStatus::Pending => pending += 1,
                    TaskStatus::InProgress => in_progress += 1,
                    TaskStatus::Complete => complete += 1,
                }
            }
            let total = pending + in_progress + complete;
            DailyStats {
                date: date.clone(),
                pending,
                in_progress,
                complete,
                total,
                pending_percent: percent_of(pending, total),
                in_progress_percent: percent_of(in_progress, total),
                complete_percent: percent_of(complete, total),
            }
        })
        .collect()
}

/// Minutes, task counts and completion rate per tag, busiest tags first,
/// truncated to `limit` entries.
pub fn tag_stats(tasks: &[Task], limit: usize) -> Vec<TagStats> {
    struct Accumulator<'a> {
        total_minutes: u32,
        total_tasks: usize,
        completed_tasks: usize,
        dates: HashSet<&'a str>,
    }

    let mut by_tag: HashMap<&str, Accumulator<'_>> = HashMap::new();
    for task in tasks {
        let Ok(duration) = task.duration_minutes() else {
            continue;
        };
        for tag in &task.tags {
            let entry = by_tag.entry(tag.as_str()).or_insert_with(|| Accumulator {
                total_minutes: 0,
                total_tasks: 0,
                completed_tasks: 0,
                dates: HashSet::new(),
            });
            entry.total_minutes += duration;
            entry.total_tasks += 1;
            if task.status == TaskStatus::Complete {
                entry.completed_tasks += 1;
            }
            entry.dates.insert(task.date.as_deref().unwrap_or_default());
        }
    }

    let mut stats = by_tag
        .into_iter()
        .map(|(tag, acc)| {
            let days = acc.dates.len().max(1) as f64;
            TagStats {
                tag: tag.to_string(),
                total_minutes: acc.total_minutes,
                average_minutes_per_day: (f64::from(acc.total_minutes) / days).round() as u32,
                completion_rate: percent_of(acc.completed_tasks, acc.total_tasks),
                total_tasks: acc.total_tasks,
                completed_tasks: acc.completed_tasks,
            }
        })
        .collect::<Vec<_>>();
    stats.sort_by(|left, right| {
        right
            .total_minutes
            .cmp(&left.total_minutes)
            .then_with(|| left.tag.cmp(&right.tag))
    });
    stats.truncate(limit);
    stats
}

/// Distinct tags across `tasks`, alphabetically.
pub fn available_tags(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|task| task.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tasks carrying any of `selected`. An empty selection keeps everything.
pub fn filter_by_tags(tasks: &[Task], selected: &[String]) -> Vec<Task> {
    if selected.is_empty() {
        return tasks.to_vec();
    }
    tasks
        .iter()
        .filter(|task| selected.iter().any(|tag| task.has_tag(tag)))
        .cloned()
        .collect()
}

/// Combines the live schedule with stored history, keeping the live copy of
/// any task present in both.
pub fn merge_history(current: &[Task], history: Vec<Task>) -> Vec<Task> {
    let mut seen = current
        .iter()
        .map(|task| task.id.clone())
        .collect::<HashSet<_>>();
    let mut merged = current.to_vec();
    for task in history {
        if seen.insert(task.id.clone()) {
            merged.push(task);
        }
    }
    merged
}

fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
