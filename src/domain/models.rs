use crate::domain::error::ScheduleError;
use crate::domain::time::{from_minutes, is_slot_aligned, to_minutes, to_task_minutes};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Complete];
}

pub fn parse_task_status(value: &str) -> Result<TaskStatus, ScheduleError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(TaskStatus::Pending),
        "in-progress" | "in_progress" => Ok(TaskStatus::InProgress),
        "complete" | "completed" => Ok(TaskStatus::Complete),
        other => Err(ScheduleError::InvalidTask(format!(
            "unsupported task status: {other}"
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Task {
    /// `[start, end)` in minutes since midnight.
    pub fn interval(&self) -> Result<(u32, u32), ScheduleError> {
        Ok((
            to_task_minutes(&self.start_time)?,
            to_task_minutes(&self.end_time)?,
        ))
    }

    pub fn duration_minutes(&self) -> Result<u32, ScheduleError> {
        let (start, end) = self.interval()?;
        Ok(end.saturating_sub(start))
    }

    pub fn set_interval(&mut self, start: u32, end: u32) {
        self.start_time = from_minutes(start);
        self.end_time = from_minutes(end);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        let (start, end) = self.interval()?;
        validate_interval(start, end)?;
        if let Some(date) = self.date.as_deref() {
            validate_date(date, "task.date")?;
        }
        let mut seen = HashSet::new();
        for tag in &self.tags {
            validate_non_empty(tag, "task.tags[]")?;
            if !seen.insert(tag.as_str()) {
                return Err(ScheduleError::InvalidTask(format!(
                    "task.tags contains duplicate '{tag}'"
                )));
            }
        }
        Ok(())
    }
}

/// Caller-supplied fields for a task that does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTask {
    /// Builds a pending task for `date`, normalizing title, details and tags.
    pub fn into_task(self, id: String, date: &str) -> Result<Task, ScheduleError> {
        let title = self.title.trim();
        validate_non_empty(title, "task.title")?;
        let start = to_minutes(&self.start_time)?;
        let end = to_minutes(&self.end_time)?;
        validate_interval(start, end)?;
        validate_date(date, "task.date")?;

        let task = Task {
            id,
            title: title.to_string(),
            details: self
                .details
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            start_time: from_minutes(start),
            end_time: from_minutes(end),
            tags: normalize_tags(self.tags),
            status: TaskStatus::Pending,
            date: Some(date.to_string()),
        };
        Ok(task)
    }
}

/// Trims tags and drops blanks and repeats, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

pub fn validate_interval(start: u32, end: u32) -> Result<(), ScheduleError> {
    if !is_slot_aligned(start) || !is_slot_aligned(end) {
        return Err(ScheduleError::InvalidTask(
            "task times must align to 15-minute slots".to_string(),
        ));
    }
    if end <= start {
        return Err(ScheduleError::InvalidTask(
            "task.end_time must be after task.start_time".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_date(value: &str, field_name: &str) -> Result<(), ScheduleError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidTask(format!("{field_name} must be YYYY-MM-DD")))?;
    Ok(())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), ScheduleError> {
    if value.trim().is_empty() {
        return Err(ScheduleError::InvalidTask(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: "tsk-1".to_string(),
            title: "Write tests".to_string(),
            details: Some("for the scheduling engine".to_string()),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            tags: vec!["work".to_string(), "rust".to_string()],
            status: TaskStatus::InProgress,
            date: Some("2026-02-16".to_string()),
        }
    }

    fn sample_new_task() -> NewTask {
        NewTask {
            title: "  Standup ".to_string(),
            details: Some("   ".to_string()),
            start_time: "09:00".to_string(),
            end_time: "09:15".to_string(),
            tags: vec![
                "team".to_string(),
                " team ".to_string(),
                String::new(),
                "daily".to_string(),
            ],
        }
    }

    #[test]
    fn task_validate_accepts_valid_task() {
        assert!(sample_task().validate().is_ok());
    }

    #[test]
    fn task_validate_rejects_empty_title() {
        let mut task = sample_task();
        task.title = "   ".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_reversed_interval() {
        let mut task = sample_task();
        task.end_time = "09:00".to_string();
        assert!(task.validate().is_err());
    }

    #[test]
    fn task_validate_rejects_duplicate_tags() {
        let mut task = sample_task();
        task.tags.push("work".to_string());
        assert!(task.validate().is_err());
    }

    #[test]
    fn new_task_normalizes_fields() {
        let task = sample_new_task()
            .into_task("tsk-9".to_string(), "2026-02-16")
            .expect("valid new task");
        assert_eq!(task.title, "Standup");
        assert_eq!(task.details, None);
        assert_eq!(task.tags, vec!["team".to_string(), "daily".to_string()]);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.date.as_deref(), Some("2026-02-16"));
    }

    #[test]
    fn new_task_rejects_misaligned_and_malformed_times() {
        let mut misaligned = sample_new_task();
        misaligned.end_time = "09:20".to_string();
        assert!(matches!(
            misaligned.into_task("tsk-a".to_string(), "2026-02-16"),
            Err(ScheduleError::InvalidTask(_))
        ));

        let mut malformed = sample_new_task();
        malformed.start_time = "nine".to_string();
        assert_eq!(
            malformed.into_task("tsk-b".to_string(), "2026-02-16"),
            Err(ScheduleError::InvalidFormat("nine".to_string()))
        );
    }

    #[test]
    fn parse_task_status_accepts_known_spellings() {
        assert_eq!(parse_task_status("pending"), Ok(TaskStatus::Pending));
        assert_eq!(parse_task_status("In-Progress"), Ok(TaskStatus::InProgress));
        assert_eq!(parse_task_status("in_progress"), Ok(TaskStatus::InProgress));
        assert_eq!(parse_task_status("complete"), Ok(TaskStatus::Complete));
        assert!(parse_task_status("deferred").is_err());
    }

    #[test]
    fn task_json_uses_browser_field_names() {
        let value = serde_json::to_value(sample_task()).expect("serialize task");
        assert_eq!(value["startTime"], "09:00");
        assert_eq!(value["endTime"], "10:00");
        assert_eq!(value["status"], "in-progress");

        let legacy: Task = serde_json::from_str(
            r#"{"id":"1","title":"Old","startTime":"08:00","endTime":"08:30"}"#,
        )
        .expect("deserialize legacy task");
        assert_eq!(legacy.status, TaskStatus::Pending);
        assert!(legacy.tags.is_empty());
        assert_eq!(legacy.date, None);
    }

    #[test]
    fn next_id_is_unique() {
        let first = next_id("tsk");
        let second = next_id("tsk");
        assert!(first.starts_with("tsk-"));
        assert_ne!(first, second);
    }
}
