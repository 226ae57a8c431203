use crate::application::analytics::{
    available_tags, daily_breakdown, filter_by_tags, merge_history, progress,
    status_distribution, tag_stats, trailing_dates, DailyStats, Progress, StatusCount, TagStats,
    TOP_TAGS,
};
use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::cascade::CascadeMove;
use crate::domain::error::ScheduleError;
use crate::domain::layout::{
    clamp_slot_height, drag_delta_minutes, task_position, time_slots, TimeSlot,
};
use crate::domain::models::{parse_task_status, NewTask, Task};
use crate::domain::schedule::{ConflictProposal, OperationOutcome, ScheduleSession};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::{
    normalize_date, normalize_user_id, JsonFileTaskStore, TaskStore,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_ANALYTICS_DAYS: u32 = 7;
const MAX_ANALYTICS_DAYS: u32 = 30;

type SessionKey = (String, String);

pub struct AppState {
    config: AppConfig,
    logs_dir: PathBuf,
    store: Arc<dyn TaskStore>,
    sessions: Mutex<HashMap<SessionKey, ScheduleSession>>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let store = Arc::new(JsonFileTaskStore::new(&bootstrap.storage_dir));
        Ok(Self::from_parts(bootstrap.config, bootstrap.logs_dir, store))
    }

    /// Same workspace layout as [`AppState::new`], with tasks kept in `store`.
    pub fn with_store(workspace_root: PathBuf, store: Arc<dyn TaskStore>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Ok(Self::from_parts(bootstrap.config, bootstrap.logs_dir, store))
    }

    fn from_parts(config: AppConfig, logs_dir: PathBuf, store: Arc<dyn TaskStore>) -> Self {
        Self {
            config,
            logs_dir,
            store,
            sessions: Mutex::new(HashMap::new()),
            log_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_warn(&self, command: &str, message: &str) {
        self.append_log("warn", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Committed,
    Proposed,
    Refused,
    Discarded,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub outcome: OutcomeKind,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ConflictProposal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascaded: Option<Vec<CascadeMove>>,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub user_id: String,
    pub date: String,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ConflictProposal>,
    pub progress: Progress,
    pub available_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskLayout {
    pub task_id: String,
    pub top: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    pub slot_height: u32,
    pub slots: Vec<TimeSlot>,
    pub positions: Vec<TaskLayout>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub date: String,
    pub status_distribution: Vec<StatusCount>,
    pub progress: Progress,
    pub daily: Vec<DailyStats>,
    pub top_tags: Vec<TagStats>,
}

/// What a session call produced, before it is turned into a response.
enum Applied {
    Outcome(OperationOutcome),
    Cascaded(Vec<CascadeMove>),
    Discarded,
}

pub async fn open_schedule_impl(
    state: &AppState,
    user_id: String,
    date: String,
    tags: Vec<String>,
) -> Result<ScheduleView, InfraError> {
    let key = session_key(&user_id, &date)?;
    ensure_session(state, &key).await?;

    let (tasks, proposal) = {
        let sessions = lock_sessions(state)?;
        let session = session_ref(&sessions, &key)?;
        (session.tasks().to_vec(), session.pending().cloned())
    };

    let selected = tags
        .iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>();
    Ok(ScheduleView {
        progress: progress(&tasks),
        available_tags: available_tags(&tasks),
        tasks: filter_by_tags(&tasks, &selected),
        proposal,
        user_id: key.0,
        date: key.1,
    })
}

pub async fn create_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    input: NewTask,
) -> Result<OperationResponse, InfraError> {
    run_operation(state, "create_task", user_id, date, move |session| {
        session.create_task(input).map(Applied::Outcome)
    })
    .await
}

pub async fn move_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
    start_time: String,
) -> Result<OperationResponse, InfraError> {
    let task_id = normalize_task_id(&task_id)?;
    run_operation(state, "move_task", user_id, date, move |session| {
        session.move_task(&task_id, &start_time).map(Applied::Outcome)
    })
    .await
}

pub async fn shift_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
    delta_minutes: i32,
) -> Result<OperationResponse, InfraError> {
    let task_id = normalize_task_id(&task_id)?;
    run_operation(state, "shift_task", user_id, date, move |session| {
        session.shift_task(&task_id, delta_minutes).map(Applied::Outcome)
    })
    .await
}

/// Shifts a task by a vertical drag distance measured at `slot_height`
/// (the configured height when absent).
pub async fn drag_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
    delta_px: f64,
    slot_height: Option<u32>,
) -> Result<OperationResponse, InfraError> {
    if !delta_px.is_finite() {
        return Err(InfraError::InvalidInput(format!(
            "deltaPx must be a finite number: {delta_px}"
        )));
    }
    let slot_height = slot_height.unwrap_or(state.config.default_slot_height);
    let delta_minutes = drag_delta_minutes(delta_px, slot_height);
    shift_task_impl(state, user_id, date, task_id, delta_minutes).await
}

pub async fn resize_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
    start_time: String,
    end_time: String,
) -> Result<OperationResponse, InfraError> {
    let task_id = normalize_task_id(&task_id)?;
    run_operation(state, "resize_task", user_id, date, move |session| {
        session
            .resize_task(&task_id, &start_time, &end_time)
            .map(Applied::Outcome)
    })
    .await
}

pub async fn update_status_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
    status: String,
) -> Result<OperationResponse, InfraError> {
    let task_id = normalize_task_id(&task_id)?;
    let status = parse_task_status(&status)?;
    run_operation(state, "update_status", user_id, date, move |session| {
        session
            .change_status(&task_id, status)
            .map(|_| Applied::Outcome(OperationOutcome::Committed))
    })
    .await
}

pub async fn delete_task_impl(
    state: &AppState,
    user_id: String,
    date: String,
    task_id: String,
) -> Result<OperationResponse, InfraError> {
    let task_id = normalize_task_id(&task_id)?;
    run_operation(state, "delete_task", user_id, date, move |session| {
        session
            .delete_task(&task_id)
            .map(|_| Applied::Outcome(OperationOutcome::Committed))
    })
    .await
}

pub async fn confirm_proposal_impl(
    state: &AppState,
    user_id: String,
    date: String,
) -> Result<OperationResponse, InfraError> {
    run_operation(state, "confirm_proposal", user_id, date, |session| {
        session.confirm().map(Applied::Cascaded)
    })
    .await
}

pub async fn cancel_proposal_impl(
    state: &AppState,
    user_id: String,
    date: String,
) -> Result<OperationResponse, InfraError> {
    run_operation(state, "cancel_proposal", user_id, date, |session| {
        session.cancel().map(|_| Applied::Discarded)
    })
    .await
}

pub async fn get_layout_impl(
    state: &AppState,
    user_id: String,
    date: String,
    slot_height: Option<u32>,
) -> Result<LayoutView, InfraError> {
    let key = session_key(&user_id, &date)?;
    ensure_session(state, &key).await?;
    let tasks = {
        let sessions = lock_sessions(state)?;
        session_ref(&sessions, &key)?.tasks().to_vec()
    };

    let slot_height = clamp_slot_height(slot_height.unwrap_or(state.config.default_slot_height));
    let positions = tasks
        .iter()
        .filter_map(|task| {
            task_position(task, slot_height)
                .ok()
                .map(|position| TaskLayout {
                    task_id: task.id.clone(),
                    top: position.top,
                    height: position.height,
                })
        })
        .collect();

    Ok(LayoutView {
        slot_height,
        slots: time_slots(),
        positions,
    })
}

/// Status and progress for `date`, per-day counts over the trailing `days`,
/// and the busiest tags over the full history window.
pub async fn get_analytics_impl(
    state: &AppState,
    user_id: String,
    date: String,
    days: Option<u32>,
) -> Result<AnalyticsView, InfraError> {
    let key = session_key(&user_id, &date)?;
    let selected = NaiveDate::parse_from_str(&key.1, "%Y-%m-%d")
        .map_err(|error| InfraError::InvalidInput(format!("invalid date '{}': {error}", key.1)))?;
    let days = days
        .unwrap_or(DEFAULT_ANALYTICS_DAYS)
        .clamp(1, MAX_ANALYTICS_DAYS);

    let current = schedule_snapshot(state, &key).await?;
    let mut history = Vec::new();
    for history_date in trailing_dates(selected, MAX_ANALYTICS_DAYS) {
        if history_date == key.1 {
            continue;
        }
        let history_key = (key.0.clone(), history_date);
        history.extend(schedule_snapshot(state, &history_key).await?);
    }
    let all_tasks = merge_history(&current, history);

    let window = trailing_dates(selected, days);
    let view = AnalyticsView {
        status_distribution: status_distribution(&current),
        progress: progress(&current),
        daily: daily_breakdown(&window, &all_tasks),
        top_tags: tag_stats(&all_tasks, TOP_TAGS),
        date: key.1,
    };
    state.log_info(
        "get_analytics",
        &format!("user={} date={} days={days} tasks={}", key.0, view.date, all_tasks.len()),
    );
    Ok(view)
}

pub async fn list_tags_impl(
    state: &AppState,
    user_id: String,
    date: String,
) -> Result<Vec<String>, InfraError> {
    let key = session_key(&user_id, &date)?;
    ensure_session(state, &key).await?;
    let sessions = lock_sessions(state)?;
    Ok(available_tags(session_ref(&sessions, &key)?.tasks()))
}

async fn run_operation<F>(
    state: &AppState,
    command: &str,
    user_id: String,
    date: String,
    operation: F,
) -> Result<OperationResponse, InfraError>
where
    F: FnOnce(&mut ScheduleSession) -> Result<Applied, ScheduleError>,
{
    let key = session_key(&user_id, &date)?;
    ensure_session(state, &key).await?;

    let (applied, tasks, overlaps) = {
        let mut sessions = lock_sessions(state)?;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| missing_session(&key))?;
        let applied = operation(session)?;
        (applied, session.tasks().to_vec(), session.overlapping_pairs())
    };

    let mut response = OperationResponse {
        outcome: OutcomeKind::Committed,
        tasks,
        proposal: None,
        cascaded: None,
        persisted: false,
    };
    match applied {
        Applied::Outcome(OperationOutcome::Committed) => {}
        Applied::Cascaded(moves) => response.cascaded = Some(moves),
        Applied::Outcome(OperationOutcome::Proposed(proposal)) => {
            response.outcome = OutcomeKind::Proposed;
            response.proposal = Some(proposal);
        }
        Applied::Outcome(OperationOutcome::Refused) => response.outcome = OutcomeKind::Refused,
        Applied::Discarded => response.outcome = OutcomeKind::Discarded,
    }

    if response.outcome == OutcomeKind::Committed {
        if !overlaps.is_empty() {
            let pairs = overlaps
                .iter()
                .map(|(left, right)| format!("{left}/{right}"))
                .collect::<Vec<_>>()
                .join(",");
            state.log_warn(
                command,
                &format!("user={} date={} residual overlaps: {pairs}", key.0, key.1),
            );
        }
        response.persisted = persist(state, command, &key, &response.tasks).await;
    }

    state.log_info(
        command,
        &format!(
            "user={} date={} outcome={:?} tasks={} persisted={}",
            key.0,
            key.1,
            response.outcome,
            response.tasks.len(),
            response.persisted
        ),
    );
    Ok(response)
}

async fn persist(state: &AppState, command: &str, key: &SessionKey, tasks: &[Task]) -> bool {
    match state.store.save(&key.0, &key.1, tasks).await {
        Ok(()) => true,
        Err(error) => {
            state.log_error(
                command,
                &format!("user={} date={} save failed: {error}", key.0, key.1),
            );
            false
        }
    }
}

/// Loads the schedule for `key` into the session map unless it is already there.
/// Store failures start the session empty.
async fn ensure_session(state: &AppState, key: &SessionKey) -> Result<(), InfraError> {
    {
        let sessions = lock_sessions(state)?;
        if sessions.contains_key(key) {
            return Ok(());
        }
    }

    let tasks = load_or_empty(state, key).await;
    let mut sessions = lock_sessions(state)?;
    sessions
        .entry(key.clone())
        .or_insert_with(|| ScheduleSession::new(key.0.clone(), key.1.clone(), tasks));
    Ok(())
}

/// Tasks for `key`, from the live session when one is open.
async fn schedule_snapshot(state: &AppState, key: &SessionKey) -> Result<Vec<Task>, InfraError> {
    let live = {
        let sessions = lock_sessions(state)?;
        sessions.get(key).map(|session| session.tasks().to_vec())
    };
    if let Some(tasks) = live {
        return Ok(tasks);
    }
    Ok(ScheduleSession::new(key.0.clone(), key.1.clone(), load_or_empty(state, key).await)
        .tasks()
        .to_vec())
}

async fn load_or_empty(state: &AppState, key: &SessionKey) -> Vec<Task> {
    match state.store.load(&key.0, &key.1).await {
        Ok(tasks) => tasks,
        Err(error) => {
            state.log_error(
                "load_schedule",
                &format!("user={} date={} load failed: {error}", key.0, key.1),
            );
            Vec::new()
        }
    }
}

fn session_key(user_id: &str, date: &str) -> Result<SessionKey, InfraError> {
    Ok((normalize_user_id(user_id)?, normalize_date(date)?))
}

fn normalize_task_id(task_id: &str) -> Result<String, InfraError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "task_id must not be empty".to_string(),
        ));
    }
    Ok(task_id.to_string())
}

fn lock_sessions(
    state: &AppState,
) -> Result<MutexGuard<'_, HashMap<SessionKey, ScheduleSession>>, InfraError> {
    state
        .sessions
        .lock()
        .map_err(|error| InfraError::Persistence(format!("session lock poisoned: {error}")))
}

fn session_ref<'a>(
    sessions: &'a HashMap<SessionKey, ScheduleSession>,
    key: &SessionKey,
) -> Result<&'a ScheduleSession, InfraError> {
    sessions.get(key).ok_or_else(|| missing_session(key))
}

fn missing_session(key: &SessionKey) -> InfraError {
    InfraError::Persistence(format!("no open session for user={} date={}", key.0, key.1))
}
