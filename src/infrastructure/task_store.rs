use crate::domain::models::{validate_date, Task};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const TASKS_FILE: &str = "tasks.json";

/// `{ userId: { date: [Task] } }`, the on-disk layout of `tasks.json`.
type TaskDocument = BTreeMap<String, BTreeMap<String, Vec<Task>>>;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self, user_id: &str, date: &str) -> Result<Vec<Task>, InfraError>;
    async fn save(&self, user_id: &str, date: &str, tasks: &[Task]) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileTaskStore {
    root: PathBuf,
    /// Held across the read-modify-write of a user document.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl JsonFileTaskStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn file_path(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id).join(TASKS_FILE)
    }

    async fn read_document(path: &Path) -> Result<TaskDocument, InfraError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(TaskDocument::new()),
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn load(&self, user_id: &str, date: &str) -> Result<Vec<Task>, InfraError> {
        let user_id = normalize_user_id(user_id)?;
        let date = normalize_date(date)?;
        let mut document = Self::read_document(&self.file_path(&user_id)).await?;
        Ok(document
            .remove(&user_id)
            .and_then(|mut dates| dates.remove(&date))
            .unwrap_or_default())
    }

    async fn save(&self, user_id: &str, date: &str, tasks: &[Task]) -> Result<(), InfraError> {
        let user_id = normalize_user_id(user_id)?;
        let date = normalize_date(date)?;
        validate_tasks(tasks)?;
        let path = self.file_path(&user_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let _guard = self.write_lock.lock().await;
        // A corrupt document is replaced rather than blocking every later save.
        let mut document = match Self::read_document(&path).await {
            Ok(document) => document,
            Err(InfraError::Json(_)) => TaskDocument::new(),
            Err(error) => return Err(error),
        };
        document
            .entry(user_id)
            .or_default()
            .insert(date, tasks.to_vec());

        let formatted = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&path, formatted).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    schedules: Mutex<HashMap<(String, String), Vec<Task>>>,
    fail_saves: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, user_id: &str, date: &str) -> Result<Vec<Task>, InfraError> {
        let key = (normalize_user_id(user_id)?, normalize_date(date)?);
        let guard = self
            .schedules
            .lock()
            .map_err(|_| InfraError::Persistence("task store lock poisoned".to_string()))?;
        Ok(guard.get(&key).cloned().unwrap_or_default())
    }

    async fn save(&self, user_id: &str, date: &str, tasks: &[Task]) -> Result<(), InfraError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(InfraError::Persistence("save rejected".to_string()));
        }
        let key = (normalize_user_id(user_id)?, normalize_date(date)?);
        validate_tasks(tasks)?;
        let mut guard = self
            .schedules
            .lock()
            .map_err(|_| InfraError::Persistence("task store lock poisoned".to_string()))?;
        guard.insert(key, tasks.to_vec());
        Ok(())
    }
}

pub fn normalize_user_id(value: &str) -> Result<String, InfraError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InfraError::InvalidInput("userId must not be empty".to_string()));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        return Err(InfraError::InvalidInput(format!(
            "userId contains a path separator: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_tasks(tasks: &[Task]) -> Result<(), InfraError> {
    for task in tasks {
        task.validate()
            .map_err(|error| InfraError::InvalidInput(format!("task {}: {error}", task.id)))?;
    }
    Ok(())
}

pub fn normalize_date(value: &str) -> Result<String, InfraError> {
    let trimmed = value.trim();
    validate_date(trimmed, "date").map_err(|error| InfraError::InvalidInput(error.to_string()))?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskStatus;
    use std::sync::atomic::AtomicUsize;

    static NEXT_TEMP_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayplanner-store-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            std::fs::create_dir_all(&path).expect("create temp dir");
            Self { path }
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn task(id: &str, start: &str, end: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            details: None,
            start_time: start.to_string(),
            end_time: end.to_string(),
            tags: vec!["work".to_string()],
            status: TaskStatus::Pending,
            date: Some("2026-03-02".to_string()),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        let tasks = store.load("alice", "2026-03-02").await.expect("load");
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_tasks() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        let tasks = vec![task("a", "09:00", "10:00"), task("b", "10:00", "11:30")];

        store.save("alice", "2026-03-02", &tasks).await.expect("save");
        let loaded = store.load("alice", "2026-03-02").await.expect("load");
        assert_eq!(loaded, tasks);
        assert!(store.file_path("alice").exists());
    }

    #[tokio::test]
    async fn saving_one_date_preserves_other_dates() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        store
            .save("alice", "2026-03-01", &[task("a", "09:00", "10:00")])
            .await
            .expect("save first date");
        store
            .save("alice", "2026-03-02", &[task("b", "11:00", "12:00")])
            .await
            .expect("save second date");

        let first = store.load("alice", "2026-03-01").await.expect("load");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "a");

        let raw = std::fs::read_to_string(store.file_path("alice")).expect("read document");
        let document: serde_json::Value = serde_json::from_str(&raw).expect("parse document");
        assert!(document["alice"]["2026-03-01"].is_array());
        assert_eq!(document["alice"]["2026-03-02"][0]["startTime"], "11:00");
    }

    #[tokio::test]
    async fn corrupt_document_is_replaced_on_save() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        let path = store.file_path("alice");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create user dir");
        std::fs::write(&path, "{not json").expect("write corrupt file");

        assert!(matches!(
            store.load("alice", "2026-03-02").await,
            Err(InfraError::Json(_))
        ));
        store
            .save("alice", "2026-03-02", &[task("a", "09:00", "10:00")])
            .await
            .expect("save over corrupt file");
        assert_eq!(store.load("alice", "2026-03-02").await.expect("load").len(), 1);
    }

    #[tokio::test]
    async fn io_failure_is_reported_instead_of_overwriting() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        std::fs::create_dir_all(store.file_path("alice")).expect("block document path");

        assert!(matches!(
            store
                .save("alice", "2026-03-02", &[task("a", "09:00", "10:00")])
                .await,
            Err(InfraError::Io(_))
        ));
        assert!(store.file_path("alice").is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_for_one_user_keep_every_date() {
        let dir = TempDir::new();
        let store = Arc::new(JsonFileTaskStore::new(&dir.path));

        let handles = (1..=28)
            .map(|day| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let date = format!("2026-02-{day:02}");
                    store
                        .save("alice", &date, &[task("a", "09:00", "10:00")])
                        .await
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.expect("join save").expect("save");
        }

        for day in 1..=28 {
            let date = format!("2026-02-{day:02}");
            let tasks = store.load("alice", &date).await.expect("load");
            assert_eq!(tasks.len(), 1, "{date} was lost");
        }
    }

    #[tokio::test]
    async fn rejects_unsafe_user_ids_and_bad_dates() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        for user in ["", "  ", "../etc", "a/b", "a\\b"] {
            assert!(matches!(
                store.load(user, "2026-03-02").await,
                Err(InfraError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            store.save("alice", "2026-02-30", &[]).await,
            Err(InfraError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn invalid_tasks_are_not_written() {
        let dir = TempDir::new();
        let store = JsonFileTaskStore::new(&dir.path);
        let mut broken = task("a", "09:00", "10:00");
        broken.title = "  ".to_string();

        assert!(matches!(
            store.save("alice", "2026-03-02", &[broken]).await,
            Err(InfraError::InvalidInput(_))
        ));
        assert!(!store.file_path("alice").exists());
    }

    #[tokio::test]
    async fn in_memory_store_can_fail_saves() {
        let store = InMemoryTaskStore::default();
        store
            .save("alice", "2026-03-02", &[task("a", "09:00", "10:00")])
            .await
            .expect("save");
        store.set_fail_saves(true);
        assert!(matches!(
            store.save("alice", "2026-03-02", &[]).await,
            Err(InfraError::Persistence(_))
        ));
        assert_eq!(store.load("alice", "2026-03-02").await.expect("load").len(), 1);
    }
}
