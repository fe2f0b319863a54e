//! Persistence for generation tasks and meal plans.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{GenerationTask, MealPlan};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
}

fn check_rating(rating: u8) -> Result<(), StoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::InvalidRating(rating))
    }
}

/// Where tasks and meal plans live between calls.
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    async fn save_task(&self, task: &GenerationTask) -> Result<(), StoreError>;

    async fn get_task(&self, id: Uuid) -> Result<Option<GenerationTask>, StoreError>;

    async fn save_meal_plan(&self, plan: &MealPlan) -> Result<(), StoreError>;

    async fn get_meal_plan(&self, id: Uuid) -> Result<Option<MealPlan>, StoreError>;

    /// Plans owned by `owner`, newest first.
    async fn list_meal_plans(&self, owner: &str) -> Result<Vec<MealPlan>, StoreError>;

    async fn rate_meal_plan(&self, id: Uuid, rating: u8, notes: Option<String>) -> Result<MealPlan, StoreError>;
}

fn newest_first(plans: &mut [MealPlan]) {
    plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// One pretty-printed JSON file per record:
/// `<root>/tasks/<id>.json` and `<root>/meal_plans/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    fn plans_dir(&self) -> PathBuf {
        self.root.join("meal_plans")
    }

    async fn write_json<T: serde::Serialize>(&self, dir: PathBuf, id: Uuid, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        let path = dir.join(format!("{}.json", id));
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), "saved record");
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StoreError> {
        match fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[async_trait]
impl MealPlanStore for JsonFileStore {
    async fn save_task(&self, task: &GenerationTask) -> Result<(), StoreError> {
        self.write_json(self.tasks_dir(), task.id, task).await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<GenerationTask>, StoreError> {
        self.read_json(self.tasks_dir().join(format!("{}.json", id))).await
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> Result<(), StoreError> {
        self.write_json(self.plans_dir(), plan.id, plan).await
    }

    async fn get_meal_plan(&self, id: Uuid) -> Result<Option<MealPlan>, StoreError> {
        self.read_json(self.plans_dir().join(format!("{}.json", id))).await
    }

    async fn list_meal_plans(&self, owner: &str) -> Result<Vec<MealPlan>, StoreError> {
        let dir = self.plans_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut plans = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
            let Some(entry) = entry else { break };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(plan) = self.read_json::<MealPlan>(path).await? {
                if plan.owner == owner {
                    plans.push(plan);
                }
            }
        }
        newest_first(&mut plans);
        Ok(plans)
    }

    async fn rate_meal_plan(&self, id: Uuid, rating: u8, notes: Option<String>) -> Result<MealPlan, StoreError> {
        check_rating(rating)?;
        let mut plan = self
            .get_meal_plan(id)
            .await?
            .ok_or(StoreError::NotFound { kind: "meal plan", id })?;
        plan.rate(rating, notes);
        self.save_meal_plan(&plan).await?;
        Ok(plan)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: HashMap<Uuid, GenerationTask>,
    task_history: Vec<GenerationTask>,
    plans: HashMap<Uuid, MealPlan>,
}

/// Process-local store. Every saved task snapshot is also appended to a
/// history that tests can inspect.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task snapshot saved so far, in save order.
    pub async fn task_history(&self) -> Vec<GenerationTask> {
        self.state.read().await.task_history.clone()
    }

    pub async fn meal_plan_count(&self) -> usize {
        self.state.read().await.plans.len()
    }
}

#[async_trait]
impl MealPlanStore for InMemoryStore {
    async fn save_task(&self, task: &GenerationTask) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.task_history.push(task.clone());
        state.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<GenerationTask>, StoreError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn save_meal_plan(&self, plan: &MealPlan) -> Result<(), StoreError> {
        self.state.write().await.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get_meal_plan(&self, id: Uuid) -> Result<Option<MealPlan>, StoreError> {
        Ok(self.state.read().await.plans.get(&id).cloned())
    }

    async fn list_meal_plans(&self, owner: &str) -> Result<Vec<MealPlan>, StoreError> {
        let mut plans: Vec<MealPlan> = self
            .state
            .read()
            .await
            .plans
            .values()
            .filter(|plan| plan.owner == owner)
            .cloned()
            .collect();
        newest_first(&mut plans);
        Ok(plans)
    }

    async fn rate_meal_plan(&self, id: Uuid, rating: u8, notes: Option<String>) -> Result<MealPlan, StoreError> {
        check_rating(rating)?;
        let mut state = self.state.write().await;
        let plan = state
            .plans
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "meal plan", id })?;
        plan.rate(rating, notes);
        Ok(plan.clone())
    }
}
