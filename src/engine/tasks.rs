use std::{path::Path, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;

use crate::utils::clock::Clock;

use super::{
    color::task_color,
    entities::TaskEntity,
    error::{EngineError, EngineResult},
    table::TableFile,
};

/// Owns the task table. Tasks are immutable after creation apart from
/// deletion, and deletion deliberately leaves associated activities in
/// place, dangling task id included.
pub struct TaskStore {
    file: TableFile,
    clock: Arc<dyn Clock>,
    tasks: RwLock<Vec<TaskEntity>>,
}

impl TaskStore {
    pub async fn open(dir: &Path, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let file = TableFile::new(dir, "tasks.jsonl")?;
        let tasks = file.load().await?;
        Ok(Self {
            file,
            clock,
            tasks: RwLock::new(tasks),
        })
    }

    /// Creates a task with a fresh id and a color derived from that id.
    /// Names only need to be non-empty; duplicates are allowed.
    pub async fn create(&self, name: &str) -> EngineResult<TaskEntity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("Task name must not be empty"));
        }

        let mut tasks = self.tasks.write().await;
        let id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let task = TaskEntity {
            id,
            name: name.to_string(),
            color: task_color(id),
            created_at: self.clock.time(),
        };
        self.file.append(&task).await?;
        tasks.push(task.clone());
        info!("Created task {} ({})", task.id, task.name);
        Ok(task)
    }

    /// All tasks in creation order.
    pub async fn list(&self) -> Vec<TaskEntity> {
        self.tasks.read().await.clone()
    }

    pub async fn get(&self, id: u64) -> EngineResult<TaskEntity> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("Task {id} not found")))
    }

    pub async fn delete(&self, id: u64) -> EngineResult<()> {
        let mut tasks = self.tasks.write().await;
        let Some(position) = tasks.iter().position(|t| t.id == id) else {
            return Err(EngineError::not_found(format!("Task {id} not found")));
        };
        let mut remaining = tasks.clone();
        remaining.remove(position);
        self.file.rewrite(&remaining).await?;
        *tasks = remaining;
        info!("Deleted task {id}");
        Ok(())
    }
}
