use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::{ops, Store};
use crate::error::{Result, StrideError};
use crate::io::atomic_write;
use crate::paths::user_data_path;
use crate::payload::{AreaPatch, GoalPatch, HabitPatch, MetricPatch, StepPatch};
use crate::types::{Area, Goal, Habit, Metric, Step, UserData};

/// One YAML document per user under `.stride/users/`. Every mutation is a
/// read-modify-write of that document on a blocking thread.
#[derive(Debug)]
pub struct YamlStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read<T, F>(&self, user_id: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(UserData) -> T + Send + 'static,
    {
        let path = user_data_path(&self.root, user_id);
        tokio::task::spawn_blocking(move || load(&path).map(f))
            .await
            .map_err(|e| StrideError::Join(e.to_string()))?
    }

    async fn write<T, F>(&self, user_id: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut UserData) -> Result<T> + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = user_data_path(&self.root, user_id);
        tokio::task::spawn_blocking(move || {
            let mut data = load(&path)?;
            let out = f(&mut data)?;
            atomic_write(&path, serde_yaml::to_string(&data)?.as_bytes())?;
            Ok(out)
        })
        .await
        .map_err(|e| StrideError::Join(e.to_string()))?
    }
}

/// A missing document is an empty user.
fn load(path: &Path) -> Result<UserData> {
    if !path.exists() {
        return Ok(UserData::default());
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(UserData::default());
    }
    Ok(serde_yaml::from_str(&text)?)
}

#[async_trait]
impl Store for YamlStore {
    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.read(user_id, |d| d.goals).await
    }

    async fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.read(user_id, |d| d.habits).await
    }

    async fn list_areas(&self, user_id: &str) -> Result<Vec<Area>> {
        self.read(user_id, |d| d.areas).await
    }

    async fn list_steps(&self, user_id: &str) -> Result<Vec<Step>> {
        self.read(user_id, |d| d.steps).await
    }

    async fn list_metrics(&self, user_id: &str) -> Result<Vec<Metric>> {
        self.read(user_id, |d| d.metrics).await
    }

    async fn create_goal(&self, user_id: &str, goal: Goal) -> Result<Goal> {
        self.write(user_id, move |d| {
            d.goals.push(goal.clone());
            Ok(goal)
        })
        .await
    }

    async fn create_step(&self, user_id: &str, step: Step) -> Result<Step> {
        self.write(user_id, move |d| {
            d.steps.push(step.clone());
            Ok(step)
        })
        .await
    }

    async fn create_habit(&self, user_id: &str, habit: Habit) -> Result<Habit> {
        self.write(user_id, move |d| {
            d.habits.push(habit.clone());
            Ok(habit)
        })
        .await
    }

    async fn create_area(&self, user_id: &str, area: Area) -> Result<Area> {
        self.write(user_id, move |d| {
            d.areas.push(area.clone());
            Ok(area)
        })
        .await
    }

    async fn create_metric(&self, user_id: &str, metric: Metric) -> Result<Metric> {
        self.write(user_id, move |d| {
            ops::check_metric_goal(d, &metric.goal_id)?;
            d.metrics.push(metric.clone());
            Ok(metric)
        })
        .await
    }

    async fn update_goal(&self, user_id: &str, id: &str, patch: &GoalPatch) -> Result<Goal> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.write(user_id, move |d| ops::update_goal(d, &id, &patch))
            .await
    }

    async fn update_step(&self, user_id: &str, id: &str, patch: &StepPatch) -> Result<Step> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.write(user_id, move |d| ops::update_step(d, &id, &patch))
            .await
    }

    async fn update_habit(&self, user_id: &str, id: &str, patch: &HabitPatch) -> Result<Habit> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.write(user_id, move |d| ops::update_habit(d, &id, &patch))
            .await
    }

    async fn update_area(&self, user_id: &str, id: &str, patch: &AreaPatch) -> Result<Area> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.write(user_id, move |d| ops::update_area(d, &id, &patch))
            .await
    }

    async fn update_metric(
        &self,
        user_id: &str,
        id: &str,
        patch: &MetricPatch,
    ) -> Result<Metric> {
        let (id, patch) = (id.to_string(), patch.clone());
        self.write(user_id, move |d| ops::update_metric(d, &id, &patch))
            .await
    }

    async fn complete_goal(&self, user_id: &str, id: &str) -> Result<Goal> {
        let id = id.to_string();
        self.write(user_id, move |d| ops::complete_goal(d, &id)).await
    }

    async fn set_step_completed(&self, user_id: &str, id: &str, completed: bool) -> Result<Step> {
        let id = id.to_string();
        self.write(user_id, move |d| ops::set_step_completed(d, &id, completed))
            .await
    }

    async fn toggle_habit_completion(
        &self,
        user_id: &str,
        habit_id: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        let id = habit_id.to_string();
        self.write(user_id, move |d| ops::toggle_habit_completion(d, &id, date))
            .await
    }
}
