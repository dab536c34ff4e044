//! Data-access collaborator: single-entity reads and mutations scoped to
//! one user.

pub mod memory;
pub mod ops;
pub mod yaml;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::payload::{AreaPatch, GoalPatch, HabitPatch, MetricPatch, StepPatch};
use crate::types::{Area, Goal, Habit, Metric, Step, UserData};

pub use memory::MemoryStore;
pub use yaml::YamlStore;

/// Every call is an independent single-entity operation. Callers must not
/// assume atomicity across calls.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>>;
    async fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>>;
    async fn list_areas(&self, user_id: &str) -> Result<Vec<Area>>;
    async fn list_steps(&self, user_id: &str) -> Result<Vec<Step>>;
    async fn list_metrics(&self, user_id: &str) -> Result<Vec<Metric>>;

    async fn create_goal(&self, user_id: &str, goal: Goal) -> Result<Goal>;
    async fn create_step(&self, user_id: &str, step: Step) -> Result<Step>;
    async fn create_habit(&self, user_id: &str, habit: Habit) -> Result<Habit>;
    async fn create_area(&self, user_id: &str, area: Area) -> Result<Area>;
    async fn create_metric(&self, user_id: &str, metric: Metric) -> Result<Metric>;

    async fn update_goal(&self, user_id: &str, id: &str, patch: &GoalPatch) -> Result<Goal>;
    async fn update_step(&self, user_id: &str, id: &str, patch: &StepPatch) -> Result<Step>;
    async fn update_habit(&self, user_id: &str, id: &str, patch: &HabitPatch) -> Result<Habit>;
    async fn update_area(&self, user_id: &str, id: &str, patch: &AreaPatch) -> Result<Area>;
    async fn update_metric(&self, user_id: &str, id: &str, patch: &MetricPatch)
        -> Result<Metric>;

    async fn complete_goal(&self, user_id: &str, id: &str) -> Result<Goal>;
    async fn set_step_completed(&self, user_id: &str, id: &str, completed: bool) -> Result<Step>;

    /// Flip the completion flag for `(habit, date)` and return the new state.
    async fn toggle_habit_completion(
        &self,
        user_id: &str,
        habit_id: &str,
        date: NaiveDate,
    ) -> Result<bool>;
}

/// Fetch the five collections concurrently and join them into a snapshot.
pub async fn load_user_data(store: &dyn Store, user_id: &str) -> Result<UserData> {
    let (goals, habits, areas, steps, metrics) = futures::try_join!(
        store.list_goals(user_id),
        store.list_habits(user_id),
        store.list_areas(user_id),
        store.list_steps(user_id),
        store.list_metrics(user_id),
    )?;
    Ok(UserData {
        goals,
        habits,
        areas,
        steps,
        metrics,
    })
}

/// Fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
