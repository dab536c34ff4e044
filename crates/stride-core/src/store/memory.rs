use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{ops, Store};
use crate::error::Result;
use crate::payload::{AreaPatch, GoalPatch, HabitPatch, MetricPatch, StepPatch};
use crate::types::{Area, Goal, Habit, Metric, Named, Step, UserData};

/// Process-local store keyed by user id. Unknown users read as empty.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserData>>,
    #[cfg(test)]
    faults: faults::Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's data, replacing whatever was there.
    pub async fn insert_user(&self, user_id: &str, data: UserData) {
        self.users.write().await.insert(user_id.to_string(), data);
    }

    pub async fn snapshot(&self, user_id: &str) -> UserData {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every later mutation touching an entity with this display name fails.
    #[cfg(test)]
    pub fn fail_on(&self, name: impl Into<String>) {
        self.faults.fail_on(name.into());
    }

    /// Number of mutation calls received, including failed ones.
    #[cfg(test)]
    pub fn mutation_count(&self) -> usize {
        self.faults.mutation_count()
    }

    #[cfg(test)]
    fn check(&self, name: &str) -> Result<()> {
        self.faults.check(name)
    }

    #[cfg(not(test))]
    fn check(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn read<T>(&self, user_id: &str, f: impl FnOnce(&UserData) -> T) -> T {
        let users = self.users.read().await;
        match users.get(user_id) {
            Some(data) => f(data),
            None => f(&UserData::default()),
        }
    }

    async fn write<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserData) -> Result<T>,
    ) -> Result<T> {
        #[cfg(test)]
        self.faults.record();
        let mut users = self.users.write().await;
        f(users.entry(user_id.to_string()).or_default())
    }

    /// Fault check against the current name of an existing entity.
    fn check_existing<T: Named>(&self, items: &[T], id: &str) -> Result<()> {
        match items.iter().find(|i| i.id() == id) {
            Some(item) => self.check(item.name()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        Ok(self.read(user_id, |d| d.goals.clone()).await)
    }

    async fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        Ok(self.read(user_id, |d| d.habits.clone()).await)
    }

    async fn list_areas(&self, user_id: &str) -> Result<Vec<Area>> {
        Ok(self.read(user_id, |d| d.areas.clone()).await)
    }

    async fn list_steps(&self, user_id: &str) -> Result<Vec<Step>> {
        Ok(self.read(user_id, |d| d.steps.clone()).await)
    }

    async fn list_metrics(&self, user_id: &str) -> Result<Vec<Metric>> {
        Ok(self.read(user_id, |d| d.metrics.clone()).await)
    }

    async fn create_goal(&self, user_id: &str, goal: Goal) -> Result<Goal> {
        self.write(user_id, |d| {
            self.check(&goal.title)?;
            d.goals.push(goal.clone());
            Ok(goal)
        })
        .await
    }

    async fn create_step(&self, user_id: &str, step: Step) -> Result<Step> {
        self.write(user_id, |d| {
            self.check(&step.title)?;
            d.steps.push(step.clone());
            Ok(step)
        })
        .await
    }

    async fn create_habit(&self, user_id: &str, habit: Habit) -> Result<Habit> {
        self.write(user_id, |d| {
            self.check(&habit.name)?;
            d.habits.push(habit.clone());
            Ok(habit)
        })
        .await
    }

    async fn create_area(&self, user_id: &str, area: Area) -> Result<Area> {
        self.write(user_id, |d| {
            self.check(&area.name)?;
            d.areas.push(area.clone());
            Ok(area)
        })
        .await
    }

    async fn create_metric(&self, user_id: &str, metric: Metric) -> Result<Metric> {
        self.write(user_id, |d| {
            self.check(&metric.name)?;
            ops::check_metric_goal(d, &metric.goal_id)?;
            d.metrics.push(metric.clone());
            Ok(metric)
        })
        .await
    }

    async fn update_goal(&self, user_id: &str, id: &str, patch: &GoalPatch) -> Result<Goal> {
        self.write(user_id, |d| {
            self.check_existing(&d.goals, id)?;
            ops::update_goal(d, id, patch)
        })
        .await
    }

    async fn update_step(&self, user_id: &str, id: &str, patch: &StepPatch) -> Result<Step> {
        self.write(user_id, |d| {
            self.check_existing(&d.steps, id)?;
            ops::update_step(d, id, patch)
        })
        .await
    }

    async fn update_habit(&self, user_id: &str, id: &str, patch: &HabitPatch) -> Result<Habit> {
        self.write(user_id, |d| {
            self.check_existing(&d.habits, id)?;
            ops::update_habit(d, id, patch)
        })
        .await
    }

    async fn update_area(&self, user_id: &str, id: &str, patch: &AreaPatch) -> Result<Area> {
        self.write(user_id, |d| {
            self.check_existing(&d.areas, id)?;
            ops::update_area(d, id, patch)
        })
        .await
    }

    async fn update_metric(
        &self,
        user_id: &str,
        id: &str,
        patch: &MetricPatch,
    ) -> Result<Metric> {
        self.write(user_id, |d| {
            self.check_existing(&d.metrics, id)?;
            ops::update_metric(d, id, patch)
        })
        .await
    }

    async fn complete_goal(&self, user_id: &str, id: &str) -> Result<Goal> {
        self.write(user_id, |d| {
            self.check_existing(&d.goals, id)?;
            ops::complete_goal(d, id)
        })
        .await
    }

    async fn set_step_completed(&self, user_id: &str, id: &str, completed: bool) -> Result<Step> {
        self.write(user_id, |d| {
            self.check_existing(&d.steps, id)?;
            ops::set_step_completed(d, id, completed)
        })
        .await
    }

    async fn toggle_habit_completion(
        &self,
        user_id: &str,
        habit_id: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        self.write(user_id, |d| {
            self.check_existing(&d.habits, habit_id)?;
            ops::toggle_habit_completion(d, habit_id, date)
        })
        .await
    }
}

#[cfg(test)]
mod faults {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::error::{Result, StrideError};

    #[derive(Debug, Default)]
    pub(super) struct Faults {
        failing: Mutex<HashSet<String>>,
        mutations: AtomicUsize,
    }

    impl Faults {
        pub(super) fn fail_on(&self, name: String) {
            if let Ok(mut failing) = self.failing.lock() {
                failing.insert(name);
            }
        }

        pub(super) fn record(&self) {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }

        pub(super) fn mutation_count(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        pub(super) fn check(&self, name: &str) -> Result<()> {
            let failing = self
                .failing
                .lock()
                .map_err(|_| StrideError::Store("fault list poisoned".into()))?;
            if failing.contains(name) {
                return Err(StrideError::Store(format!("simulated failure for '{name}'")));
            }
            Ok(())
        }
    }
}
