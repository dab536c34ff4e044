//! Mutations over one user's in-memory snapshot, shared by every store
//! implementation.

use chrono::{NaiveDate, Utc};

use crate::error::{Result, StrideError};
use crate::payload::{AreaPatch, GoalPatch, HabitPatch, MetricPatch, StepPatch};
use crate::types::{date_key, Goal, GoalStatus, Step, UserData};

fn not_found(entity: &'static str, id: &str) -> StrideError {
    StrideError::EntityNotFound {
        entity,
        id: id.to_string(),
    }
}

macro_rules! find_mut {
    ($items:expr, $entity:literal, $id:expr) => {
        $items
            .iter_mut()
            .find(|item| item.id == $id)
            .ok_or_else(|| not_found($entity, $id))
    };
}

pub fn update_goal(data: &mut UserData, id: &str, patch: &GoalPatch) -> Result<Goal> {
    let goal = find_mut!(data.goals, "goal", id)?;
    patch.apply(goal);
    Ok(goal.clone())
}

pub fn update_step(data: &mut UserData, id: &str, patch: &StepPatch) -> Result<Step> {
    let step = find_mut!(data.steps, "step", id)?;
    patch.apply(step);
    Ok(step.clone())
}

pub fn update_habit(
    data: &mut UserData,
    id: &str,
    patch: &HabitPatch,
) -> Result<crate::types::Habit> {
    let habit = find_mut!(data.habits, "habit", id)?;
    patch.apply(habit);
    Ok(habit.clone())
}

pub fn update_area(data: &mut UserData, id: &str, patch: &AreaPatch) -> Result<crate::types::Area> {
    let area = find_mut!(data.areas, "area", id)?;
    patch.apply(area);
    Ok(area.clone())
}

pub fn update_metric(
    data: &mut UserData,
    id: &str,
    patch: &MetricPatch,
) -> Result<crate::types::Metric> {
    if let Some(goal_id) = patch.goal_id.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        check_metric_goal(data, goal_id)?;
    }
    let metric = find_mut!(data.metrics, "metric", id)?;
    patch.apply(metric);
    Ok(metric.clone())
}

pub fn complete_goal(data: &mut UserData, id: &str) -> Result<Goal> {
    let goal = find_mut!(data.goals, "goal", id)?;
    goal.status = GoalStatus::Completed;
    Ok(goal.clone())
}

pub fn set_step_completed(data: &mut UserData, id: &str, completed: bool) -> Result<Step> {
    let step = find_mut!(data.steps, "step", id)?;
    if completed && !step.completed {
        step.completed_at = Some(Utc::now());
    } else if !completed {
        step.completed_at = None;
    }
    step.completed = completed;
    Ok(step.clone())
}

pub fn toggle_habit_completion(data: &mut UserData, habit_id: &str, date: NaiveDate) -> Result<bool> {
    let habit = find_mut!(data.habits, "habit", habit_id)?;
    let key = date_key(date);
    let next = !habit.completions.get(&key).copied().unwrap_or(false);
    if next {
        habit.completions.insert(key, true);
    } else {
        habit.completions.remove(&key);
    }
    Ok(next)
}

/// A metric must point at an existing goal.
pub fn check_metric_goal(data: &UserData, goal_id: &str) -> Result<()> {
    if data.goal(goal_id).is_none() {
        return Err(not_found("goal", goal_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Habit, Metric};

    fn data() -> UserData {
        UserData {
            goals: vec![Goal::new("g1", "Learn Spanish")],
            steps: vec![Step::new("s1", "Call dentist")],
            habits: vec![Habit::new("h1", "Read")],
            ..Default::default()
        }
    }

    #[test]
    fn toggle_flips_completion() {
        let mut d = data();
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert!(toggle_habit_completion(&mut d, "h1", day).unwrap());
        assert!(d.habits[0].is_completed_on(day));
        assert!(!toggle_habit_completion(&mut d, "h1", day).unwrap());
        assert!(!d.habits[0].is_completed_on(day));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut d = data();
        let err = complete_goal(&mut d, "nope").unwrap_err();
        assert!(matches!(err, StrideError::EntityNotFound { entity: "goal", .. }));
    }

    #[test]
    fn step_completion_sets_timestamp() {
        let mut d = data();
        let step = set_step_completed(&mut d, "s1", true).unwrap();
        assert!(step.completed);
        assert!(step.completed_at.is_some());
        let step = set_step_completed(&mut d, "s1", false).unwrap();
        assert!(step.completed_at.is_none());
    }

    #[test]
    fn metric_goal_must_exist() {
        let d = data();
        assert!(check_metric_goal(&d, "g1").is_ok());
        assert!(check_metric_goal(&d, "g9").is_err());
    }

    #[test]
    fn metric_cannot_move_to_missing_goal() {
        let mut d = data();
        d.metrics.push(Metric::new("m1", "g1", "Lekce"));
        let patch = MetricPatch {
            goal_id: Some("g404".into()),
            ..Default::default()
        };
        let err = update_metric(&mut d, "m1", &patch).unwrap_err();
        assert!(matches!(err, StrideError::EntityNotFound { entity: "goal", .. }));
        assert_eq!(d.metrics[0].goal_id, "g1");
    }
}
