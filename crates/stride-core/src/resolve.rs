//! Filter resolution against a user-data snapshot. Exact id or exact
//! (case-insensitive) name only; fuzzy matching lives in the matcher.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::instruction::{EntityKind, Filter};
use crate::schedule::is_scheduled_for_day;
use crate::types::{Area, Goal, GoalStatus, Habit, Named, Step, UserData};

/// Compact reference to a resolved entity, as shown in previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: String,
    pub name: String,
}

impl TargetRef {
    pub fn of<T: Named>(item: &T) -> Self {
        Self {
            id: item.id().to_string(),
            name: item.name().to_string(),
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Every item the filter selects, in snapshot order. Unknown kinds select nothing.
pub fn resolve_all<'a, T: Named>(filter: &Filter, items: &'a [T]) -> Vec<&'a T> {
    match filter {
        Filter::All => items.iter().collect(),
        Filter::Ids { values } => items
            .iter()
            .filter(|i| values.iter().any(|v| v.trim() == i.id()))
            .collect(),
        Filter::Names { values } => items
            .iter()
            .filter(|i| values.iter().any(|v| same_name(v, i.name())))
            .collect(),
        Filter::Unknown => Vec::new(),
    }
}

/// The first item matching the first usable filter value.
pub fn resolve_one<'a, T: Named>(filter: &Filter, items: &'a [T]) -> Option<&'a T> {
    match filter {
        Filter::Ids { values } => values
            .iter()
            .find_map(|v| items.iter().find(|i| v.trim() == i.id())),
        Filter::Names { values } => values
            .iter()
            .find_map(|v| items.iter().find(|i| same_name(v, i.name()))),
        Filter::All | Filter::Unknown => None,
    }
}

/// Human description of what a filter asked for, for not-found messages.
pub fn describe_filter(filter: &Filter) -> String {
    match filter {
        Filter::All => "vše".to_string(),
        Filter::Ids { values } | Filter::Names { values } => {
            crate::wording::quoted_list(values.iter().map(String::as_str))
        }
        Filter::Unknown => "neznámý filtr".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Habit candidates
// ---------------------------------------------------------------------------

/// The two candidate sets for a habit completion.
#[derive(Debug, Clone)]
pub struct HabitCandidates<'a> {
    pub all: Vec<&'a Habit>,
    pub scheduled: Vec<&'a Habit>,
}

impl HabitCandidates<'_> {
    /// The user has to pick between the sets only when they differ.
    pub fn requires_choice(&self) -> bool {
        self.all.len() != self.scheduled.len()
    }
}

pub fn habit_candidates<'a>(
    filter: &Filter,
    habits: &'a [Habit],
    date: NaiveDate,
) -> HabitCandidates<'a> {
    let all = resolve_all(filter, habits);
    let scheduled = all
        .iter()
        .copied()
        .filter(|h| is_scheduled_for_day(h, date))
        .collect();
    HabitCandidates { all, scheduled }
}

// ---------------------------------------------------------------------------
// Step and goal completion targets
// ---------------------------------------------------------------------------

/// Open steps a completion selects. With the `all` filter and a date, only
/// steps planned for that date are taken.
pub fn step_targets<'a>(filter: &Filter, steps: &'a [Step], date: Option<NaiveDate>) -> Vec<&'a Step> {
    resolve_all(filter, steps)
        .into_iter()
        .filter(|s| !s.completed)
        .filter(|s| match (filter, date) {
            (Filter::All, Some(day)) => s.date == Some(day),
            _ => true,
        })
        .collect()
}

/// Goals a completion selects, skipping those already completed.
pub fn goal_targets<'a>(filter: &Filter, goals: &'a [Goal]) -> Vec<&'a Goal> {
    resolve_all(filter, goals)
        .into_iter()
        .filter(|g| g.status != GoalStatus::Completed)
        .collect()
}

/// A goal referenced from a data field: by id first, then by exact title.
pub fn goal_ref<'a>(key: &str, goals: &'a [Goal]) -> Option<&'a Goal> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    goals
        .iter()
        .find(|g| g.id == key)
        .or_else(|| goals.iter().find(|g| same_name(&g.title, key)))
}

/// An area referenced from a data field: by id first, then by exact name.
pub fn area_ref<'a>(key: &str, areas: &'a [Area]) -> Option<&'a Area> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    areas
        .iter()
        .find(|a| a.id == key)
        .or_else(|| areas.iter().find(|a| same_name(&a.name, key)))
}

// ---------------------------------------------------------------------------
// Link fields
// ---------------------------------------------------------------------------

/// A `goalId` or `areaId` value that names nothing in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingLink {
    pub target: EntityKind,
    pub value: String,
}

impl std::fmt::Display for DanglingLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.target, self.value)
    }
}

/// Rewrite the link fields of a command to canonical ids. Blank values are
/// left for the store to drop; anything else must resolve.
pub fn resolve_links(command: &mut Command, data: &UserData) -> Result<(), DanglingLink> {
    let goal = |slot: &mut Option<String>| link(slot, EntityKind::Goal, |k| {
        goal_ref(k, &data.goals).map(|g| g.id.clone())
    });
    let area = |slot: &mut Option<String>| link(slot, EntityKind::Area, |k| {
        area_ref(k, &data.areas).map(|a| a.id.clone())
    });

    match command {
        Command::CreateGoal(d) => area(&mut d.area_id),
        Command::CreateStep(d) => {
            goal(&mut d.goal_id)?;
            area(&mut d.area_id)
        }
        Command::CreateHabit(d) => area(&mut d.area_id),
        Command::UpdateGoal(_, p) => p.area_id.as_mut().map_or(Ok(()), area),
        Command::UpdateStep(_, p) => {
            p.goal_id.as_mut().map_or(Ok(()), goal)?;
            p.area_id.as_mut().map_or(Ok(()), area)
        }
        Command::UpdateHabit(_, p) => p.area_id.as_mut().map_or(Ok(()), area),
        Command::UpdateMetric(_, p) => goal(&mut p.goal_id),
        _ => Ok(()),
    }
}

fn link(
    slot: &mut Option<String>,
    target: EntityKind,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), DanglingLink> {
    let Some(value) = slot.as_deref().filter(|v| !v.trim().is_empty()) else {
        return Ok(());
    };
    match lookup(value) {
        Some(id) => {
            *slot = Some(id);
            Ok(())
        }
        None => Err(DanglingLink {
            target,
            value: value.trim().to_string(),
        }),
    }
}
