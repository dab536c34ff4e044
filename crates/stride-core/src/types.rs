use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Goal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: GoalStatus::Active,
            area_id: None,
            target_date: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub goal_id: Option<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_urgent: bool,
    /// Minutes.
    #[serde(default)]
    pub estimated_time: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Step {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            goal_id: None,
            area_id: None,
            date: None,
            completed: false,
            is_important: false,
            is_urgent: false,
            estimated_time: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Habit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Custom,
    /// Anything else (e.g. "monthly"); only explicit dates apply.
    #[serde(other)]
    Other,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Custom => "custom",
            Frequency::Other => "other",
        }
    }
}

/// Selected weekdays as stored by older and newer clients: either a proper
/// list or a single string (comma-separated, or a JSON array encoded as text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedDays {
    List(Vec<String>),
    Text(String),
}

impl SelectedDays {
    /// Lowercased, trimmed day names.
    pub fn days(&self) -> Vec<String> {
        let raw: Vec<String> = match self {
            SelectedDays::List(days) => days.clone(),
            SelectedDays::Text(text) => {
                let trimmed = text.trim();
                match serde_json::from_str::<Vec<String>>(trimmed) {
                    Ok(days) => days,
                    Err(_) => trimmed
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .split(',')
                        .map(|d| d.trim().trim_matches('"').trim_matches('\'').to_string())
                        .collect(),
                }
            }
        };
        raw.into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub always_show: bool,
    #[serde(default)]
    pub selected_days: Option<SelectedDays>,
    #[serde(default, alias = "dates")]
    pub selected_dates: Vec<String>,
    #[serde(default)]
    pub area_id: Option<String>,
    /// Completion flags keyed by `YYYY-MM-DD`.
    #[serde(default)]
    pub completions: BTreeMap<String, bool>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            frequency: Frequency::Daily,
            always_show: false,
            selected_days: None,
            selected_dates: Vec::new(),
            area_id: None,
            completions: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completions
            .get(&date_key(date))
            .copied()
            .unwrap_or(false)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Area
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Area {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    pub goal_id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub current_value: f64,
    pub created_at: DateTime<Utc>,
}

impl Metric {
    pub fn new(id: impl Into<String>, goal_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            name: name.into(),
            unit: None,
            target_value: None,
            current_value: 0.0,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Named: shared identity for filter resolution
// ---------------------------------------------------------------------------

/// Anything a filter can target by id or by display name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($ty:ty, $field:ident) => {
        impl Named for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn name(&self) -> &str {
                &self.$field
            }
        }
    };
}

impl_named!(Goal, title);
impl_named!(Step, title);
impl_named!(Habit, name);
impl_named!(Area, name);
impl_named!(Metric, name);

// ---------------------------------------------------------------------------
// UserData: one user's full snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub areas: Vec<Area>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl UserData {
    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn area(&self, id: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// Goal title for display, falling back to the raw id.
    pub fn goal_label(&self, id: &str) -> String {
        self.goal(id)
            .map(|g| g.title.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Area name for display, falling back to the raw id.
    pub fn area_label(&self, id: &str) -> String {
        self.area(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Context: per-request facts that are not user data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub today: NaiveDate,
}

impl Context {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_days_from_list() {
        let days: SelectedDays = serde_json::from_str(r#"["Monday", " friday "]"#).unwrap();
        assert_eq!(days.days(), vec!["monday", "friday"]);
    }

    #[test]
    fn selected_days_from_comma_string() {
        let days: SelectedDays = serde_json::from_str(r#""monday, Wednesday,pátek""#).unwrap();
        assert_eq!(days.days(), vec!["monday", "wednesday", "pátek"]);
    }

    #[test]
    fn selected_days_from_encoded_array() {
        let days = SelectedDays::Text(r#"["tuesday","thursday"]"#.into());
        assert_eq!(days.days(), vec!["tuesday", "thursday"]);
    }

    #[test]
    fn unknown_frequency_maps_to_other() {
        let f: Frequency = serde_json::from_str(r#""monthly""#).unwrap();
        assert_eq!(f, Frequency::Other);
    }

    #[test]
    fn habit_accepts_dates_alias() {
        let json = r#"{
            "id": "h1",
            "name": "Yoga",
            "frequency": "custom",
            "dates": ["2026-10-17"],
            "createdAt": "2026-01-01T00:00:00Z"
        }"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.selected_dates, vec!["2026-10-17"]);
        assert!(!habit.always_show);
    }

    #[test]
    fn habit_completion_lookup() {
        let mut habit = Habit::new("h1", "Read");
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert!(!habit.is_completed_on(day));
        habit.completions.insert("2026-10-17".into(), true);
        assert!(habit.is_completed_on(day));
    }

    #[test]
    fn goal_label_falls_back_to_id() {
        let data = UserData {
            goals: vec![Goal::new("g1", "Learn Spanish")],
            ..Default::default()
        };
        assert_eq!(data.goal_label("g1"), "Learn Spanish");
        assert_eq!(data.goal_label("missing"), "missing");
    }
}
