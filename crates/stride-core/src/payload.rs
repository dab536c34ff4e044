//! Typed `data` payloads for create (drafts) and update (patches).
//!
//! Patches follow partial-update semantics: an absent key leaves the stored
//! value alone. For nullable fields an explicit `null` clears the value.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Area, Frequency, Goal, GoalStatus, Habit, Metric, SelectedDays, Step};

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Decoders that accept the shapes the oracle tends to produce: numbers as
/// strings, timestamps where dates are expected, "yes"/"ano" for booleans.
pub(crate) mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let trimmed = raw.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                chrono::DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
            .or_else(|| {
                trimmed
                    .get(..10)
                    .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
            })
    }

    fn value_to_date<E: serde::de::Error>(v: Value) -> Result<Option<NaiveDate>, E> {
        match v {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| E::custom(format!("invalid date '{s}'"))),
            other => Err(E::custom(format!("expected a date, got {other}"))),
        }
    }

    fn value_to_f64<E: serde::de::Error>(v: Value) -> Result<Option<f64>, E> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid number '{s}'"))),
            other => Err(E::custom(format!("expected a number, got {other}"))),
        }
    }

    fn value_to_bool<E: serde::de::Error>(v: Value) -> Result<Option<bool>, E> {
        match v {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "ano" | "1" => Ok(Some(true)),
                "false" | "no" | "ne" | "0" | "" => Ok(Some(false)),
                _ => Err(E::custom(format!("invalid boolean '{s}'"))),
            },
            Value::Number(n) => Ok(Some(n.as_f64().unwrap_or(0.0) != 0.0)),
            other => Err(E::custom(format!("expected a boolean, got {other}"))),
        }
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        value_to_date(Value::deserialize(d)?)
    }

    pub fn date_patch<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<NaiveDate>>, D::Error> {
        date(d).map(Some)
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        value_to_f64(Value::deserialize(d)?)
    }

    pub fn number_patch<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<f64>>, D::Error> {
        number(d).map(Some)
    }

    pub fn minutes<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(number(d)?.map(|n| n.max(0.0).round() as u32))
    }

    pub fn minutes_patch<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<u32>>, D::Error> {
        minutes(d).map(Some)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        value_to_bool(Value::deserialize(d)?)
    }

    /// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
    pub fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(d).map(Some)
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected text, got {other}"
            ))),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let t = v.trim();
        (!t.is_empty()).then(|| t.to_string())
    })
}

// ---------------------------------------------------------------------------
// Drafts (create)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDraft {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub area_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub target_date: Option<NaiveDate>,
}

impl GoalDraft {
    pub fn into_goal(self, id: String) -> Goal {
        let mut goal = Goal::new(id, self.title.unwrap_or_default());
        goal.description = blank_to_none(self.description);
        goal.area_id = blank_to_none(self.area_id);
        goal.target_date = self.target_date;
        goal
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDraft {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub area_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_important: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_urgent: Option<bool>,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub estimated_time: Option<u32>,
}

impl StepDraft {
    pub fn into_step(self, id: String) -> Step {
        let mut step = Step::new(id, self.title.unwrap_or_default());
        step.description = blank_to_none(self.description);
        step.goal_id = blank_to_none(self.goal_id);
        step.area_id = blank_to_none(self.area_id);
        step.date = self.date;
        step.is_important = self.is_important.unwrap_or(false);
        step.is_urgent = self.is_urgent.unwrap_or(false);
        step.estimated_time = self.estimated_time;
        step
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDraft {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub always_show: Option<bool>,
    #[serde(default)]
    pub selected_days: Option<SelectedDays>,
    #[serde(default, alias = "dates")]
    pub selected_dates: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub area_id: Option<String>,
}

impl HabitDraft {
    pub fn into_habit(self, id: String) -> Habit {
        let mut habit = Habit::new(id, self.name.unwrap_or_default());
        habit.description = blank_to_none(self.description);
        habit.frequency = self.frequency.unwrap_or_default();
        habit.always_show = self.always_show.unwrap_or(false);
        habit.selected_days = self.selected_days;
        habit.selected_dates = self.selected_dates.unwrap_or_default();
        habit.area_id = blank_to_none(self.area_id);
        habit
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDraft {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub icon: Option<String>,
}

impl AreaDraft {
    pub fn into_area(self, id: String) -> Area {
        let mut area = Area::new(id, self.name.unwrap_or_default());
        area.description = blank_to_none(self.description);
        area.color = blank_to_none(self.color);
        area.icon = blank_to_none(self.icon);
        area
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDraft {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub target_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_value: Option<f64>,
}

impl MetricDraft {
    /// `goal_id` must be resolved by the caller; a metric always belongs to a goal.
    pub fn into_metric(self, id: String, goal_id: String) -> Metric {
        let mut metric = Metric::new(id, goal_id, self.name.unwrap_or_default());
        metric.unit = blank_to_none(self.unit);
        metric.target_value = self.target_value;
        metric.current_value = self.current_value.unwrap_or(0.0);
        metric
    }
}

// ---------------------------------------------------------------------------
// Patches (update)
// ---------------------------------------------------------------------------

/// One field that an update would change, for preview rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FieldChange {
    fn new(field: &str, from: Option<String>, to: Option<String>) -> Self {
        Self {
            field: field.to_string(),
            from,
            to,
        }
    }
}

/// Push a change only when the value actually differs.
fn diff_field<T: PartialEq + ToString>(
    out: &mut Vec<FieldChange>,
    field: &str,
    current: Option<&T>,
    proposed: Option<&T>,
) {
    if current != proposed {
        out.push(FieldChange::new(
            field,
            current.map(ToString::to_string),
            proposed.map(ToString::to_string),
        ));
    }
}

fn apply_nullable<T: Clone>(slot: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *slot = value.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<GoalStatus>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub area_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::date_patch")]
    pub target_date: Option<Option<NaiveDate>>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, goal: &mut Goal) {
        if let Some(title) = blank_to_none(self.title.clone()) {
            goal.title = title;
        }
        apply_nullable(&mut goal.description, &self.description);
        if let Some(status) = self.status {
            goal.status = status;
        }
        apply_nullable(&mut goal.area_id, &self.area_id);
        apply_nullable(&mut goal.target_date, &self.target_date);
    }

    pub fn diff(&self, goal: &Goal) -> Vec<FieldChange> {
        let mut next = goal.clone();
        self.apply(&mut next);
        let mut out = Vec::new();
        diff_field(&mut out, "title", Some(&goal.title), Some(&next.title));
        diff_field(&mut out, "description", goal.description.as_ref(), next.description.as_ref());
        diff_field(&mut out, "status", Some(&goal.status), Some(&next.status));
        diff_field(&mut out, "areaId", goal.area_id.as_ref(), next.area_id.as_ref());
        diff_field(&mut out, "targetDate", goal.target_date.as_ref(), next.target_date.as_ref());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub goal_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub area_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::date_patch")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_important: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_urgent: Option<bool>,
    #[serde(default, deserialize_with = "lenient::minutes_patch")]
    pub estimated_time: Option<Option<u32>>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: Option<bool>,
}

impl StepPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, step: &mut Step) {
        if let Some(title) = blank_to_none(self.title.clone()) {
            step.title = title;
        }
        apply_nullable(&mut step.description, &self.description);
        apply_nullable(&mut step.goal_id, &self.goal_id);
        apply_nullable(&mut step.area_id, &self.area_id);
        apply_nullable(&mut step.date, &self.date);
        if let Some(v) = self.is_important {
            step.is_important = v;
        }
        if let Some(v) = self.is_urgent {
            step.is_urgent = v;
        }
        apply_nullable(&mut step.estimated_time, &self.estimated_time);
        if let Some(done) = self.completed {
            if done && !step.completed {
                step.completed_at = Some(chrono::Utc::now());
            } else if !done {
                step.completed_at = None;
            }
            step.completed = done;
        }
    }

    pub fn diff(&self, step: &Step) -> Vec<FieldChange> {
        let mut next = step.clone();
        self.apply(&mut next);
        let mut out = Vec::new();
        diff_field(&mut out, "title", Some(&step.title), Some(&next.title));
        diff_field(&mut out, "description", step.description.as_ref(), next.description.as_ref());
        diff_field(&mut out, "goalId", step.goal_id.as_ref(), next.goal_id.as_ref());
        diff_field(&mut out, "areaId", step.area_id.as_ref(), next.area_id.as_ref());
        diff_field(&mut out, "date", step.date.as_ref(), next.date.as_ref());
        diff_field(&mut out, "isImportant", Some(&step.is_important), Some(&next.is_important));
        diff_field(&mut out, "isUrgent", Some(&step.is_urgent), Some(&next.is_urgent));
        diff_field(
            &mut out,
            "estimatedTime",
            step.estimated_time.as_ref(),
            next.estimated_time.as_ref(),
        );
        diff_field(&mut out, "completed", Some(&step.completed), Some(&next.completed));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub always_show: Option<bool>,
    #[serde(default)]
    pub selected_days: Option<SelectedDays>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub area_id: Option<Option<String>>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, habit: &mut Habit) {
        if let Some(name) = blank_to_none(self.name.clone()) {
            habit.name = name;
        }
        apply_nullable(&mut habit.description, &self.description);
        if let Some(f) = self.frequency {
            habit.frequency = f;
        }
        if let Some(v) = self.always_show {
            habit.always_show = v;
        }
        if let Some(days) = &self.selected_days {
            habit.selected_days = Some(days.clone());
        }
        apply_nullable(&mut habit.area_id, &self.area_id);
    }

    pub fn diff(&self, habit: &Habit) -> Vec<FieldChange> {
        let mut next = habit.clone();
        self.apply(&mut next);
        let days = |h: &Habit| h.selected_days.as_ref().map(|d| d.days().join(", "));
        let mut out = Vec::new();
        diff_field(&mut out, "name", Some(&habit.name), Some(&next.name));
        diff_field(&mut out, "description", habit.description.as_ref(), next.description.as_ref());
        diff_field(
            &mut out,
            "frequency",
            Some(&habit.frequency.as_str()),
            Some(&next.frequency.as_str()),
        );
        diff_field(&mut out, "alwaysShow", Some(&habit.always_show), Some(&next.always_show));
        diff_field(&mut out, "selectedDays", days(habit).as_ref(), days(&next).as_ref());
        diff_field(&mut out, "areaId", habit.area_id.as_ref(), next.area_id.as_ref());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub icon: Option<Option<String>>,
}

impl AreaPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, area: &mut Area) {
        if let Some(name) = blank_to_none(self.name.clone()) {
            area.name = name;
        }
        apply_nullable(&mut area.description, &self.description);
        apply_nullable(&mut area.color, &self.color);
        apply_nullable(&mut area.icon, &self.icon);
    }

    pub fn diff(&self, area: &Area) -> Vec<FieldChange> {
        let mut next = area.clone();
        self.apply(&mut next);
        let mut out = Vec::new();
        diff_field(&mut out, "name", Some(&area.name), Some(&next.name));
        diff_field(&mut out, "description", area.description.as_ref(), next.description.as_ref());
        diff_field(&mut out, "color", area.color.as_ref(), next.color.as_ref());
        diff_field(&mut out, "icon", area.icon.as_ref(), next.icon.as_ref());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPatch {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::nullable")]
    pub unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "lenient::number_patch")]
    pub target_value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_value: Option<f64>,
}

impl MetricPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, metric: &mut Metric) {
        if let Some(name) = blank_to_none(self.name.clone()) {
            metric.name = name;
        }
        if let Some(goal_id) = blank_to_none(self.goal_id.clone()) {
            metric.goal_id = goal_id;
        }
        apply_nullable(&mut metric.unit, &self.unit);
        apply_nullable(&mut metric.target_value, &self.target_value);
        if let Some(v) = self.current_value {
            metric.current_value = v;
        }
    }

    pub fn diff(&self, metric: &Metric) -> Vec<FieldChange> {
        let mut next = metric.clone();
        self.apply(&mut next);
        let mut out = Vec::new();
        diff_field(&mut out, "name", Some(&metric.name), Some(&next.name));
        diff_field(&mut out, "goalId", Some(&metric.goal_id), Some(&next.goal_id));
        diff_field(&mut out, "unit", metric.unit.as_ref(), next.unit.as_ref());
        diff_field(&mut out, "targetValue", metric.target_value.as_ref(), next.target_value.as_ref());
        diff_field(
            &mut out,
            "currentValue",
            Some(&metric.current_value),
            Some(&next.current_value),
        );
        out
    }
}
