//! Oracle prompt rendering: the instruction schema, today's date, and the
//! user's data as fixed-width tables.

use chrono::NaiveDate;

use crate::instruction::Instruction;
use crate::schedule::is_scheduled_for_day;
use crate::types::{date_key, Frequency, Habit, UserData};

/// Fixed-width text table. Widths are measured in characters, not bytes.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{cell:w$}")
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.iter().map(|h| h.to_string()).collect()));
    out.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        out.push(line(row.clone()));
    }
    out.join("\n")
}

pub fn system_prompt(today: NaiveDate) -> String {
    format!(
        r#"You are a planning assistant. Turn the user's request into structured instructions over their goals, steps, habits, areas and metrics.

Today is {today} ({weekday}).

Reply with exactly one JSON object and nothing else:
{{"message": "<short reply to the user, in the user's language>", "instructions": [<instruction>...]}}

Instruction shape:
{{"type": "goal|step|habit|area|metric",
  "operation": "create|update|complete",
  "filter": {{"kind": "all"}} | {{"kind": "ids", "values": ["<id>"]}} | {{"kind": "names", "values": ["<name>"]}},
  "data": {{...fields...}},
  "date": "YYYY-MM-DD"}}

Rules:
- create carries data and never a filter. Goals and steps need "title"; habits, areas and metrics need "name".
- update carries a filter naming one entity and data holding only the fields to change.
- complete carries a filter and an optional date, never data. Completing habits without a date means today.
- Use ids from the tables when you can. Leave goalId/areaId out when unsure.
- Step fields: title, description, goalId, areaId, date, isImportant, isUrgent, estimatedTime (minutes).
- Goal fields: title, description, areaId, targetDate, status (active|paused|completed).
- Habit fields: name, description, frequency (daily|weekly|custom), selectedDays, selectedDates, alwaysShow, areaId.
- Area fields: name, description, color, icon.
- Metric fields: name, goalId, unit, targetValue, currentValue. A metric for a goal created in the same reply may omit goalId.
- If nothing should change, return an empty instructions array and answer in message."#,
        today = date_key(today),
        weekday = today.format("%A"),
    )
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

fn schedule_label(habit: &Habit) -> String {
    let mut label = habit.frequency.as_str().to_string();
    if matches!(habit.frequency, Frequency::Weekly | Frequency::Custom) {
        if let Some(days) = &habit.selected_days {
            label = format!("{label} ({})", days.days().join(","));
        }
    }
    if !habit.selected_dates.is_empty() {
        label = format!("{label} [{}]", habit.selected_dates.join(","));
    }
    if habit.always_show {
        label.push_str(" always");
    }
    label
}

/// The user's data as readable tables. Completed steps are left out.
pub fn render_user_data(data: &UserData, today: NaiveDate) -> String {
    let mut sections = Vec::new();

    let goals: Vec<Vec<String>> = data
        .goals
        .iter()
        .map(|g| {
            vec![
                g.id.clone(),
                g.title.clone(),
                g.status.to_string(),
                or_dash(g.area_id.as_deref().map(|id| data.area_label(id)).as_deref()),
                or_dash(g.target_date.map(date_key).as_deref()),
            ]
        })
        .collect();
    sections.push(format!(
        "GOALS\n{}",
        render_table(&["ID", "TITLE", "STATUS", "AREA", "TARGET"], &goals)
    ));

    let areas: Vec<Vec<String>> = data
        .areas
        .iter()
        .map(|a| vec![a.id.clone(), a.name.clone()])
        .collect();
    sections.push(format!("AREAS\n{}", render_table(&["ID", "NAME"], &areas)));

    let habits: Vec<Vec<String>> = data
        .habits
        .iter()
        .map(|h| {
            let today_status = match (is_scheduled_for_day(h, today), h.is_completed_on(today)) {
                (_, true) => "done",
                (true, false) => "due",
                (false, false) => "-",
            };
            vec![
                h.id.clone(),
                h.name.clone(),
                schedule_label(h),
                today_status.to_string(),
            ]
        })
        .collect();
    sections.push(format!(
        "HABITS\n{}",
        render_table(&["ID", "NAME", "SCHEDULE", "TODAY"], &habits)
    ));

    let steps: Vec<Vec<String>> = data
        .steps
        .iter()
        .filter(|s| !s.completed)
        .map(|s| {
            vec![
                s.id.clone(),
                s.title.clone(),
                or_dash(s.date.map(date_key).as_deref()),
                or_dash(s.goal_id.as_deref().map(|id| data.goal_label(id)).as_deref()),
            ]
        })
        .collect();
    sections.push(format!(
        "OPEN STEPS\n{}",
        render_table(&["ID", "TITLE", "DATE", "GOAL"], &steps)
    ));

    let metrics: Vec<Vec<String>> = data
        .metrics
        .iter()
        .map(|m| {
            let progress = match m.target_value {
                Some(target) => format!("{}/{}", m.current_value, target),
                None => m.current_value.to_string(),
            };
            vec![
                m.id.clone(),
                m.name.clone(),
                data.goal_label(&m.goal_id),
                format!("{progress} {}", m.unit.as_deref().unwrap_or("")).trim_end().to_string(),
            ]
        })
        .collect();
    sections.push(format!(
        "METRICS\n{}",
        render_table(&["ID", "NAME", "GOAL", "PROGRESS"], &metrics)
    ));

    sections.join("\n\n")
}

/// The user message: request, data tables and any still-pending instructions.
pub fn user_prompt(
    query: &str,
    data: &UserData,
    today: NaiveDate,
    pending: &[Instruction],
) -> String {
    let mut out = format!("REQUEST\n{}\n\n{}", query.trim(), render_user_data(data, today));
    if !pending.is_empty() {
        let json = serde_json::to_string_pretty(pending).unwrap_or_else(|_| "[]".to_string());
        out.push_str(
            "\n\nPENDING (proposed earlier, not yet confirmed; amend these instead of starting over)\n",
        );
        out.push_str(&json);
    }
    out
}
