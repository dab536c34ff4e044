//! Dry-run preview of an instruction batch. Reads the snapshot, never
//! mutates anything.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::binding::metric_bindings;
use crate::command::Command;
use crate::instruction::{EntityKind, Filter, Instruction, Operation};
use crate::payload::{FieldChange, GoalDraft, MetricDraft, StepDraft};
use crate::resolve::{
    describe_filter, goal_ref, goal_targets, habit_candidates, resolve_links, resolve_one,
    step_targets, TargetRef,
};
use crate::types::{date_key, Context, Frequency, Named, UserData};
use crate::wording::{capitalize, count_noun, dangling, noun, problem, quoted, quoted_list};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub index: usize,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetRef>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_items: Option<Vec<TargetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_items: Option<Vec<TargetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_count: Option<usize>,
    #[serde(default)]
    pub requires_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewItem {
    fn new(index: usize, ins: &Instruction) -> Self {
        Self {
            index,
            entity: ins.entity,
            operation: ins.operation,
            targets: Vec::new(),
            description: String::new(),
            changes: Vec::new(),
            date: None,
            all_items: None,
            scheduled_items: None,
            all_count: None,
            scheduled_count: None,
            requires_choice: false,
            error: None,
        }
    }

    fn fail(mut self, description: String, error: String) -> Self {
        self.description = description;
        self.error = Some(error);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub items: Vec<PreviewItem>,
    pub summary: String,
}

impl Preview {
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.error.is_some())
    }
}

/// Preview every instruction, one item per instruction, in batch order.
/// Invalid instructions become items carrying an `error`; none is dropped.
pub fn interpret(instructions: &[Instruction], ctx: &Context, data: &UserData) -> Preview {
    let bindings = metric_bindings(instructions);
    let items: Vec<PreviewItem> = instructions
        .iter()
        .enumerate()
        .map(|(index, ins)| {
            let item = PreviewItem::new(index, ins);
            match Command::parse(ins) {
                Ok(mut command) => {
                    if let Err(link) = resolve_links(&mut command, data) {
                        return invalid(item, ins, dangling(&link));
                    }
                    let scope = Scope {
                        ctx,
                        data,
                        batch: instructions,
                        bindings: &bindings,
                    };
                    scope.preview(item, command)
                }
                Err(err) => invalid(item, ins, problem(&err)),
            }
        })
        .collect();
    let summary = summarize(&items);
    Preview { items, summary }
}

/// One sentence for the whole batch: the clauses joined with commas.
pub fn summarize(items: &[PreviewItem]) -> String {
    if items.is_empty() {
        return "Žádné akce.".to_string();
    }
    let clauses: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
    format!("{}.", capitalize(&clauses.join(", ")))
}

fn invalid(item: PreviewItem, ins: &Instruction, reason: String) -> PreviewItem {
    let what = ins.entity.map(noun).unwrap_or("položku");
    let description = match ins.operation {
        Some(Operation::Create) => format!("nelze vytvořit {what}: {reason}"),
        Some(Operation::Update) => format!("nelze upravit {what}: {reason}"),
        Some(Operation::Complete) => format!("nelze dokončit {what}: {reason}"),
        _ => format!("nelze provést akci {}: {reason}", ins.label()),
    };
    item.fail(description, reason)
}

/// Joins `a`, `a a b`, `a, b a c`.
fn join_and(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} a {last}", init.join(", ")),
    }
}

fn frequency_label(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "denně",
        Frequency::Weekly => "týdně",
        Frequency::Custom => "vlastní rozvrh",
        Frequency::Other => "jen ve vybrané dny",
    }
}

fn flag_verb(on: bool, set: &str, unset: &str) -> String {
    let verb = if on { set } else { unset };
    verb.to_string()
}

/// Verb phrase for one field change, as in "přejmenuji na „X“".
pub fn change_verb(change: &FieldChange, data: &UserData) -> String {
    let to = change.to.as_deref();
    let is_true = to == Some("true");
    match (change.field.as_str(), to) {
        ("title" | "name", Some(v)) => format!("přejmenuji na {}", quoted(v)),
        ("goalId", Some(id)) => format!("přiřadím k cíli {}", quoted(&data.goal_label(id))),
        ("goalId", None) => "odeberu z cíle".to_string(),
        ("areaId", Some(id)) => format!("přiřadím do oblasti {}", quoted(&data.area_label(id))),
        ("areaId", None) => "odeberu z oblasti".to_string(),
        ("date", Some(v)) => format!("změním datum na {v}"),
        ("date", None) => "odeberu datum".to_string(),
        ("targetDate", Some(v)) => format!("změním termín na {v}"),
        ("targetDate", None) => "odeberu termín".to_string(),
        ("description", Some(_)) => "upravím popis".to_string(),
        ("description", None) => "odeberu popis".to_string(),
        ("status", Some(v)) => format!("změním stav na {v}"),
        ("completed", _) => flag_verb(is_true, "označím jako hotový", "označím jako nehotový"),
        ("isImportant", _) => flag_verb(is_true, "označím jako důležitý", "zruším důležitost"),
        ("isUrgent", _) => flag_verb(is_true, "označím jako naléhavý", "zruším naléhavost"),
        ("alwaysShow", _) => flag_verb(is_true, "budu zobrazovat vždy", "přestanu zobrazovat vždy"),
        ("estimatedTime", Some(v)) => format!("nastavím odhad na {v} min"),
        ("frequency", Some(v)) => format!("změním frekvenci na {v}"),
        ("selectedDays", Some(v)) => format!("změním dny na {v}"),
        ("color", Some(v)) => format!("změním barvu na {v}"),
        ("icon", Some(v)) => format!("změním ikonu na {v}"),
        ("unit", Some(v)) => format!("změním jednotku na {v}"),
        ("targetValue", Some(v)) => format!("nastavím cílovou hodnotu na {v}"),
        ("currentValue", Some(v)) => format!("nastavím aktuální hodnotu na {v}"),
        (field, _) => format!("změním {field}"),
    }
}

struct Scope<'a> {
    ctx: &'a Context,
    data: &'a UserData,
    batch: &'a [Instruction],
    bindings: &'a BTreeMap<usize, usize>,
}

impl Scope<'_> {
    fn preview(&self, item: PreviewItem, command: Command) -> PreviewItem {
        let data = self.data;
        match command {
            Command::CreateGoal(draft) => self.create_goal(item, &draft),
            Command::CreateStep(draft) => self.create_step(item, &draft),
            Command::CreateHabit(draft) => {
                let mut item = item;
                let name = draft.name.unwrap_or_default();
                let frequency = draft.frequency.unwrap_or_default();
                item.description = format!(
                    "vytvořím návyk {} ({})",
                    quoted(name.trim()),
                    frequency_label(frequency)
                );
                item
            }
            Command::CreateArea(draft) => {
                let mut item = item;
                let name = draft.name.unwrap_or_default();
                item.description = format!("vytvořím oblast {}", quoted(name.trim()));
                item
            }
            Command::CreateMetric(draft) => self.create_metric(item, &draft),
            Command::UpdateGoal(filter, patch) => update(
                item,
                EntityKind::Goal,
                &filter,
                resolve_one(&filter, &data.goals).map(|g| (TargetRef::of(g), patch.diff(g))),
                data,
            ),
            Command::UpdateStep(filter, patch) => update(
                item,
                EntityKind::Step,
                &filter,
                resolve_one(&filter, &data.steps).map(|s| (TargetRef::of(s), patch.diff(s))),
                data,
            ),
            Command::UpdateHabit(filter, patch) => update(
                item,
                EntityKind::Habit,
                &filter,
                resolve_one(&filter, &data.habits).map(|h| (TargetRef::of(h), patch.diff(h))),
                data,
            ),
            Command::UpdateArea(filter, patch) => update(
                item,
                EntityKind::Area,
                &filter,
                resolve_one(&filter, &data.areas).map(|a| (TargetRef::of(a), patch.diff(a))),
                data,
            ),
            Command::UpdateMetric(filter, patch) => update(
                item,
                EntityKind::Metric,
                &filter,
                resolve_one(&filter, &data.metrics).map(|m| (TargetRef::of(m), patch.diff(m))),
                data,
            ),
            Command::CompleteHabit(filter, date) => self.complete_habits(item, &filter, date),
            Command::CompleteStep(filter, date) => {
                let targets = step_targets(&filter, &data.steps, date);
                complete(item, EntityKind::Step, &filter, targets)
            }
            Command::CompleteGoal(filter) => {
                let targets = goal_targets(&filter, &data.goals);
                complete(item, EntityKind::Goal, &filter, targets)
            }
        }
    }

    fn create_goal(&self, mut item: PreviewItem, draft: &GoalDraft) -> PreviewItem {
        let title = draft.title.as_deref().unwrap_or_default().trim();
        let mut text = format!("vytvořím cíl {}", quoted(title));
        if let Some(area) = draft.area_id.as_deref().filter(|a| !a.trim().is_empty()) {
            text.push_str(&format!(" v oblasti {}", quoted(&self.data.area_label(area))));
        }
        if let Some(date) = draft.target_date {
            text.push_str(&format!(" s termínem {}", date_key(date)));
        }
        item.description = text;
        item
    }

    fn create_step(&self, mut item: PreviewItem, draft: &StepDraft) -> PreviewItem {
        let title = draft.title.as_deref().unwrap_or_default().trim();
        let mut text = format!("vytvořím krok {}", quoted(title));
        if let Some(goal) = draft.goal_id.as_deref().filter(|g| !g.trim().is_empty()) {
            text.push_str(&format!(" k cíli {}", quoted(&self.data.goal_label(goal))));
        } else if let Some(area) = draft.area_id.as_deref().filter(|a| !a.trim().is_empty()) {
            text.push_str(&format!(" v oblasti {}", quoted(&self.data.area_label(area))));
        }
        if let Some(date) = draft.date {
            text.push_str(&format!(" na {}", date_key(date)));
        }
        item.description = text;
        item
    }

    fn create_metric(&self, mut item: PreviewItem, draft: &MetricDraft) -> PreviewItem {
        let name = draft.name.as_deref().unwrap_or_default().trim();
        let what = format!("metriku {}", quoted(name));
        let explicit = draft.goal_id.as_deref().filter(|g| !g.trim().is_empty());

        let owner = match explicit {
            Some(key) => goal_ref(key, &self.data.goals).map(|g| quoted(&g.title)),
            None => self
                .bindings
                .get(&item.index)
                .and_then(|&g| self.batch.get(g))
                .map(|goal| {
                    let title = goal.data_str("title").unwrap_or_default().trim();
                    format!("nový cíl {}", quoted(title))
                }),
        };

        match owner {
            Some(owner) => {
                let mut text = format!("vytvořím {what} pro {owner}");
                if let Some(target) = draft.target_value {
                    let unit = draft.unit.as_deref().unwrap_or_default();
                    text.push_str(&format!(" (cíl {target} {unit})").replace(" )", ")"));
                }
                item.description = text;
                item
            }
            None => {
                let reason = match explicit {
                    Some(key) => format!("cíl {} neexistuje", quoted(key)),
                    None => "metrika musí patřit k cíli".to_string(),
                };
                item.fail(format!("nelze vytvořit {what}: {reason}"), reason)
            }
        }
    }

    fn complete_habits(
        &self,
        mut item: PreviewItem,
        filter: &Filter,
        date: Option<NaiveDate>,
    ) -> PreviewItem {
        let day = date.unwrap_or(self.ctx.today);
        let candidates = habit_candidates(filter, &self.data.habits, day);
        item.date = Some(day);
        item.all_count = Some(candidates.all.len());
        item.scheduled_count = Some(candidates.scheduled.len());

        if candidates.all.is_empty() {
            let reason = format!("nenašel jsem žádný návyk ({})", describe_filter(filter));
            return item.fail(format!("nelze dokončit návyky: {reason}"), reason);
        }

        let when = if day == self.ctx.today {
            "na dnes".to_string()
        } else {
            format!("na {}", date_key(day))
        };

        if candidates.requires_choice() {
            item.requires_choice = true;
            item.all_items = Some(candidates.all.iter().map(|h| TargetRef::of(*h)).collect());
            item.scheduled_items = Some(
                candidates
                    .scheduled
                    .iter()
                    .map(|h| TargetRef::of(*h))
                    .collect(),
            );
            item.description = format!(
                "dokončím návyky: všechny ({}), nebo jen naplánované {when} ({})",
                count_noun(candidates.all.len(), EntityKind::Habit),
                count_noun(candidates.scheduled.len(), EntityKind::Habit),
            );
            return item;
        }

        item.targets = candidates.all.iter().map(|h| TargetRef::of(*h)).collect();
        let done = candidates
            .all
            .iter()
            .filter(|h| h.is_completed_on(day))
            .count();
        let names = quoted_list(candidates.all.iter().map(|h| h.name.as_str()));
        let mut text = if candidates.all.len() == 1 {
            format!("dokončím návyk {names}")
        } else {
            format!(
                "dokončím {}: {names}",
                count_noun(candidates.all.len(), EntityKind::Habit)
            )
        };
        if day != self.ctx.today {
            text.push_str(&format!(" {when}"));
        }
        if done > 0 {
            text.push_str(&format!(" (už hotovo: {done})"));
        }
        item.description = text;
        item
    }
}

fn update(
    mut item: PreviewItem,
    entity: EntityKind,
    filter: &Filter,
    resolved: Option<(TargetRef, Vec<FieldChange>)>,
    data: &UserData,
) -> PreviewItem {
    let Some((target, changes)) = resolved else {
        let reason = format!("{} {} nenalezeno", noun(entity), describe_filter(filter));
        return item.fail(format!("nelze upravit {}: {reason}", noun(entity)), reason);
    };
    let name = quoted(&target.name);
    item.description = if changes.is_empty() {
        format!("{} {name} zůstane beze změny", noun(entity))
    } else {
        let verbs: Vec<String> = changes.iter().map(|c| change_verb(c, data)).collect();
        format!("u položky {} {name} {}", noun(entity), join_and(&verbs))
    };
    item.targets = vec![target];
    item.changes = changes;
    item
}

fn complete<T: Named>(
    mut item: PreviewItem,
    entity: EntityKind,
    filter: &Filter,
    targets: Vec<&T>,
) -> PreviewItem {
    if targets.is_empty() {
        let reason = format!(
            "nenašel jsem nic k dokončení ({})",
            describe_filter(filter)
        );
        return item.fail(format!("nelze dokončit {}: {reason}", noun(entity)), reason);
    }
    let names = quoted_list(targets.iter().map(|t| t.name()));
    item.description = if targets.len() == 1 {
        format!("dokončím {} {names}", noun(entity))
    } else {
        format!("dokončím {}: {names}", count_noun(targets.len(), entity))
    };
    item.targets = targets.into_iter().map(TargetRef::of).collect();
    item
}
