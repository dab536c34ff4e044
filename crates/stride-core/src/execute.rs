//! Runs a confirmed batch against the store. Instructions run sequentially,
//! each inside its own failure boundary; the batch is not transactional.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use chrono::NaiveDate;
use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::binding::{dependents, metric_bindings};
use crate::command::{Command, InstructionError};
use crate::error::Result;
use crate::instruction::{EntityKind, Filter, Instruction, Operation};
use crate::payload::MetricDraft;
use crate::resolve::{
    describe_filter, goal_ref, goal_targets, habit_candidates, resolve_links, resolve_one,
    step_targets, DanglingLink,
};
use crate::store::{new_id, Store};
use crate::types::{date_key, Context, Habit, Named, UserData};
use crate::wording::{count_noun, dangling, noun, plural, problem, quoted};

// ---------------------------------------------------------------------------
// User choices
// ---------------------------------------------------------------------------

/// Which candidate set a `habit.complete` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitScope {
    Scheduled,
    /// Anything other than "scheduled" means all matched habits.
    #[default]
    #[serde(other)]
    All,
}

impl HabitScope {
    pub fn as_str(self) -> &'static str {
        match self {
            HabitScope::Scheduled => "scheduled",
            HabitScope::All => "all",
        }
    }
}

/// Instruction index to the scope the user picked.
pub type UserChoices = BTreeMap<usize, HabitScope>;

/// Read `userChoices` from a request body. Keys that are not indices are
/// skipped; any value other than "scheduled" means all.
pub fn parse_user_choices(value: &Value) -> UserChoices {
    let Some(map) = value.as_object() else {
        return UserChoices::new();
    };
    map.iter()
        .filter_map(|(key, scope)| {
            let index = key.trim().parse::<usize>().ok()?;
            let scope = match scope.as_str().map(str::trim) {
                Some("scheduled") => HabitScope::Scheduled,
                _ => HabitScope::All,
            };
            Some((index, scope))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub index: usize,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_goal_index: Option<usize>,
}

impl ExecutionResult {
    fn new(index: usize, ins: &Instruction, outcome: Outcome) -> Self {
        Self {
            index,
            entity: ins.entity,
            operation: ins.operation,
            success: outcome.success,
            message: outcome.message,
            data: outcome.data,
            error: outcome.error,
            synthetic: false,
            bound_goal_index: None,
        }
    }

    fn rejected(index: usize, ins: &Instruction, err: &InstructionError) -> Self {
        let outcome = Outcome::failed(
            format!("Akci {} nelze provést: {}", ins.label(), problem(err)),
            err.to_string(),
        );
        Self::new(index, ins, outcome)
    }

    fn unlinked(index: usize, ins: &Instruction, link: &DanglingLink) -> Self {
        let outcome = Outcome::failed(
            format!("Akci {} nelze provést: {}", ins.label(), dangling(link)),
            link.to_string(),
        );
        Self::new(index, ins, outcome)
    }

    fn bound_to(mut self, goal_index: usize) -> Self {
        self.synthetic = true;
        self.bound_goal_index = Some(goal_index);
        self
    }

    fn created_goal_id(&self) -> Option<&str> {
        if !self.success
            || self.entity != Some(EntityKind::Goal)
            || self.operation != Some(Operation::Create)
        {
            return None;
        }
        self.data.as_ref()?.get("id")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub message: String,
    pub actions: Vec<ExecutionResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl ExecutionReport {
    /// `success` iff at least one action succeeded.
    pub fn from_results(actions: Vec<ExecutionResult>) -> Self {
        let succeeded = actions.iter().filter(|a| a.success).count();
        let failed = actions.len() - succeeded;
        let message = match (succeeded, failed) {
            (0, 0) => "Žádné akce k provedení".to_string(),
            (s, 0) => format!("Úspěšně provedeno: {s}"),
            (0, f) => format!("Žádnou akci se nepodařilo provést (selhalo: {f})"),
            (s, f) => format!("Úspěšně provedeno: {s}, selhalo: {f}"),
        };
        Self {
            success: succeeded > 0,
            message,
            actions,
            succeeded,
            failed,
        }
    }
}

/// What one command produced, before it is tied to its instruction.
#[derive(Debug)]
struct Outcome {
    success: bool,
    message: String,
    data: Option<Value>,
    error: Option<String>,
}

impl Outcome {
    fn ok(message: String, data: Value) -> Self {
        Self {
            success: true,
            message,
            data: Some(data),
            error: None,
        }
    }

    fn failed(message: String, error: String) -> Self {
        Self {
            success: false,
            message,
            data: None,
            error: Some(error),
        }
    }
}

fn feminine(entity: EntityKind) -> bool {
    matches!(entity, EntityKind::Area | EntityKind::Metric)
}

/// "Vytvořen krok", "Vytvořena oblast".
fn participle(stem: &str, entity: EntityKind) -> String {
    let ending = if feminine(entity) { "a" } else { "" };
    format!("{stem}{ending} {}", nominative(entity))
}

fn nominative(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Metric => "metrika",
        other => noun(other),
    }
}

fn not_found(entity: EntityKind, filter: &Filter) -> Outcome {
    Outcome::failed(
        format!("Nenašel jsem {} {}", noun(entity), describe_filter(filter)),
        format!("{entity} not found: {}", describe_filter(filter)),
    )
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'a> {
    store: &'a dyn Store,
    user_id: &'a str,
    ctx: Context,
    data: &'a UserData,
}

impl<'a> Executor<'a> {
    /// `data` is the live snapshot loaded at confirm time; targets are
    /// re-resolved against it, never against the preview.
    pub fn new(store: &'a dyn Store, user_id: &'a str, ctx: Context, data: &'a UserData) -> Self {
        Self {
            store,
            user_id,
            ctx,
            data,
        }
    }

    pub async fn execute(
        &self,
        instructions: &[Instruction],
        choices: &UserChoices,
    ) -> ExecutionReport {
        let bindings = metric_bindings(instructions);
        let waiting = dependents(&bindings);
        let mut actions = Vec::with_capacity(instructions.len());

        for (index, ins) in instructions.iter().enumerate() {
            if bindings.contains_key(&index) {
                continue;
            }
            let result = self.guarded(index, ins, self.run(index, ins, choices)).await;
            let goal_id = result.created_goal_id().map(str::to_string);
            actions.push(result);

            for &metric_index in waiting.get(&index).into_iter().flatten() {
                let metric = &instructions[metric_index];
                let bound = self
                    .guarded(
                        metric_index,
                        metric,
                        self.run_bound_metric(metric_index, metric, goal_id.as_deref()),
                    )
                    .await;
                actions.push(bound.bound_to(index));
            }
        }

        let report = ExecutionReport::from_results(actions);
        tracing::info!(
            user_id = self.user_id,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch executed"
        );
        report
    }

    /// Failure boundary: a panic inside one instruction becomes a failed
    /// result and the batch goes on.
    async fn guarded(
        &self,
        index: usize,
        ins: &Instruction,
        run: impl std::future::Future<Output = ExecutionResult>,
    ) -> ExecutionResult {
        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(_) => ExecutionResult::new(
                index,
                ins,
                Outcome::failed(
                    "Při provádění akce došlo k neočekávané chybě".to_string(),
                    "instruction panicked".to_string(),
                ),
            ),
        };
        if !result.success {
            let instruction = serde_json::to_string(ins).unwrap_or_default();
            tracing::warn!(
                user_id = self.user_id,
                index,
                entity = %ins.entity.map(EntityKind::as_str).unwrap_or("?"),
                operation = %ins.operation.map(Operation::as_str).unwrap_or("?"),
                instruction = %instruction,
                error = result.error.as_deref().unwrap_or_default(),
                "instruction failed"
            );
        }
        result
    }

    async fn run(&self, index: usize, ins: &Instruction, choices: &UserChoices) -> ExecutionResult {
        let mut command = match Command::parse(ins) {
            Ok(command) => command,
            Err(err) => return ExecutionResult::rejected(index, ins, &err),
        };
        if let Err(link) = resolve_links(&mut command, self.data) {
            return ExecutionResult::unlinked(index, ins, &link);
        }
        let entity = command.entity();
        let outcome = match self.apply(index, command, choices).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let verb = match ins.operation {
                    Some(Operation::Create) => "vytvořit",
                    Some(Operation::Update) => "upravit",
                    _ => "dokončit",
                };
                Outcome::failed(
                    format!("Nepodařilo se {verb} {}: {e}", noun(entity)),
                    e.to_string(),
                )
            }
        };
        ExecutionResult::new(index, ins, outcome)
    }

    async fn run_bound_metric(
        &self,
        index: usize,
        ins: &Instruction,
        goal_id: Option<&str>,
    ) -> ExecutionResult {
        let draft = match Command::parse(ins) {
            Ok(Command::CreateMetric(draft)) => draft,
            Ok(_) => {
                let err = InstructionError::InvalidData("expected metric.create".into());
                return ExecutionResult::rejected(index, ins, &err);
            }
            Err(err) => return ExecutionResult::rejected(index, ins, &err),
        };
        let name = draft.name.clone().unwrap_or_default();
        let outcome = match goal_id {
            None => Outcome::failed(
                format!(
                    "Metriku {} nelze vytvořit, protože se nepodařilo vytvořit její cíl",
                    quoted(name.trim())
                ),
                "bound goal was not created".to_string(),
            ),
            Some(goal_id) => match self.create_metric(draft, goal_id.to_string()).await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::failed(
                    format!("Nepodařilo se vytvořit metriku {}: {e}", quoted(name.trim())),
                    e.to_string(),
                ),
            },
        };
        ExecutionResult::new(index, ins, outcome)
    }

    async fn apply(&self, index: usize, command: Command, choices: &UserChoices) -> Result<Outcome> {
        let (store, user) = (self.store, self.user_id);
        let data = self.data;
        let created = |entity: EntityKind, name: &str| {
            format!("{} {}", participle("Vytvořen", entity), quoted(name))
        };
        let updated = |entity: EntityKind, name: &str| {
            format!("{} {}", participle("Upraven", entity), quoted(name))
        };

        let outcome = match command {
            Command::CreateGoal(draft) => {
                let goal = store.create_goal(user, draft.into_goal(new_id())).await?;
                Outcome::ok(created(EntityKind::Goal, &goal.title), serde_json::to_value(&goal)?)
            }
            Command::CreateStep(draft) => {
                let step = store.create_step(user, draft.into_step(new_id())).await?;
                Outcome::ok(created(EntityKind::Step, &step.title), serde_json::to_value(&step)?)
            }
            Command::CreateHabit(draft) => {
                let habit = store.create_habit(user, draft.into_habit(new_id())).await?;
                Outcome::ok(created(EntityKind::Habit, &habit.name), serde_json::to_value(&habit)?)
            }
            Command::CreateArea(draft) => {
                let area = store.create_area(user, draft.into_area(new_id())).await?;
                Outcome::ok(created(EntityKind::Area, &area.name), serde_json::to_value(&area)?)
            }
            Command::CreateMetric(draft) => {
                let key = draft.goal_id.clone().unwrap_or_default();
                match goal_ref(&key, &data.goals) {
                    Some(goal) => self.create_metric(draft, goal.id.clone()).await?,
                    None => {
                        let name = draft.name.unwrap_or_default();
                        let reason = if key.trim().is_empty() {
                            "metrika musí patřit k cíli".to_string()
                        } else {
                            format!("cíl {} neexistuje", quoted(key.trim()))
                        };
                        Outcome::failed(
                            format!("Metriku {} nelze vytvořit: {reason}", quoted(name.trim())),
                            "metric goal not found".to_string(),
                        )
                    }
                }
            }
            Command::UpdateGoal(filter, patch) => match resolve_one(&filter, &data.goals) {
                None => not_found(EntityKind::Goal, &filter),
                Some(goal) => {
                    let goal = store.update_goal(user, &goal.id, &patch).await?;
                    Outcome::ok(updated(EntityKind::Goal, &goal.title), serde_json::to_value(&goal)?)
                }
            },
            Command::UpdateStep(filter, patch) => match resolve_one(&filter, &data.steps) {
                None => not_found(EntityKind::Step, &filter),
                Some(step) => {
                    let step = store.update_step(user, &step.id, &patch).await?;
                    Outcome::ok(updated(EntityKind::Step, &step.title), serde_json::to_value(&step)?)
                }
            },
            Command::UpdateHabit(filter, patch) => match resolve_one(&filter, &data.habits) {
                None => not_found(EntityKind::Habit, &filter),
                Some(habit) => {
                    let habit = store.update_habit(user, &habit.id, &patch).await?;
                    Outcome::ok(updated(EntityKind::Habit, &habit.name), serde_json::to_value(&habit)?)
                }
            },
            Command::UpdateArea(filter, patch) => match resolve_one(&filter, &data.areas) {
                None => not_found(EntityKind::Area, &filter),
                Some(area) => {
                    let area = store.update_area(user, &area.id, &patch).await?;
                    Outcome::ok(updated(EntityKind::Area, &area.name), serde_json::to_value(&area)?)
                }
            },
            Command::UpdateMetric(filter, patch) => match resolve_one(&filter, &data.metrics) {
                None => not_found(EntityKind::Metric, &filter),
                Some(metric) => {
                    let metric = store.update_metric(user, &metric.id, &patch).await?;
                    Outcome::ok(
                        updated(EntityKind::Metric, &metric.name),
                        serde_json::to_value(&metric)?,
                    )
                }
            },
            Command::CompleteHabit(filter, date) => {
                self.complete_habits(&filter, date.unwrap_or(self.ctx.today), choices.get(&index).copied())
                    .await
            }
            Command::CompleteStep(filter, date) => {
                let targets = step_targets(&filter, &data.steps, date);
                let calls = targets
                    .iter()
                    .map(|s| store.set_step_completed(user, &s.id, true));
                settle(EntityKind::Step, &filter, &targets, join_all(calls).await)
            }
            Command::CompleteGoal(filter) => {
                let targets = goal_targets(&filter, &data.goals);
                let calls = targets.iter().map(|g| store.complete_goal(user, &g.id));
                settle(EntityKind::Goal, &filter, &targets, join_all(calls).await)
            }
        };
        Ok(outcome)
    }

    async fn create_metric(&self, draft: MetricDraft, goal_id: String) -> Result<Outcome> {
        let metric = draft.into_metric(new_id(), goal_id);
        let metric = self.store.create_metric(self.user_id, metric).await?;
        let owner = match self.data.goal(&metric.goal_id) {
            Some(goal) => format!(" pro cíl {}", quoted(&goal.title)),
            None => String::new(),
        };
        Ok(Outcome::ok(
            format!("Vytvořena metrika {}{owner}", quoted(&metric.name)),
            serde_json::to_value(&metric)?,
        ))
    }

    /// Complete the chosen candidate set. Habits already done for the day are
    /// left alone; the rest are toggled concurrently and succeed or fail on
    /// their own.
    async fn complete_habits(
        &self,
        filter: &Filter,
        day: NaiveDate,
        choice: Option<HabitScope>,
    ) -> Outcome {
        let candidates = habit_candidates(filter, &self.data.habits, day);
        if candidates.all.is_empty() {
            return Outcome::failed(
                format!("Nenašel jsem žádný návyk {}", describe_filter(filter)),
                format!("habit not found: {}", describe_filter(filter)),
            );
        }

        let requires_choice = candidates.requires_choice();
        let scope = choice.unwrap_or_default();
        let defaulted = requires_choice && choice.is_none();
        let chosen: Vec<&Habit> = match scope {
            HabitScope::Scheduled => candidates.scheduled,
            HabitScope::All => candidates.all,
        };
        if chosen.is_empty() {
            return Outcome::failed(
                format!("Na {} není naplánovaný žádný z vybraných návyků", date_key(day)),
                "no scheduled habits".to_string(),
            );
        }

        let (already, pending): (Vec<&Habit>, Vec<&Habit>) =
            chosen.into_iter().partition(|h| h.is_completed_on(day));
        let toggles = pending.iter().map(|h| self.complete_habit(h, day));
        let outcomes = join_all(toggles).await;

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for (habit, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(()) => completed.push(habit.name.clone()),
                Err(e) => failed.push(json!({"name": habit.name, "error": e.to_string()})),
            }
        }
        let already_done: Vec<String> = already.iter().map(|h| h.name.clone()).collect();

        let done = completed.len() + already_done.len();
        let total = done + failed.len();
        let mut message = if failed.is_empty() {
            format!("Dokončeno: {}", count_noun(done, EntityKind::Habit))
        } else {
            format!(
                "Dokončeno {done} z {total} {}, selhalo: {}",
                plural(total, "návyku", "návyků", "návyků"),
                failed.len()
            )
        };
        if !already_done.is_empty() {
            message.push_str(&format!(" (už hotovo: {})", already_done.len()));
        }
        if requires_choice {
            let label = match scope {
                HabitScope::Scheduled => "jen naplánované",
                HabitScope::All => "všechny",
            };
            let note = if defaulted { ", bez výběru" } else { "" };
            message.push_str(&format!(" [rozsah: {label}{note}]"));
        }

        let data = json!({
            "scope": scope.as_str(),
            "scopeDefaulted": defaulted,
            "date": date_key(day),
            "completed": completed,
            "alreadyDone": already_done,
            "failed": failed,
        });
        if failed.is_empty() {
            Outcome::ok(message, data)
        } else {
            Outcome {
                success: false,
                error: Some(format!("{} habit toggle(s) failed", failed.len())),
                message,
                data: Some(data),
            }
        }
    }

    async fn complete_habit(&self, habit: &Habit, day: NaiveDate) -> Result<()> {
        let state = self
            .store
            .toggle_habit_completion(self.user_id, &habit.id, day)
            .await?;
        if !state {
            // Completed elsewhere after the snapshot was taken; toggle back.
            self.store
                .toggle_habit_completion(self.user_id, &habit.id, day)
                .await?;
        }
        Ok(())
    }
}

/// Fold per-target completion results into one outcome.
fn settle<T: Named, R: Serialize>(
    entity: EntityKind,
    filter: &Filter,
    targets: &[&T],
    results: Vec<Result<R>>,
) -> Outcome {
    if targets.is_empty() {
        return Outcome::failed(
            format!("Nenašel jsem nic k dokončení ({})", describe_filter(filter)),
            format!("{entity} not found: {}", describe_filter(filter)),
        );
    }
    let mut done = Vec::new();
    let mut errors = Vec::new();
    for (target, result) in targets.iter().zip(results) {
        match result.and_then(|r| serde_json::to_value(r).map_err(Into::into)) {
            Ok(value) => done.push(value),
            Err(e) => errors.push(format!("{}: {e}", target.name())),
        }
    }
    let message = match (done.len(), errors.len()) {
        (1, 0) => format!("{} {}", participle("Dokončen", entity), quoted(targets[0].name())),
        (n, 0) => format!("Dokončeno: {}", count_noun(n, entity)),
        (n, f) => format!("Dokončeno: {}, selhalo: {f}", count_noun(n, entity)),
    };
    if errors.is_empty() {
        Outcome::ok(message, Value::Array(done))
    } else {
        Outcome {
            success: false,
            message,
            data: Some(Value::Array(done)),
            error: Some(errors.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_user_data, MemoryStore};
    use crate::types::{Frequency, Goal, Metric, SelectedDays, Step};

    fn today() -> NaiveDate {
        // Saturday
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let daily = Habit::new("h1", "Čtení");
        let mut monday = Habit::new("h2", "Běh");
        monday.frequency = Frequency::Weekly;
        monday.selected_days = Some(SelectedDays::List(vec!["monday".into()]));
        let meditation = Habit::new("h3", "Meditace");
        store
            .insert_user(
                "u1",
                UserData {
                    goals: vec![Goal::new("g1", "Learn Spanish")],
                    habits: vec![daily, monday, meditation],
                    steps: vec![Step::new("s1", "Zavolat zubaři")],
                    ..Default::default()
                },
            )
            .await;
        store
    }

    async fn run(store: &MemoryStore, batch: &[Instruction], choices: &UserChoices) -> ExecutionReport {
        let data = load_user_data(store, "u1").await.unwrap();
        Executor::new(store, "u1", Context::new(today()), &data)
            .execute(batch, choices)
            .await
    }

    fn step(title: &str) -> Instruction {
        Instruction::new(EntityKind::Step, Operation::Create).with_data(json!({ "title": title }))
    }

    #[test]
    fn participles_agree_with_gender() {
        assert_eq!(participle("Vytvořen", EntityKind::Step), "Vytvořen krok");
        assert_eq!(participle("Vytvořen", EntityKind::Area), "Vytvořena oblast");
        assert_eq!(participle("Upraven", EntityKind::Metric), "Upravena metrika");
    }

    #[test]
    fn aggregate_messages() {
        let r = |success| ExecutionResult {
            index: 0,
            entity: None,
            operation: None,
            success,
            message: String::new(),
            data: None,
            error: None,
            synthetic: false,
            bound_goal_index: None,
        };
        assert_eq!(ExecutionReport::from_results(vec![r(true), r(true)]).message, "Úspěšně provedeno: 2");
        let mixed = ExecutionReport::from_results(vec![r(true), r(false)]);
        assert_eq!(mixed.message, "Úspěšně provedeno: 1, selhalo: 1");
        assert!(mixed.success);
        let failed = ExecutionReport::from_results(vec![r(false)]);
        assert_eq!(failed.message, "Žádnou akci se nepodařilo provést (selhalo: 1)");
        assert!(!failed.success);
        assert_eq!(ExecutionReport::from_results(vec![]).message, "Žádné akce k provedení");
    }

    #[test]
    fn scope_parses_leniently() {
        let choices: UserChoices = serde_json::from_value(json!({"0": "scheduled", "2": "whatever"})).unwrap();
        assert_eq!(choices.get(&0), Some(&HabitScope::Scheduled));
        assert_eq!(choices.get(&2), Some(&HabitScope::All));
    }

    #[test]
    fn request_choices_skip_bad_keys() {
        let choices = parse_user_choices(&json!({"0": "scheduled", "x": "scheduled", "3": 7}));
        assert_eq!(choices, UserChoices::from([(0, HabitScope::Scheduled), (3, HabitScope::All)]));
        assert!(parse_user_choices(&json!(["scheduled"])).is_empty());
        assert!(parse_user_choices(&Value::Null).is_empty());
    }

    #[tokio::test]
    async fn partial_failure_continues_the_batch() {
        let store = seeded().await;
        store.fail_on("Boom");
        let batch = vec![step("First"), step("Boom"), step("Third")];
        let report = run(&store, &batch, &UserChoices::new()).await;
        let flags: Vec<bool> = report.actions.iter().map(|a| a.success).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert!(report.success);
        assert_eq!(report.message, "Úspěšně provedeno: 2, selhalo: 1");
        assert!(report.actions[1].error.as_deref().unwrap().contains("simulated failure"));
    }

    #[tokio::test]
    async fn unresolved_update_issues_no_store_call() {
        let store = seeded().await;
        let batch = vec![Instruction::new(EntityKind::Step, Operation::Update)
            .with_filter(Filter::names(["Nonexistent"]))
            .with_data(json!({"title": "Renamed"}))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(!report.actions[0].success);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn malformed_instruction_short_circuits() {
        let store = seeded().await;
        let batch = vec![Instruction::default()];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(!report.success);
        assert_eq!(report.actions[0].error.as_deref(), Some("instruction is missing its type"));
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn scheduled_choice_completes_only_scheduled() {
        let store = seeded().await;
        let batch = vec![Instruction::new(EntityKind::Habit, Operation::Complete).with_filter(Filter::All)];
        let choices = UserChoices::from([(0, HabitScope::Scheduled)]);
        let report = run(&store, &batch, &choices).await;
        assert!(report.success);
        let data = store.snapshot("u1").await;
        let done: Vec<&str> = data
            .habits
            .iter()
            .filter(|h| h.is_completed_on(today()))
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(done, vec!["h1", "h3"]);
        assert_eq!(report.actions[0].data.as_ref().unwrap()["scope"], "scheduled");
    }

    #[tokio::test]
    async fn missing_choice_defaults_to_all_and_says_so() {
        let store = seeded().await;
        let batch = vec![Instruction::new(EntityKind::Habit, Operation::Complete).with_filter(Filter::All)];
        let report = run(&store, &batch, &UserChoices::new()).await;
        let result = &report.actions[0];
        assert!(result.success);
        let data = result.data.as_ref().unwrap();
        assert_eq!(data["scope"], "all");
        assert_eq!(data["scopeDefaulted"], true);
        assert!(result.message.contains("bez výběru"));
        assert_eq!(store.snapshot("u1").await.habits.iter().filter(|h| h.is_completed_on(today())).count(), 3);
    }

    #[tokio::test]
    async fn already_completed_habit_is_not_untoggled() {
        let store = seeded().await;
        store.toggle_habit_completion("u1", "h1", today()).await.unwrap();
        let batch = vec![Instruction::new(EntityKind::Habit, Operation::Complete)
            .with_filter(Filter::names(["Čtení"]))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(report.success);
        assert!(store.snapshot("u1").await.habits[0].is_completed_on(today()));
        assert_eq!(report.actions[0].data.as_ref().unwrap()["alreadyDone"], json!(["Čtení"]));
    }

    #[tokio::test]
    async fn one_failing_habit_does_not_block_siblings() {
        let store = seeded().await;
        store.fail_on("Meditace");
        let batch = vec![Instruction::new(EntityKind::Habit, Operation::Complete)
            .with_filter(Filter::ids(["h1", "h3"]))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(!report.actions[0].success);
        let data = store.snapshot("u1").await;
        assert!(data.habits[0].is_completed_on(today()));
        assert!(!data.habits[2].is_completed_on(today()));
    }

    #[tokio::test]
    async fn metric_binds_to_goal_created_in_batch() {
        let store = seeded().await;
        let batch = vec![
            Instruction::new(EntityKind::Metric, Operation::Create)
                .with_data(json!({"name": "Knihy", "targetValue": 12})),
            Instruction::new(EntityKind::Goal, Operation::Create)
                .with_data(json!({"title": "Přečíst 12 knih"})),
        ];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert_eq!(report.actions.len(), 2);
        assert_eq!(report.actions[0].index, 1);
        let metric = &report.actions[1];
        assert!(metric.success);
        assert!(metric.synthetic);
        assert_eq!(metric.index, 0);
        assert_eq!(metric.bound_goal_index, Some(1));

        let data = store.snapshot("u1").await;
        let goal = data.goals.iter().find(|g| g.title == "Přečíst 12 knih").unwrap();
        assert_eq!(data.metrics[0].goal_id, goal.id);
    }

    #[tokio::test]
    async fn bound_metric_fails_when_goal_fails() {
        let store = seeded().await;
        store.fail_on("Broken goal");
        let batch = vec![
            Instruction::new(EntityKind::Goal, Operation::Create).with_data(json!({"title": "Broken goal"})),
            Instruction::new(EntityKind::Metric, Operation::Create).with_data(json!({"name": "Km"})),
        ];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(!report.success);
        assert!(report.actions[1].synthetic);
        assert!(store.snapshot("u1").await.metrics.is_empty());
    }

    #[tokio::test]
    async fn metric_for_existing_goal_by_title() {
        let store = seeded().await;
        let batch = vec![Instruction::new(EntityKind::Metric, Operation::Create)
            .with_data(json!({"name": "Lekce", "goalId": "Learn Spanish"}))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(report.success);
        assert_eq!(report.actions[0].message, "Vytvořena metrika „Lekce“ pro cíl „Learn Spanish“");
        assert!(!report.actions[0].synthetic);
    }

    #[tokio::test]
    async fn step_goal_given_by_title_is_linked_by_id() {
        let store = seeded().await;
        let raw = Instruction::new(EntityKind::Step, Operation::Create)
            .with_data(json!({"title": "Lekce", "Cíl": "learn spanish"}));
        let batch = vec![crate::normalize::normalize(raw)];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(report.success);
        let data = store.snapshot("u1").await;
        let lekce = data.steps.iter().find(|s| s.title == "Lekce").unwrap();
        assert_eq!(lekce.goal_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn unknown_link_fails_without_a_write() {
        let store = seeded().await;
        let batch = vec![
            Instruction::new(EntityKind::Step, Operation::Create)
                .with_data(json!({"title": "Lekce", "goalId": "Learn French"})),
            Instruction::new(EntityKind::Habit, Operation::Create)
                .with_data(json!({"name": "Jóga", "areaId": "a404"})),
        ];
        let report = run(&store, &batch, &UserChoices::new()).await;
        let flags: Vec<bool> = report.actions.iter().map(|a| a.success).collect();
        assert_eq!(flags, vec![false, false]);
        assert_eq!(report.actions[0].error.as_deref(), Some("goal not found: Learn French"));
        assert!(report.actions[0].message.ends_with("cíl „Learn French“ neexistuje"));
        assert_eq!(report.actions[1].error.as_deref(), Some("area not found: a404"));
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn metric_moves_to_goal_named_by_title() {
        let store = seeded().await;
        store.create_goal("u1", Goal::new("g2", "Run a marathon")).await.unwrap();
        let mut metric = Metric::new("m1", "g1", "Km");
        metric.unit = Some("km".into());
        store.create_metric("u1", metric).await.unwrap();
        let batch = vec![Instruction::new(EntityKind::Metric, Operation::Update)
            .with_filter(Filter::ids(["m1"]))
            .with_data(json!({"goalId": "Run a marathon"}))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(report.success);
        assert_eq!(store.snapshot("u1").await.metrics[0].goal_id, "g2");

        let batch = vec![Instruction::new(EntityKind::Metric, Operation::Update)
            .with_filter(Filter::ids(["m1"]))
            .with_data(json!({"goalId": "g404"}))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(!report.success);
        assert_eq!(store.snapshot("u1").await.metrics[0].goal_id, "g2");
    }

    #[tokio::test]
    async fn update_keeps_absent_fields() {
        let store = seeded().await;
        let mut patch_target = Step::new("s2", "Nakoupit");
        patch_target.is_important = true;
        store.create_step("u1", patch_target).await.unwrap();
        let batch = vec![Instruction::new(EntityKind::Step, Operation::Update)
            .with_filter(Filter::ids(["s2"]))
            .with_data(json!({"date": "2026-10-20"}))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert!(report.success);
        let data = store.snapshot("u1").await;
        let s2 = data.steps.iter().find(|s| s.id == "s2").unwrap();
        assert!(s2.is_important);
        assert_eq!(s2.title, "Nakoupit");
        assert_eq!(s2.date, NaiveDate::from_ymd_opt(2026, 10, 20));
    }

    #[tokio::test]
    async fn step_completion() {
        let store = seeded().await;
        let batch = vec![Instruction::new(EntityKind::Step, Operation::Complete)
            .with_filter(Filter::names(["zavolat zubaři"]))];
        let report = run(&store, &batch, &UserChoices::new()).await;
        assert_eq!(report.actions[0].message, "Dokončen krok „Zavolat zubaři“");
        assert!(store.snapshot("u1").await.steps[0].completed);
    }
}
