//! Strict form of an instruction: one variant per supported
//! `(type, operation)` pair.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::instruction::{EntityKind, Filter, Instruction, Operation};
use crate::payload::{
    lenient, AreaDraft, AreaPatch, GoalDraft, GoalPatch, HabitDraft, HabitPatch, MetricDraft,
    MetricPatch, StepDraft, StepPatch,
};

// ---------------------------------------------------------------------------
// InstructionError
// ---------------------------------------------------------------------------

/// Why an instruction cannot be turned into a [`Command`]. These are values
/// rendered into preview items and execution results, never request errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("instruction is missing its type")]
    MissingType,

    #[error("instruction is missing its operation")]
    MissingOperation,

    #[error("unknown instruction type")]
    UnknownType,

    #[error("unknown operation")]
    UnknownOperation,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("{0} requires a filter")]
    MissingFilter(Operation),

    #[error("update needs a specific target, not every {0}")]
    AmbiguousTarget(EntityKind),

    #[error("update carries no fields to change")]
    EmptyUpdate,

    #[error("{operation} is not supported for {entity}")]
    Unsupported {
        entity: EntityKind,
        operation: Operation,
    },
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateGoal(GoalDraft),
    CreateStep(StepDraft),
    CreateHabit(HabitDraft),
    CreateArea(AreaDraft),
    CreateMetric(MetricDraft),
    UpdateGoal(Filter, GoalPatch),
    UpdateStep(Filter, StepPatch),
    UpdateHabit(Filter, HabitPatch),
    UpdateArea(Filter, AreaPatch),
    UpdateMetric(Filter, MetricPatch),
    CompleteGoal(Filter),
    CompleteStep(Filter, Option<NaiveDate>),
    CompleteHabit(Filter, Option<NaiveDate>),
}

impl Command {
    /// Validate and type an instruction.
    ///
    /// Shape violations that do not change meaning are tolerated with a
    /// warning: a `create` carrying a filter ignores it, a `complete`
    /// carrying data ignores the data.
    pub fn parse(ins: &Instruction) -> Result<Self, InstructionError> {
        let entity = match ins.entity {
            None => return Err(InstructionError::MissingType),
            Some(EntityKind::Unknown) => return Err(InstructionError::UnknownType),
            Some(e) => e,
        };
        let operation = match ins.operation {
            None => return Err(InstructionError::MissingOperation),
            Some(Operation::Unknown) => return Err(InstructionError::UnknownOperation),
            Some(op) => op,
        };

        match operation {
            Operation::Create => {
                if ins.filter.is_some() {
                    tracing::warn!(instruction = %ins.label(), "ignoring filter on create");
                }
                parse_create(entity, ins.data.as_ref())
            }
            Operation::Update => {
                let filter = ins
                    .filter
                    .clone()
                    .ok_or(InstructionError::MissingFilter(operation))?;
                if filter == Filter::All {
                    return Err(InstructionError::AmbiguousTarget(entity));
                }
                parse_update(entity, filter, ins.data.as_ref())
            }
            Operation::Complete => {
                if ins.data.is_some() {
                    tracing::warn!(instruction = %ins.label(), "ignoring data on complete");
                }
                let filter = ins
                    .filter
                    .clone()
                    .ok_or(InstructionError::MissingFilter(operation))?;
                let date = completion_date(ins.date.as_deref());
                match entity {
                    EntityKind::Habit => Ok(Command::CompleteHabit(filter, date)),
                    EntityKind::Step => Ok(Command::CompleteStep(filter, date)),
                    EntityKind::Goal => Ok(Command::CompleteGoal(filter)),
                    EntityKind::Area | EntityKind::Metric | EntityKind::Unknown => {
                        Err(InstructionError::Unsupported { entity, operation })
                    }
                }
            }
            Operation::Delete | Operation::Unknown => {
                Err(InstructionError::Unsupported { entity, operation })
            }
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            Command::CreateGoal(_) | Command::UpdateGoal(..) | Command::CompleteGoal(_) => {
                EntityKind::Goal
            }
            Command::CreateStep(_) | Command::UpdateStep(..) | Command::CompleteStep(..) => {
                EntityKind::Step
            }
            Command::CreateHabit(_) | Command::UpdateHabit(..) | Command::CompleteHabit(..) => {
                EntityKind::Habit
            }
            Command::CreateArea(_) | Command::UpdateArea(..) => EntityKind::Area,
            Command::CreateMetric(_) | Command::UpdateMetric(..) => EntityKind::Metric,
        }
    }
}

fn decode<T: DeserializeOwned>(data: Option<&Map<String, Value>>) -> Result<T, InstructionError> {
    let value = Value::Object(data.cloned().unwrap_or_default());
    serde_json::from_value(value).map_err(|e| InstructionError::InvalidData(e.to_string()))
}

fn require_identity(
    value: &Option<String>,
    field: &'static str,
) -> Result<(), InstructionError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(InstructionError::MissingField(field)),
    }
}

fn parse_create(
    entity: EntityKind,
    data: Option<&Map<String, Value>>,
) -> Result<Command, InstructionError> {
    let field = entity.identity_field();
    match entity {
        EntityKind::Goal => {
            let draft: GoalDraft = decode(data)?;
            require_identity(&draft.title, field)?;
            Ok(Command::CreateGoal(draft))
        }
        EntityKind::Step => {
            let draft: StepDraft = decode(data)?;
            require_identity(&draft.title, field)?;
            Ok(Command::CreateStep(draft))
        }
        EntityKind::Habit => {
            let draft: HabitDraft = decode(data)?;
            require_identity(&draft.name, field)?;
            Ok(Command::CreateHabit(draft))
        }
        EntityKind::Area => {
            let draft: AreaDraft = decode(data)?;
            require_identity(&draft.name, field)?;
            Ok(Command::CreateArea(draft))
        }
        EntityKind::Metric => {
            let draft: MetricDraft = decode(data)?;
            require_identity(&draft.name, field)?;
            Ok(Command::CreateMetric(draft))
        }
        EntityKind::Unknown => Err(InstructionError::UnknownType),
    }
}

fn parse_update(
    entity: EntityKind,
    filter: Filter,
    data: Option<&Map<String, Value>>,
) -> Result<Command, InstructionError> {
    let command = match entity {
        EntityKind::Goal => {
            let patch: GoalPatch = decode(data)?;
            if patch.is_empty() {
                return Err(InstructionError::EmptyUpdate);
            }
            Command::UpdateGoal(filter, patch)
        }
        EntityKind::Step => {
            let patch: StepPatch = decode(data)?;
            if patch.is_empty() {
                return Err(InstructionError::EmptyUpdate);
            }
            Command::UpdateStep(filter, patch)
        }
        EntityKind::Habit => {
            let patch: HabitPatch = decode(data)?;
            if patch.is_empty() {
                return Err(InstructionError::EmptyUpdate);
            }
            Command::UpdateHabit(filter, patch)
        }
        EntityKind::Area => {
            let patch: AreaPatch = decode(data)?;
            if patch.is_empty() {
                return Err(InstructionError::EmptyUpdate);
            }
            Command::UpdateArea(filter, patch)
        }
        EntityKind::Metric => {
            let patch: MetricPatch = decode(data)?;
            if patch.is_empty() {
                return Err(InstructionError::EmptyUpdate);
            }
            Command::UpdateMetric(filter, patch)
        }
        EntityKind::Unknown => return Err(InstructionError::UnknownType),
    };
    Ok(command)
}

fn completion_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = lenient::parse_date(raw);
    if parsed.is_none() {
        tracing::warn!(date = raw, "unparsable completion date, using today");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(entity: EntityKind, data: Value) -> Instruction {
        Instruction::new(entity, Operation::Create).with_data(data)
    }

    #[test]
    fn create_step_requires_title() {
        let err = Command::parse(&create(EntityKind::Step, json!({"title": "  "}))).unwrap_err();
        assert_eq!(err, InstructionError::MissingField("title"));

        let ok = Command::parse(&create(EntityKind::Step, json!({"title": "Zavolat zubaři"})));
        assert!(matches!(ok, Ok(Command::CreateStep(_))));
    }

    #[test]
    fn create_habit_requires_name_not_title() {
        let err =
            Command::parse(&create(EntityKind::Habit, json!({"title": "Meditace"}))).unwrap_err();
        assert_eq!(err, InstructionError::MissingField("name"));
    }

    #[test]
    fn create_without_data_reports_missing_identity() {
        let ins = Instruction::new(EntityKind::Goal, Operation::Create);
        assert_eq!(
            Command::parse(&ins).unwrap_err(),
            InstructionError::MissingField("title")
        );
    }

    #[test]
    fn create_ignores_stray_filter() {
        let ins = create(EntityKind::Area, json!({"name": "Zdraví"})).with_filter(Filter::All);
        assert!(matches!(Command::parse(&ins), Ok(Command::CreateArea(_))));
    }

    #[test]
    fn missing_type_and_operation() {
        let mut ins = Instruction::default();
        assert_eq!(Command::parse(&ins).unwrap_err(), InstructionError::MissingType);
        ins.entity = Some(EntityKind::Step);
        assert_eq!(
            Command::parse(&ins).unwrap_err(),
            InstructionError::MissingOperation
        );
    }

    #[test]
    fn update_requires_filter_and_fields() {
        let ins = Instruction::new(EntityKind::Step, Operation::Update)
            .with_data(json!({"title": "x"}));
        assert_eq!(
            Command::parse(&ins).unwrap_err(),
            InstructionError::MissingFilter(Operation::Update)
        );

        let ins = Instruction::new(EntityKind::Step, Operation::Update)
            .with_filter(Filter::ids(["s1"]));
        assert_eq!(Command::parse(&ins).unwrap_err(), InstructionError::EmptyUpdate);
    }

    #[test]
    fn update_with_all_filter_is_ambiguous() {
        let ins = Instruction::new(EntityKind::Goal, Operation::Update)
            .with_filter(Filter::All)
            .with_data(json!({"title": "x"}));
        assert_eq!(
            Command::parse(&ins).unwrap_err(),
            InstructionError::AmbiguousTarget(EntityKind::Goal)
        );
    }

    #[test]
    fn complete_habit_parses_date() {
        let ins = Instruction::new(EntityKind::Habit, Operation::Complete)
            .with_filter(Filter::All)
            .with_date("2026-10-16");
        let Command::CompleteHabit(filter, date) = Command::parse(&ins).unwrap() else {
            panic!("expected CompleteHabit");
        };
        assert_eq!(filter, Filter::All);
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 16));
    }

    #[test]
    fn complete_with_bad_date_falls_back_to_none() {
        let ins = Instruction::new(EntityKind::Step, Operation::Complete)
            .with_filter(Filter::names(["x"]))
            .with_date("zítra");
        assert!(matches!(
            Command::parse(&ins),
            Ok(Command::CompleteStep(_, None))
        ));
    }

    #[test]
    fn delete_and_complete_area_unsupported() {
        let ins = Instruction::new(EntityKind::Goal, Operation::Delete).with_filter(Filter::All);
        assert!(matches!(
            Command::parse(&ins),
            Err(InstructionError::Unsupported { .. })
        ));
        let ins = Instruction::new(EntityKind::Area, Operation::Complete).with_filter(Filter::All);
        assert!(matches!(
            Command::parse(&ins),
            Err(InstructionError::Unsupported { .. })
        ));
    }

    #[test]
    fn invalid_data_type_is_reported() {
        let err = Command::parse(&create(EntityKind::Step, json!({"title": ["a", "b"]})))
            .unwrap_err();
        assert!(matches!(err, InstructionError::InvalidData(_)));
    }
}
