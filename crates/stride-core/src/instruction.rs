//! Wire form of an instruction as produced by the oracle and round-tripped
//! through the client between the preview and confirm calls.
//!
//! Everything here is loose: unknown kinds deserialize to
//! `Unknown` variants and every field is optional, so a malformed item never
//! rejects the whole batch. [`crate::command::Command`] is the strict form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// EntityKind / Operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Goal,
    Step,
    Habit,
    Area,
    Metric,
    #[serde(other)]
    Unknown,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Goal => "goal",
            EntityKind::Step => "step",
            EntityKind::Habit => "habit",
            EntityKind::Area => "area",
            EntityKind::Metric => "metric",
            EntityKind::Unknown => "unknown",
        }
    }

    /// The data key that names a new entity of this kind.
    pub fn identity_field(self) -> &'static str {
        match self {
            EntityKind::Goal | EntityKind::Step | EntityKind::Unknown => "title",
            EntityKind::Habit | EntityKind::Area | EntityKind::Metric => "name",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Complete,
    Delete,
    #[serde(other)]
    Unknown,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Complete => "complete",
            Operation::Delete => "delete",
            Operation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Which existing entities an update/complete instruction targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Filter {
    All,
    Ids {
        #[serde(default)]
        values: Vec<String>,
    },
    Names {
        #[serde(default)]
        values: Vec<String>,
    },
    /// Unrecognized `kind`; resolves to nothing.
    #[serde(other)]
    Unknown,
}

impl Filter {
    pub fn ids(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Filter::Ids {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Filter::Names {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Instruction {
    pub fn new(entity: EntityKind, operation: Operation) -> Self {
        Self {
            entity: Some(entity),
            operation: Some(operation),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Attach a data bag. Non-object values are ignored.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = Some(map);
        }
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Parse one element of an instruction array from the oracle or a
    /// request body. Elements that do not fit the wire shape become an empty
    /// instruction, which every consumer reports as malformed instead of
    /// dropping.
    pub fn from_value_lenient(value: Value) -> Self {
        match serde_json::from_value::<Instruction>(value) {
            Ok(instruction) => instruction,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable instruction");
                Instruction::default()
            }
        }
    }

    /// String value of a data key, if present and a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }

    /// Whether the data bag carries `key` at all (including explicit null).
    pub fn has_data_key(&self, key: &str) -> bool {
        self.data.as_ref().is_some_and(|d| d.contains_key(key))
    }

    pub fn label(&self) -> String {
        format!(
            "{}.{}",
            self.entity.map(EntityKind::as_str).unwrap_or("?"),
            self.operation.map(Operation::as_str).unwrap_or("?")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_complete_with_names_filter() {
        let json = r#"{
            "type": "habit",
            "operation": "complete",
            "filter": {"kind": "names", "values": ["Meditace"]},
            "date": "2026-10-17"
        }"#;
        let ins: Instruction = serde_json::from_str(json).unwrap();
        assert_eq!(ins.entity, Some(EntityKind::Habit));
        assert_eq!(ins.operation, Some(Operation::Complete));
        assert_eq!(ins.filter, Some(Filter::names(["Meditace"])));
        assert_eq!(ins.date.as_deref(), Some("2026-10-17"));
    }

    #[test]
    fn parse_filter_all() {
        let f: Filter = serde_json::from_value(json!({"kind": "all"})).unwrap();
        assert_eq!(f, Filter::All);
    }

    #[test]
    fn unknown_kinds_do_not_fail() {
        let ins: Instruction = serde_json::from_value(json!({
            "type": "project",
            "operation": "archive",
            "filter": {"kind": "regex", "values": ["x"]}
        }))
        .unwrap();
        assert_eq!(ins.entity, Some(EntityKind::Unknown));
        assert_eq!(ins.operation, Some(Operation::Unknown));
        assert_eq!(ins.filter, Some(Filter::Unknown));
    }

    #[test]
    fn missing_fields_are_none() {
        let ins: Instruction = serde_json::from_value(json!({"data": {"title": "x"}})).unwrap();
        assert!(ins.entity.is_none());
        assert!(ins.operation.is_none());
        assert_eq!(ins.data_str("title"), Some("x"));
    }

    #[test]
    fn lenient_parse_of_non_object_is_empty() {
        let ins = Instruction::from_value_lenient(json!("create a step"));
        assert_eq!(ins, Instruction::default());
    }

    #[test]
    fn serialization_uses_type_key_and_skips_empty() {
        let ins = Instruction::new(EntityKind::Step, Operation::Create)
            .with_data(json!({"title": "Zavolat zubaři"}));
        let v = serde_json::to_value(&ins).unwrap();
        assert_eq!(v["type"], "step");
        assert_eq!(v["operation"], "create");
        assert!(v.get("filter").is_none());
        assert!(v.get("date").is_none());
    }
}
