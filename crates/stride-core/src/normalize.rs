//! Repairs oracle field-name drift and drops repeated instructions.

use serde_json::{Map, Value};

use crate::instruction::{EntityKind, Instruction, Operation};

/// Localized or alternate labels, lowercased, per canonical key. The
/// identity key (`title`/`name`) is handled separately because it depends
/// on the entity kind.
const KEY_ALIASES: &[(&str, &[&str])] = &[
    ("goalId", &["goal id", "goal_id", "goalid", "id cíle", "id cile", "cíl", "cil", "goal"]),
    ("areaId", &["area id", "area_id", "areaid", "id oblasti", "oblast", "area"]),
    ("description", &["popis", "description", "poznámka", "poznamka"]),
    ("date", &["datum", "date", "den", "day"]),
    ("targetDate", &["target date", "target_date", "termín", "termin", "deadline", "cílové datum"]),
    ("frequency", &["frekvence", "frequency", "četnost", "cetnost"]),
    ("alwaysShow", &["always show", "always_show", "vždy zobrazit", "vzdy zobrazit"]),
    ("selectedDays", &["selected days", "selected_days", "vybrané dny", "vybrane dny", "dny", "days"]),
    ("selectedDates", &["selected dates", "selected_dates", "vybraná data"]),
    ("estimatedTime", &["estimated time", "estimated_time", "odhadovaný čas", "odhadovany cas", "čas", "cas"]),
    ("isImportant", &["important", "is_important", "důležité", "dulezite", "důležitý"]),
    ("isUrgent", &["urgent", "is_urgent", "urgentní", "urgentni", "naléhavé"]),
    ("targetValue", &["target value", "target_value", "cílová hodnota", "cilova hodnota", "cíl hodnota"]),
    ("currentValue", &["current value", "current_value", "aktuální hodnota", "aktualni hodnota"]),
    ("unit", &["jednotka", "unit"]),
    ("color", &["barva", "color", "colour"]),
    ("icon", &["ikona", "icon"]),
    ("status", &["stav", "status"]),
];

const IDENTITY_ALIASES: &[&str] = &[
    "název", "nazev", "jméno", "jmeno", "titulek", "title", "name", "goal title", "step title",
];

fn canonical_key(entity: Option<EntityKind>, key: &str) -> Option<&'static str> {
    let lowered = key.trim().to_lowercase();
    if IDENTITY_ALIASES.contains(&lowered.as_str()) {
        return Some(entity.unwrap_or(EntityKind::Step).identity_field());
    }
    KEY_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&lowered.as_str()))
        .map(|(canonical, _)| *canonical)
}

/// Rename recognized keys to their canonical form. A canonical key that is
/// already present wins over an alias. Unrecognized keys are kept as-is.
pub fn repair_fields(entity: Option<EntityKind>, data: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut aliased = Vec::new();
    for (key, value) in data {
        match canonical_key(entity, &key) {
            Some(canonical) if canonical != key => aliased.push((canonical, key, value)),
            _ => {
                out.insert(key, value);
            }
        }
    }
    for (canonical, original, value) in aliased {
        if out.contains_key(canonical) {
            tracing::debug!(key = %original, canonical, "dropping alias shadowed by canonical key");
            continue;
        }
        tracing::debug!(key = %original, canonical, "repaired field name");
        out.insert(canonical.to_string(), value);
    }
    out
}

pub fn normalize(mut instruction: Instruction) -> Instruction {
    if let Some(data) = instruction.data.take() {
        instruction.data = Some(repair_fields(instruction.entity, data));
    }
    instruction
}

fn identity_value(ins: &Instruction) -> Option<String> {
    let entity = ins.entity?;
    let value = ins.data.as_ref()?.get(entity.identity_field())?;
    let text = match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Same type and operation, and the same natural identity (create) or the
/// same filter and date (complete). Other operations never collapse.
pub fn is_duplicate(a: &Instruction, b: &Instruction) -> bool {
    if a.entity.is_none() || a.entity != b.entity || a.operation != b.operation {
        return false;
    }
    match a.operation {
        Some(Operation::Create) => match (identity_value(a), identity_value(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        Some(Operation::Complete) => a.filter == b.filter && a.date == b.date,
        _ => false,
    }
}

/// Keep the first occurrence of each intent.
pub fn dedupe(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut kept: Vec<Instruction> = Vec::with_capacity(instructions.len());
    for ins in instructions {
        if kept.iter().any(|k| is_duplicate(k, &ins)) {
            tracing::info!(instruction = %ins.label(), "dropping duplicate instruction");
            continue;
        }
        kept.push(ins);
    }
    kept
}

pub fn normalize_batch(instructions: Vec<Instruction>) -> Vec<Instruction> {
    dedupe(instructions.into_iter().map(normalize).collect())
}
