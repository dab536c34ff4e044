//! User-facing Czech phrasing shared by the preview and execution reports.

use crate::command::InstructionError;
use crate::instruction::{EntityKind, Operation};
use crate::resolve::DanglingLink;

/// Czech plural: 1 → `one`, 2–4 → `few`, otherwise `many`.
pub fn plural<'a>(n: usize, one: &'a str, few: &'a str, many: &'a str) -> &'a str {
    match n {
        1 => one,
        2..=4 => few,
        _ => many,
    }
}

/// `3 návyky`, `5 kroků`, …
pub fn count_noun(n: usize, entity: EntityKind) -> String {
    let (one, few, many) = match entity {
        EntityKind::Goal => ("cíl", "cíle", "cílů"),
        EntityKind::Step => ("krok", "kroky", "kroků"),
        EntityKind::Habit => ("návyk", "návyky", "návyků"),
        EntityKind::Area => ("oblast", "oblasti", "oblastí"),
        EntityKind::Metric => ("metrika", "metriky", "metrik"),
        EntityKind::Unknown => ("položka", "položky", "položek"),
    };
    format!("{n} {}", plural(n, one, few, many))
}

/// Singular noun in the accusative, as in "vytvořím krok".
pub fn noun(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Goal => "cíl",
        EntityKind::Step => "krok",
        EntityKind::Habit => "návyk",
        EntityKind::Area => "oblast",
        EntityKind::Metric => "metriku",
        EntityKind::Unknown => "položku",
    }
}

/// Czech typographic quotes.
pub fn quoted(text: &str) -> String {
    format!("„{text}“")
}

pub fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().map(quoted).collect::<Vec<_>>().join(", ")
}

/// Uppercase the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Czech explanation of a link field that names nothing.
pub fn dangling(link: &DanglingLink) -> String {
    format!("{} {} neexistuje", noun(link.target), quoted(&link.value))
}

/// Czech explanation of why an instruction cannot run.
pub fn problem(err: &InstructionError) -> String {
    match err {
        InstructionError::MissingType => "chybí typ položky".to_string(),
        InstructionError::MissingOperation => "chybí operace".to_string(),
        InstructionError::UnknownType => "neznámý typ položky".to_string(),
        InstructionError::UnknownOperation => "neznámá operace".to_string(),
        InstructionError::MissingField(field) => {
            let label = match *field {
                "title" | "name" => "název",
                other => other,
            };
            format!("chybí povinné pole {}", quoted(label))
        }
        InstructionError::InvalidData(detail) => format!("neplatná data ({detail})"),
        InstructionError::MissingFilter(_) => "není určeno, čeho se akce týká".to_string(),
        InstructionError::AmbiguousTarget(entity) => {
            format!("úprava musí určit konkrétní {}", noun(*entity))
        }
        InstructionError::EmptyUpdate => "úprava neobsahuje žádné změny".to_string(),
        InstructionError::Unsupported { entity, operation } => {
            let action = match operation {
                Operation::Delete => "mazání",
                Operation::Complete => "dokončování",
                Operation::Create => "vytváření",
                Operation::Update => "upravování",
                Operation::Unknown => "tato operace",
            };
            format!("{action} není u typu {} podporováno", quoted(entity.as_str()))
        }
    }
}
