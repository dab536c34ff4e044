//! Cross-instruction dependency: a `metric.create` without a goal id is
//! bound to a `goal.create` from the same batch.

use std::collections::BTreeMap;

use crate::command::Command;
use crate::instruction::{EntityKind, Instruction, Operation};

fn is_unbound_metric(ins: &Instruction) -> bool {
    ins.entity == Some(EntityKind::Metric)
        && ins.operation == Some(Operation::Create)
        && !matches!(ins.data_str("goalId"), Some(id) if !id.trim().is_empty())
}

fn is_goal_create(ins: &Instruction) -> bool {
    matches!(Command::parse(ins), Ok(Command::CreateGoal(_)))
}

/// Map of metric index to the goal index it binds to: the nearest preceding
/// valid `goal.create`, else the first later one.
pub fn metric_bindings(instructions: &[Instruction]) -> BTreeMap<usize, usize> {
    let goals: Vec<usize> = instructions
        .iter()
        .enumerate()
        .filter(|(_, ins)| is_goal_create(ins))
        .map(|(i, _)| i)
        .collect();

    instructions
        .iter()
        .enumerate()
        .filter(|(_, ins)| is_unbound_metric(ins))
        .filter_map(|(i, _)| {
            let before = goals.iter().rev().find(|&&g| g < i);
            let after = goals.iter().find(|&&g| g > i);
            before.or(after).map(|&g| (i, g))
        })
        .collect()
}

/// Inverse view: goal index to the metrics waiting on it, in batch order.
pub fn dependents(bindings: &BTreeMap<usize, usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut out: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&metric, &goal) in bindings {
        out.entry(goal).or_default().push(metric);
    }
    out
}
