use crate::output::{print_json, print_table};
use anyhow::{anyhow, bail, Context};
use std::path::Path;
use std::sync::Arc;
use stride_core::config::Config;
use stride_core::{Assistant, ExecutionReport, HabitScope, Proposal, UserChoices, YamlStore};

pub fn run(
    root: &Path,
    query: &str,
    user: &str,
    yes: bool,
    choices: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let choices = parse_choices(choices)?;
    let config = Config::load(root).context("failed to load config")?;
    let assistant = Assistant::from_config(&config, Arc::new(YamlStore::new(root)))
        .context("failed to build oracle")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let proposal = assistant.propose(user, query, &[]).await?;
        if !yes || !proposal.requires_confirmation {
            return if json {
                print_json(&proposal)
            } else {
                print_proposal(&proposal);
                Ok(())
            };
        }

        let report = assistant
            .confirm(user, &proposal.instructions, &choices)
            .await?;
        if json {
            print_json(&serde_json::json!({ "proposal": proposal, "report": report }))
        } else {
            print_proposal(&proposal);
            println!();
            print_report(&report);
            Ok(())
        }
    })
}

/// `INDEX=SCOPE` pairs, e.g. `0=scheduled`.
fn parse_choices(raw: &[String]) -> anyhow::Result<UserChoices> {
    let mut choices = UserChoices::new();
    for pair in raw {
        let (index, scope) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --choice '{pair}': expected INDEX=SCOPE"))?;
        let index: usize = index
            .trim()
            .parse()
            .with_context(|| format!("invalid --choice index '{index}'"))?;
        let scope = match scope.trim() {
            "all" => HabitScope::All,
            "scheduled" => HabitScope::Scheduled,
            other => bail!("invalid --choice scope '{other}': expected all or scheduled"),
        };
        choices.insert(index, scope);
    }
    Ok(choices)
}

fn print_proposal(proposal: &Proposal) {
    println!("{}", proposal.message);
    if proposal.preview.items.is_empty() {
        return;
    }
    println!();
    let rows: Vec<Vec<String>> = proposal
        .preview
        .items
        .iter()
        .map(|item| {
            let note = match (&item.error, item.requires_choice) {
                (Some(err), _) => format!("chyba: {err}"),
                (None, true) => format!(
                    "--choice {}=all ({}) | {}=scheduled ({})",
                    item.index,
                    item.all_count.unwrap_or(0),
                    item.index,
                    item.scheduled_count.unwrap_or(0)
                ),
                (None, false) => String::new(),
            };
            vec![item.index.to_string(), item.description.clone(), note]
        })
        .collect();
    print_table(&["#", "AKCE", "POZNÁMKA"], &rows);
}

fn print_report(report: &ExecutionReport) {
    println!("{}", report.message);
    let rows: Vec<Vec<String>> = report
        .actions
        .iter()
        .map(|a| {
            vec![
                a.index.to_string(),
                if a.success { "ok" } else { "chyba" }.to_string(),
                a.error.clone().unwrap_or_else(|| a.message.clone()),
            ]
        })
        .collect();
    if !rows.is_empty() {
        print_table(&["#", "STAV", "ZPRÁVA"], &rows);
    }
}
