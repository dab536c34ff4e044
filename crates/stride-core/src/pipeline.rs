//! Request-level orchestration: propose (oracle → normalize → enrich →
//! preview) and confirm (execute). No state is held between the two calls;
//! the client carries the pending instructions.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stride_oracle::{Oracle, OracleRequest};

use crate::config::Config;
use crate::error::{Result, StrideError};
use crate::execute::{ExecutionReport, Executor, UserChoices};
use crate::extract::{parse_reply, ReplyError};
use crate::instruction::{EntityKind, Instruction, Operation};
use crate::interpret::{interpret, summarize, Preview};
use crate::matcher::{EntityMatch, EntityMatcher};
use crate::normalize::normalize_batch;
use crate::prompt::{system_prompt, user_prompt};
use crate::resolve::resolve_one;
use crate::store::{load_user_data, Store};
use crate::types::{Context, UserData};

/// Shown when the oracle's reply cannot be read at all.
pub const REPHRASE_MESSAGE: &str =
    "Nepodařilo se zpracovat požadavek, zkuste ho prosím přeformulovat.";

/// How "today" is determined for schedules and default completion dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Today {
    /// UTC shifted by this many minutes.
    Offset(i32),
    Fixed(NaiveDate),
}

impl Today {
    pub fn resolve(self) -> NaiveDate {
        match self {
            Today::Offset(minutes) => (Utc::now() + Duration::minutes(i64::from(minutes))).date_naive(),
            Today::Fixed(date) => date,
        }
    }
}

impl Default for Today {
    fn default() -> Self {
        Today::Offset(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub success: bool,
    pub message: String,
    pub preview: Preview,
    pub instructions: Vec<Instruction>,
    pub requires_confirmation: bool,
}

impl Proposal {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            preview: Preview {
                items: Vec::new(),
                summary: summarize(&[]),
            },
            instructions: Vec::new(),
            requires_confirmation: false,
        }
    }
}

pub struct Assistant {
    store: Arc<dyn Store>,
    oracle: Arc<dyn Oracle>,
    matcher: EntityMatcher,
    today: Today,
}

impl Assistant {
    pub fn new(store: Arc<dyn Store>, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            store,
            oracle,
            matcher: EntityMatcher::default(),
            today: Today::default(),
        }
    }

    /// Oracle, matcher threshold and timezone taken from the config.
    pub fn from_config(config: &Config, store: Arc<dyn Store>) -> Result<Self> {
        let oracle = config.oracle.build()?;
        Ok(Self::new(store, Arc::new(oracle))
            .with_matcher(EntityMatcher::new(f64::from(config.assistant.match_threshold)))
            .with_today(Today::Offset(config.assistant.timezone_offset_minutes)))
    }

    pub fn with_matcher(mut self, matcher: EntityMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    /// Phase one. Nothing is executed; the returned instructions are what
    /// the client sends back to [`Assistant::confirm`].
    pub async fn propose(
        &self,
        user_id: &str,
        query: &str,
        context_instructions: &[Instruction],
    ) -> Result<Proposal> {
        let query = query.trim();
        if query.is_empty() {
            return Err(StrideError::EmptyQuery);
        }

        let data = load_user_data(self.store.as_ref(), user_id).await?;
        let today = self.today.resolve();
        let request = OracleRequest::new(
            system_prompt(today),
            user_prompt(query, &data, today, context_instructions),
        );
        let completion = self.oracle.complete(&request).await?;
        tracing::info!(user_id, model = %completion.model, "oracle replied");

        let reply = match parse_reply(&completion.text) {
            Ok(reply) => reply,
            Err(ReplyError::Unparseable) => {
                tracing::warn!(user_id, model = %completion.model, "oracle reply is not JSON");
                return Ok(Proposal::rejected(REPHRASE_MESSAGE.to_string()));
            }
            Err(ReplyError::MissingInstructions { message }) => {
                tracing::warn!(user_id, "oracle reply has no instructions array");
                return Ok(Proposal::rejected(
                    message.unwrap_or_else(|| REPHRASE_MESSAGE.to_string()),
                ));
            }
        };

        let matched = self.matcher.match_query(query, &data.goals, &data.areas);
        let instructions: Vec<Instruction> = normalize_batch(reply.instructions)
            .into_iter()
            .map(|ins| enrich(ins, &matched, &data))
            .collect();

        let preview = interpret(&instructions, &Context::new(today), &data);
        let message = reply.message.unwrap_or_else(|| preview.summary.clone());
        Ok(Proposal {
            success: true,
            message,
            requires_confirmation: !instructions.is_empty(),
            preview,
            instructions,
        })
    }

    /// Phase two. The oracle is not consulted; targets are re-resolved
    /// against freshly loaded data.
    pub async fn confirm(
        &self,
        user_id: &str,
        pending: &[Instruction],
        choices: &UserChoices,
    ) -> Result<ExecutionReport> {
        let data = load_user_data(self.store.as_ref(), user_id).await?;
        let ctx = Context::new(self.today.resolve());
        let executor = Executor::new(self.store.as_ref(), user_id, ctx, &data);
        Ok(executor.execute(pending, choices).await)
    }
}

/// Fill `goalId`/`areaId` on step create/update from the matcher when the
/// oracle left them out. Updates only gain a link the step does not have yet.
fn enrich(mut ins: Instruction, matched: &EntityMatch, data: &UserData) -> Instruction {
    if ins.entity != Some(EntityKind::Step) {
        return ins;
    }
    let step = match ins.operation {
        Some(Operation::Create) => None,
        Some(Operation::Update) => match ins.filter.as_ref().and_then(|f| resolve_one(f, &data.steps)) {
            Some(step) => Some(step),
            None => return ins,
        },
        _ => return ins,
    };

    let fills = [
        ("goalId", matched.goal_id(), step.is_some_and(|s| s.goal_id.is_some())),
        ("areaId", matched.area_id(), step.is_some_and(|s| s.area_id.is_some())),
    ];
    for (key, found, already_linked) in fills {
        let Some(id) = found else { continue };
        if already_linked || ins.has_data_key(key) {
            continue;
        }
        tracing::debug!(key, id, "enriched step from matcher");
        ins.data
            .get_or_insert_with(Default::default)
            .insert(key.to_string(), Value::String(id.to_string()));
    }
    ins
}
