//! `stride-core`: the natural-language command pipeline.
//!
//! ```text
//! query ─► oracle ─► extract ─► normalize ─► enrich (matcher) ─► interpret ─► Proposal
//!                                                                              │
//!                      pending instructions + user choices ◄── client ◄────────┘
//!                                  │
//!                                  ▼
//!                               execute ─► Store ─► ExecutionReport
//! ```

pub mod binding;
pub mod command;
pub mod config;
pub mod error;
pub mod execute;
pub mod extract;
pub mod instruction;
pub mod interpret;
pub mod io;
pub mod matcher;
pub mod normalize;
pub mod paths;
pub mod payload;
pub mod pipeline;
pub mod prompt;
pub mod resolve;
pub mod schedule;
pub mod store;
pub mod types;
pub mod wording;

pub use error::{Result, StrideError};
pub use execute::{parse_user_choices, ExecutionReport, ExecutionResult, HabitScope, UserChoices};
pub use instruction::{EntityKind, Filter, Instruction, Operation};
pub use interpret::{Preview, PreviewItem};
pub use pipeline::{Assistant, Proposal, Today};
pub use store::{MemoryStore, Store, YamlStore};
