//! Domain model for the ad script workflow.
//!
//! - **Campaign** (`campaign.rs`): the brief that identifies a run
//! - **Insight** (`insight.rs`): audience insight and creative strategy
//! - **Script** (`script.rs`): video and static drafts
//! - **Evaluation** (`evaluation.rs`): reports and the approval rule
//! - **History** (`history.rs`): append-only refinement ledger
//! - **Variation** (`variation.rs`): A/B variant request and result

pub mod campaign;
pub mod errors;
pub mod evaluation;
pub mod failure;
pub mod history;
pub mod insight;
pub mod script;
pub mod types;
pub mod variation;

pub use campaign::{AdPlatform, CampaignBrief, PlatformKind};
pub use errors::{GenerationError, WorkflowError};
pub use evaluation::{EvaluationCriterion, EvaluationMetric, EvaluationReport};
pub use failure::{FailureKind, FailurePolicy};
pub use history::{DraftSnapshot, HistoryAction, HistoryLedger, IterationLogEntry};
pub use insight::{AudienceInsight, CreativeStrategy};
pub use script::{Scene, ScriptDraft, StaticAdDraft, VideoScriptDraft};
pub use types::{DraftSlot, RunId, StepKind};
pub use variation::{FinalizedVariation, VariationRequest};
