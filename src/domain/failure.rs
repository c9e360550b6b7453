//! Failure classification for aborted traversals.
//!
//! The core never retries. A caller that wants to retry re-runs the whole
//! traversal from its initial state, and uses this taxonomy plus a
//! [`FailurePolicy`] to decide whether that is worthwhile.

use crate::domain::errors::{GenerationError, WorkflowError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canonical failure types for an aborted traversal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection or I/O failure reaching the provider.
    Transport,
    /// Provider did not answer in time.
    Timeout,
    /// Provider answered with a non-success HTTP status.
    ProviderStatus(u16),
    /// Provider could not be called for lack of credentials.
    Credentials,
    /// Model output did not parse against the requested schema.
    MalformedOutput,
    /// Model output carried the wrong draft variant.
    SchemaMismatch,
    /// A step ran without a field it requires.
    Precondition,
    /// The brief or config is unusable (for example an unknown platform).
    Configuration,
    /// The state machine rejected a transition.
    InvalidTransition,
}

impl FailureKind {
    /// Classifies a workflow error.
    pub fn classify(error: &WorkflowError) -> Self {
        match error {
            WorkflowError::Precondition { .. } => FailureKind::Precondition,
            WorkflowError::UnsupportedPlatform { .. } => FailureKind::Configuration,
            WorkflowError::MalformedOutput { .. } => FailureKind::MalformedOutput,
            WorkflowError::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            WorkflowError::InvalidTransition { .. } | WorkflowError::ContextEncoding { .. } => {
                FailureKind::InvalidTransition
            }
            WorkflowError::Generation { source, .. } => match source {
                GenerationError::Transport(_) | GenerationError::InvalidResponse(_) => {
                    FailureKind::Transport
                }
                GenerationError::Timeout => FailureKind::Timeout,
                GenerationError::Status { code, .. } => FailureKind::ProviderStatus(*code),
                GenerationError::Credentials(_) => FailureKind::Credentials,
            },
        }
    }

    /// Returns true if re-running the traversal could plausibly succeed.
    ///
    /// Model output is non-deterministic, so malformed or mismatched output
    /// counts as transient. Structural problems with the input never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::Transport
            | FailureKind::Timeout
            | FailureKind::MalformedOutput
            | FailureKind::SchemaMismatch => true,
            FailureKind::ProviderStatus(code) => *code == 429 || *code >= 500,
            FailureKind::Credentials
            | FailureKind::Precondition
            | FailureKind::Configuration
            | FailureKind::InvalidTransition => false,
        }
    }

    /// Returns a human-readable name for this failure type.
    pub fn display_name(&self) -> &'static str {
        match self {
            FailureKind::Transport => "Transport",
            FailureKind::Timeout => "Timeout",
            FailureKind::ProviderStatus(_) => "Provider Status",
            FailureKind::Credentials => "Credentials",
            FailureKind::MalformedOutput => "Malformed Output",
            FailureKind::SchemaMismatch => "Schema Mismatch",
            FailureKind::Precondition => "Precondition",
            FailureKind::Configuration => "Configuration",
            FailureKind::InvalidTransition => "Invalid Transition",
        }
    }
}

/// Whole-traversal retry policy used by the application runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailurePolicy {
    /// Maximum re-runs after a retryable failure. Default: 2
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff multiplier in seconds between re-runs. Default: 5
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u32,
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_secs() -> u32 {
    5
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl FailurePolicy {
    /// Returns true if another attempt is allowed after `attempts_so_far` retries.
    pub fn allows_retry(&self, kind: &FailureKind, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_retries && kind.is_retryable()
    }

    /// Delay before retry number `attempt` (1-based), growing linearly.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(u64::from(self.backoff_secs) * u64::from(attempt.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StepKind;
    use crate::generation::OutputSchema;

    fn generation_error(source: GenerationError) -> WorkflowError {
        WorkflowError::Generation {
            step: StepKind::ScriptGeneration,
            source,
        }
    }

    #[test]
    fn test_classify_generation_errors() {
        assert_eq!(
            FailureKind::classify(&generation_error(GenerationError::Timeout)),
            FailureKind::Timeout
        );
        assert_eq!(
            FailureKind::classify(&generation_error(GenerationError::Status {
                code: 503,
                body: String::new(),
            })),
            FailureKind::ProviderStatus(503)
        );
        assert_eq!(
            FailureKind::classify(&generation_error(GenerationError::Transport(
                "refused".into()
            ))),
            FailureKind::Transport
        );
    }

    #[test]
    fn test_structural_failures_are_not_retryable() {
        let precondition = WorkflowError::Precondition {
            step: StepKind::ScriptEvaluation,
            missing: "script_draft",
        };
        let platform = WorkflowError::UnsupportedPlatform {
            platform: "myspace".into(),
        };
        assert!(!FailureKind::classify(&precondition).is_retryable());
        assert!(!FailureKind::classify(&platform).is_retryable());
        assert!(!FailureKind::Credentials.is_retryable());
    }

    #[test]
    fn test_transient_failures_are_retryable() {
        let malformed = WorkflowError::MalformedOutput {
            schema: OutputSchema::EvaluationReport,
            reason: "missing field".into(),
        };
        assert!(FailureKind::classify(&malformed).is_retryable());
        assert!(FailureKind::ProviderStatus(429).is_retryable());
        assert!(FailureKind::ProviderStatus(500).is_retryable());
        assert!(!FailureKind::ProviderStatus(400).is_retryable());
    }

    #[test]
    fn test_policy_retry_budget_and_backoff() {
        let policy = FailurePolicy {
            max_retries: 2,
            backoff_secs: 3,
        };
        assert!(policy.allows_retry(&FailureKind::Timeout, 0));
        assert!(policy.allows_retry(&FailureKind::Timeout, 1));
        assert!(!policy.allows_retry(&FailureKind::Timeout, 2));
        assert!(!policy.allows_retry(&FailureKind::Precondition, 0));
        assert_eq!(policy.backoff(1), Duration::from_secs(3));
        assert_eq!(policy.backoff(2), Duration::from_secs(6));
    }

    #[test]
    fn test_policy_defaults_from_empty_yaml() {
        let policy: FailurePolicy = serde_yaml::from_str("{}").unwrap();
        assert_eq!(policy, FailurePolicy::default());
    }
}
