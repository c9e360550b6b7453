//! Error types for the workflow domain.

use crate::domain::types::StepKind;
use crate::generation::OutputSchema;
use std::fmt::{Display, Formatter};

/// Errors raised while executing a step or applying its delta.
///
/// Any of these aborts the traversal. The state the failing step was given
/// is left untouched.
#[derive(Debug, Clone)]
pub enum WorkflowError {
    /// A step ran without a field it requires.
    Precondition {
        step: StepKind,
        missing: &'static str,
    },
    /// The brief names an ad platform outside the known set.
    UnsupportedPlatform { platform: String },
    /// The generation service failed.
    Generation {
        step: StepKind,
        source: GenerationError,
    },
    /// Model output could not be parsed into the requested schema.
    MalformedOutput { schema: OutputSchema, reason: String },
    /// Model output or a delta carried the wrong draft variant.
    SchemaMismatch { expected: String, found: String },
    /// Invalid phase transition or delta ordering.
    InvalidTransition { message: String },
    /// A state field could not be encoded into a step's task context.
    ContextEncoding {
        step: StepKind,
        field: &'static str,
        reason: String,
    },
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition { step, missing } => {
                write!(f, "{} requires {} but it is absent", step, missing)
            }
            Self::UnsupportedPlatform { platform } => {
                write!(f, "unsupported ad platform: {}", platform)
            }
            Self::Generation { step, source } => {
                write!(f, "generation failed in {}: {}", step, source)
            }
            Self::MalformedOutput { schema, reason } => {
                write!(f, "malformed {} output: {}", schema, reason)
            }
            Self::SchemaMismatch { expected, found } => {
                write!(f, "schema mismatch: expected {}, found {}", expected, found)
            }
            Self::InvalidTransition { message } => write!(f, "invalid transition: {}", message),
            Self::ContextEncoding {
                step,
                field,
                reason,
            } => write!(f, "{} could not encode {}: {}", step, field, reason),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors returned by a generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Connection or I/O failure talking to the provider.
    Transport(String),
    /// The provider did not answer within the configured timeout.
    Timeout,
    /// The provider answered with a non-success status.
    Status { code: u16, body: String },
    /// The provider answered but the envelope was unusable.
    InvalidResponse(String),
    /// No credentials were available for the request.
    Credentials(String),
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport failure: {}", message),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status { code, body } => write!(f, "provider returned HTTP {}: {}", code, body),
            Self::InvalidResponse(message) => write!(f, "invalid provider response: {}", message),
            Self::Credentials(message) => write!(f, "missing credentials: {}", message),
        }
    }
}

impl std::error::Error for GenerationError {}
