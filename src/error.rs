//! Error taxonomy for the orchestrator core.
//!
//! Mirrors the kind-not-type taxonomy from the orchestration design: a
//! request either completes, is cancelled, fails because a required step
//! failed, or fails for any other reason. Each step handler and repository
//! contract surfaces one of these through `?`.

use thiserror::Error;

/// Errors raised while building or executing a plan.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A caller supplied an option combination that is rejected outright,
    /// e.g. `fts.mode = "strict"` without `allow_strict`.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable description of the rejected combination.
        message: String,
    },

    /// A required step returned `failed`; the plan halts.
    #[error("required step failed: {step_id}")]
    RequiredStepFailed {
        /// The step id that failed.
        step_id: String,
    },

    /// Cancellation was observed at a suspension point.
    #[error("request cancelled")]
    Cancelled,

    /// Any other failure escaping a step or collaborator.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Description of the failure.
        message: String,
    },
}

impl OrchestratorError {
    /// Convenience constructor for [`OrchestratorError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`OrchestratorError::Unexpected`].
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// Errors raised while building a text-search predicate.
///
/// Kept distinct from [`OrchestratorError`] so the retriever's text-search
/// module can be unit-tested without depending on the orchestrator crate
/// boundary; `tsquery::build` callers convert it with `?` via `From`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TsQueryError {
    /// `mode = "strict"` was requested without `allow_strict = true`.
    #[error("strict tsquery mode requires allow_strict=true")]
    StrictNotAllowed,
}

impl From<TsQueryError> for OrchestratorError {
    fn from(err: TsQueryError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}
