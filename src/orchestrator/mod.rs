//! Plan execution engine: step dispatch, ordered event emission, and the
//! collaborator contracts steps run against.

pub mod emitter;
pub mod interfaces;
pub mod orchestrator;
pub mod step_runner;
pub mod stubs;

pub use emitter::Emitter;
pub use orchestrator::Orchestrator;
pub use step_runner::{StepRunner, StepState, StepStatus};
