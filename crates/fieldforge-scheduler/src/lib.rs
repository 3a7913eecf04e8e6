//! Rebuild scheduling for SDF hierarchies.
//!
//! [`Scheduler`] is the per-root debounce/throttle state machine and knows
//! nothing about meshes. [`RebuildPipeline`] runs one dispatched rebuild
//! through the external collaborators. [`UpdateDriver`] ties both to a
//! snapshot cache and is what a host calls from its change callbacks and
//! timer.

pub mod driver;
pub mod error;
pub mod pipeline;
pub mod scheduler;

pub use driver::{Clock, INITIAL_CHECK_STAGGER_S, RebuildOutcome, UpdateDriver};
pub use error::{BoxError, RebuildError, SchedulerError};
pub use pipeline::{
    ExpressionBuilder, MIN_RESOLUTION, Mesher, Publish, RebuildPipeline, ResultBinder,
    generate_result_name,
};
pub use scheduler::{
    FinalDispatch, Phase, RebuildKind, RebuildRequest, RootTiming, Scheduler, is_eligible,
};
