//! The booking wizard: step layout, per-step validation and submission.

pub mod engine;
pub mod gate;
pub mod sequencer;
pub mod validators;

pub use engine::{
    BookingFlow, FlowConfig, FlowHost, FlowPhase, FlowPorts, FlowView, InlineCompletion,
    NextOutcome, NoopHost, PreparedSubmission, SubmitOutcome,
};
pub use gate::{ProfessionalsState, SettingsState};
pub use sequencer::{StepKind, StepPlan};
pub use validators::ValidationError;
