pub mod engine;
pub mod states;

pub use engine::{Clock, DefaultRuntime, FixedClock, SystemClock, Wizard, WizardError};
pub use states::{
    TransitionOutcome, WizardAction, WizardEvent, WizardEventKind, WizardState, WizardStep,
};
