pub mod audit;
pub mod config;
pub mod cpq;
pub mod crm;
pub mod domain;
pub mod errors;
pub mod wizard;

pub use cpq::pricing::{LinearPricingEngine, PricingEngine, PricingResult};
pub use cpq::recommendation::{FiveFactorHeuristic, RecommendationHeuristic};
pub use cpq::{CpqRuntime, DeterministicCpqRuntime};
pub use crm::{
    ContactEmail, CrmClient, CrmCreateError, Opportunity, OpportunitySchema,
    OpportunitySubmitter, SubmissionError, SubmissionReceipt,
};
pub use domain::draft::{
    ConsistencyWarning, DraftField, FieldIssue, LanguageCount, LicenseSelection,
    LicenseSelectionMethod, QuestionnaireAnswers, QuoteDraft, YesNo,
};
pub use domain::license::{LicenseMix, LicenseType};
pub use domain::quote::{QuoteId, QuoteIdGenerator, QuoteRecord, QuoteRecordPayload, UuidQuoteIds};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use wizard::{
    Clock, FixedClock, SystemClock, TransitionOutcome, Wizard, WizardAction, WizardError,
    WizardEvent, WizardState, WizardStep,
};
