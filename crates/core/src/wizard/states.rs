use serde::{Deserialize, Serialize};

use crate::domain::draft::{ConsistencyWarning, LicenseSelectionMethod, QuestionnaireAnswers};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    CompanyInfo,
    LicenseSelection,
    Review,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            Self::CompanyInfo => 1,
            Self::LicenseSelection => 2,
            Self::Review => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::CompanyInfo => "Company Information",
            Self::LicenseSelection => "License Selection",
            Self::Review => "Review",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardState {
    Authoring { step: WizardStep },
    Finalized,
}

impl WizardState {
    pub const START: WizardState = WizardState::Authoring { step: WizardStep::CompanyInfo };

    pub fn step(self) -> Option<WizardStep> {
        match self {
            Self::Authoring { step } => Some(step),
            Self::Finalized => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    UpdateCompany { company_name: String, team_size: Option<u32> },
    SelectMethod { method: LicenseSelectionMethod },
    EnterLicenses { enterprise: u32, cascade: u32 },
    AnswerQuestionnaire { answers: QuestionnaireAnswers },
    Next,
    Back,
    Finalize,
    EditLicenses { enterprise: u32, cascade: u32 },
    Reset,
}

impl WizardEvent {
    pub fn kind(&self) -> WizardEventKind {
        match self {
            Self::UpdateCompany { .. } => WizardEventKind::UpdateCompany,
            Self::SelectMethod { .. } => WizardEventKind::SelectMethod,
            Self::EnterLicenses { .. } => WizardEventKind::EnterLicenses,
            Self::AnswerQuestionnaire { .. } => WizardEventKind::AnswerQuestionnaire,
            Self::Next => WizardEventKind::Next,
            Self::Back => WizardEventKind::Back,
            Self::Finalize => WizardEventKind::Finalize,
            Self::EditLicenses { .. } => WizardEventKind::EditLicenses,
            Self::Reset => WizardEventKind::Reset,
        }
    }
}

/// Payload-free name of a [`WizardEvent`], used in outcomes, errors and audit metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardEventKind {
    UpdateCompany,
    SelectMethod,
    EnterLicenses,
    AnswerQuestionnaire,
    Next,
    Back,
    Finalize,
    EditLicenses,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardAction {
    RecordDraftChange,
    PromptForLicenseSelection,
    ApplyRecommendation,
    PresentReview,
    PriceQuote,
    IssueQuoteRecord,
    RepriceQuote,
    DiscardDraft,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WizardState,
    pub to: WizardState,
    pub event: WizardEventKind,
    pub actions: Vec<WizardAction>,
    pub warnings: Vec<ConsistencyWarning>,
}
