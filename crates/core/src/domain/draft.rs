use serde::{Deserialize, Serialize};

use crate::domain::license::LicenseMix;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageCount {
    #[default]
    #[serde(rename = "1-3")]
    OneToThree,
    #[serde(rename = "4-6")]
    FourToSix,
    #[serde(rename = "7+")]
    SevenPlus,
}

impl LanguageCount {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToThree => "1-3",
            Self::FourToSix => "4-6",
            Self::SevenPlus => "7+",
        }
    }
}

impl std::str::FromStr for LanguageCount {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1-3" => Ok(Self::OneToThree),
            "4-6" => Ok(Self::FourToSix),
            "7+" => Ok(Self::SevenPlus),
            other => Err(format!("unsupported language count `{other}` (expected 1-3|4-6|7+)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseSelectionMethod {
    Manual,
    Questionnaire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionnaireAnswers {
    pub proprietary_code_percentage: u8,
    pub code_completion_importance: u8,
    pub multi_repo_work: YesNo,
    pub programming_languages: LanguageCount,
    pub needs_enterprise_security: YesNo,
}

impl Default for QuestionnaireAnswers {
    fn default() -> Self {
        Self {
            proprietary_code_percentage: 50,
            code_completion_importance: 3,
            multi_repo_work: YesNo::No,
            programming_languages: LanguageCount::OneToThree,
            needs_enterprise_security: YesNo::No,
        }
    }
}

impl QuestionnaireAnswers {
    /// Returns one issue per answer that falls outside its slider range.
    pub fn range_issues(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        if self.proprietary_code_percentage > 100 {
            issues.push(FieldIssue::new(
                DraftField::ProprietaryCodePercentage,
                "Proprietary code percentage must be between 0 and 100.",
            ));
        }
        if !(1..=5).contains(&self.code_completion_importance) {
            issues.push(FieldIssue::new(
                DraftField::CodeCompletionImportance,
                "Code completion importance must be between 1 and 5.",
            ));
        }
        issues
    }
}

/// How license counts are produced in step two.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LicenseSelection {
    #[default]
    Manual,
    Questionnaire { answers: QuestionnaireAnswers },
}

impl LicenseSelection {
    pub fn method(&self) -> LicenseSelectionMethod {
        match self {
            Self::Manual => LicenseSelectionMethod::Manual,
            Self::Questionnaire { .. } => LicenseSelectionMethod::Questionnaire,
        }
    }

    pub fn for_method(method: LicenseSelectionMethod) -> Self {
        match method {
            LicenseSelectionMethod::Manual => Self::Manual,
            LicenseSelectionMethod::Questionnaire => {
                Self::Questionnaire { answers: QuestionnaireAnswers::default() }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    CompanyName,
    TeamSize,
    EnterpriseLicenses,
    CascadeLicenses,
    ProprietaryCodePercentage,
    CodeCompletionImportance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: DraftField,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    LicenseCountMismatch { licensed_seats: u64, team_size: u32 },
}

impl ConsistencyWarning {
    pub fn message(&self) -> String {
        match self {
            Self::LicenseCountMismatch { licensed_seats, team_size } => format!(
                "The total number of licenses ({licensed_seats}) does not match your team size ({team_size})."
            ),
        }
    }
}

/// In-progress quote owned by a single wizard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub company_name: String,
    pub team_size: Option<u32>,
    pub selection: LicenseSelection,
    pub licenses: LicenseMix,
}

impl QuoteDraft {
    pub fn company_info_issues(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        if self.company_name.trim().is_empty() {
            issues.push(FieldIssue::new(
                DraftField::CompanyName,
                "Please provide your company name.",
            ));
        }
        if self.team_size.unwrap_or(0) < 1 {
            issues.push(FieldIssue::new(
                DraftField::TeamSize,
                "Please provide your team size (minimum 1).",
            ));
        }
        issues
    }

    /// Advisory check for manually entered counts; questionnaire mixes always sum exactly.
    pub fn consistency_warning(&self) -> Option<ConsistencyWarning> {
        if self.selection.method() != LicenseSelectionMethod::Manual {
            return None;
        }
        let team_size = self.team_size.unwrap_or(0);
        let licensed_seats = self.licenses.seats();
        (licensed_seats != u64::from(team_size))
            .then_some(ConsistencyWarning::LicenseCountMismatch { licensed_seats, team_size })
    }
}
