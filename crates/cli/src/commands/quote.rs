use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use quotewise_core::cpq::pricing::PricingResult;
use quotewise_core::domain::draft::LicenseSelectionMethod;
use quotewise_core::domain::quote::{QuoteRecord, UuidQuoteIds};
use quotewise_core::wizard::{
    Clock, DefaultRuntime, FixedClock, SystemClock, Wizard, WizardError, WizardEvent,
};
use serde::Serialize;

use crate::commands::recommend::QuestionnaireArgs;
use crate::commands::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Manual,
    Questionnaire,
}

impl From<MethodArg> for LicenseSelectionMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Manual => Self::Manual,
            MethodArg::Questionnaire => Self::Questionnaire,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Company the quote is prepared for")]
    pub company: String,
    #[arg(long, help = "Development team size (minimum 1)")]
    pub team_size: u32,
    #[arg(long, value_enum, default_value_t = MethodArg::Manual)]
    pub method: MethodArg,
    #[arg(long, default_value_t = 0, help = "Enterprise seats (manual method)")]
    pub enterprise: u32,
    #[arg(long, default_value_t = 0, help = "Cascade seats (manual method)")]
    pub cascade: u32,
    #[command(flatten)]
    pub questionnaire: QuestionnaireArgs,
    #[arg(long, help = "Quote date as YYYY-MM-DD; defaults to today (UTC)")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct QuoteReport {
    record: QuoteRecord,
    document: String,
    pricing: PricingResult,
    warnings: Vec<String>,
}

/// Drives the wizard through all three steps and prints the issued record.
pub fn run(args: &QuoteArgs) -> CommandResult {
    let clock = FixedClock(args.date.unwrap_or_else(|| SystemClock.today()));
    let mut wizard = Wizard::with_parts(DefaultRuntime::default(), clock, UuidQuoteIds);

    let method = LicenseSelectionMethod::from(args.method);
    let selection = match method {
        LicenseSelectionMethod::Manual => {
            WizardEvent::EnterLicenses { enterprise: args.enterprise, cascade: args.cascade }
        }
        LicenseSelectionMethod::Questionnaire => {
            WizardEvent::AnswerQuestionnaire { answers: args.questionnaire.answers() }
        }
    };
    let events = [
        WizardEvent::UpdateCompany {
            company_name: args.company.clone(),
            team_size: Some(args.team_size),
        },
        WizardEvent::Next,
        WizardEvent::SelectMethod { method },
        selection,
        WizardEvent::Next,
        WizardEvent::Finalize,
    ];

    let mut warnings = Vec::new();
    for event in events {
        match wizard.apply(event) {
            Ok(outcome) => warnings.extend(outcome.warnings.iter().map(|warning| warning.message())),
            Err(error) => return wizard_failure(&error),
        }
    }
    warnings.dedup();

    let Some(record) = wizard.record().cloned() else {
        return CommandResult::failure("quote", "internal", "wizard finalized without a record", 1);
    };
    CommandResult::report(
        "quote",
        &QuoteReport {
            document: record.document_file_name(),
            pricing: wizard.pricing(),
            record,
            warnings,
        },
    )
}

fn wizard_failure(error: &WizardError) -> CommandResult {
    match error {
        WizardError::Validation { .. } => {
            let details =
                error.issues().iter().map(|issue| issue.message.as_str()).collect::<Vec<_>>();
            CommandResult::failure("quote", "validation", details.join(" "), 2)
        }
        WizardError::InvalidTransition { .. } | WizardError::Record(_) => {
            CommandResult::failure("quote", "wizard", error.to_string(), 3)
        }
    }
}
