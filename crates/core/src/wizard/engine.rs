use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::cpq::pricing::{LinearPricingEngine, PricingResult};
use crate::cpq::recommendation::FiveFactorHeuristic;
use crate::cpq::{CpqRuntime, DeterministicCpqRuntime};
use crate::domain::draft::{
    ConsistencyWarning, FieldIssue, LicenseSelection, LicenseSelectionMethod, QuoteDraft,
};
use crate::domain::license::LicenseMix;
use crate::domain::quote::{QuoteIdGenerator, QuoteRecord, QuoteRecordError, UuidQuoteIds};
use crate::wizard::states::{
    TransitionOutcome, WizardAction, WizardEvent, WizardEventKind, WizardState, WizardStep,
};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Current UTC calendar date.
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Clone, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("{} step has {} invalid field(s)", .step.title(), .issues.len())]
    Validation { step: WizardStep, issues: Vec<FieldIssue> },
    #[error("event {event:?} is not allowed in state {state:?}")]
    InvalidTransition { state: WizardState, event: WizardEventKind },
    #[error(transparent)]
    Record(#[from] QuoteRecordError),
}

impl WizardError {
    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Validation { issues, .. } => issues,
            _ => &[],
        }
    }
}

pub type DefaultRuntime = DeterministicCpqRuntime<FiveFactorHeuristic, LinearPricingEngine>;

/// Three-step quote wizard. Owns its draft and, once finalized, the issued record.
pub struct Wizard<R = DefaultRuntime, C = SystemClock, G = UuidQuoteIds> {
    runtime: R,
    clock: C,
    ids: G,
    state: WizardState,
    draft: QuoteDraft,
    record: Option<QuoteRecord>,
    warnings: Vec<ConsistencyWarning>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Self::with_parts(DefaultRuntime::default(), SystemClock, UuidQuoteIds)
    }
}

impl<R, C, G> Wizard<R, C, G>
where
    R: CpqRuntime,
    C: Clock,
    G: QuoteIdGenerator,
{
    pub fn with_parts(runtime: R, clock: C, ids: G) -> Self {
        Self {
            runtime,
            clock,
            ids,
            state: WizardState::START,
            draft: QuoteDraft::default(),
            record: None,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn step(&self) -> Option<WizardStep> {
        self.state.step()
    }

    pub fn draft(&self) -> &QuoteDraft {
        &self.draft
    }

    pub fn record(&self) -> Option<&QuoteRecord> {
        self.record.as_ref()
    }

    /// Warnings raised by the most recent accepted event.
    pub fn warnings(&self) -> &[ConsistencyWarning] {
        &self.warnings
    }

    /// Prices the issued record when finalized, otherwise the draft's current counts.
    pub fn pricing(&self) -> PricingResult {
        let licenses = self.record.as_ref().map_or(self.draft.licenses, QuoteRecord::licenses);
        self.runtime.price(licenses)
    }

    pub fn apply(&mut self, event: WizardEvent) -> Result<TransitionOutcome, WizardError> {
        let from = self.state;
        let kind = event.kind();
        let (to, actions, warnings) = self.transition(event)?;

        self.state = to;
        self.warnings = warnings.clone();
        Ok(TransitionOutcome { from, to, event: kind, actions, warnings })
    }

    pub fn apply_with_audit<S>(
        &mut self,
        event: WizardEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, WizardError>
    where
        S: AuditSink + ?Sized,
    {
        let state = self.state;
        let kind = event.kind();
        let result = self.apply(event);
        let quote_id = self.record.as_ref().map(|record| record.quote_id().clone());

        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "wizard.transition_applied",
                        AuditCategory::Wizard,
                        AuditOutcome::Success,
                    )
                    .with_quote_id(quote_id)
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event))
                    .with_metadata("warnings", outcome.warnings.len().to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "wizard.transition_rejected",
                        AuditCategory::Wizard,
                        AuditOutcome::Rejected,
                    )
                    .with_quote_id(quote_id)
                    .with_metadata("state", format!("{state:?}"))
                    .with_metadata("event", format!("{kind:?}"))
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn transition(
        &mut self,
        event: WizardEvent,
    ) -> Result<(WizardState, Vec<WizardAction>, Vec<ConsistencyWarning>), WizardError> {
        use WizardStep::{CompanyInfo, LicenseSelection as Licenses, Review};

        let state = self.state;
        let kind = event.kind();

        match (state, event) {
            (_, WizardEvent::Reset) => {
                self.draft = QuoteDraft::default();
                self.record = None;
                Ok((WizardState::START, vec![WizardAction::DiscardDraft], Vec::new()))
            }

            (
                WizardState::Authoring { step: CompanyInfo },
                WizardEvent::UpdateCompany { company_name, team_size },
            ) => {
                self.draft.company_name = company_name;
                self.draft.team_size = team_size;
                Ok((state, vec![WizardAction::RecordDraftChange], Vec::new()))
            }
            (WizardState::Authoring { step: CompanyInfo }, WizardEvent::Next) => {
                let issues = self.draft.company_info_issues();
                if !issues.is_empty() {
                    return Err(WizardError::Validation { step: CompanyInfo, issues });
                }
                Ok((
                    WizardState::Authoring { step: Licenses },
                    vec![WizardAction::PromptForLicenseSelection],
                    Vec::new(),
                ))
            }

            (WizardState::Authoring { step: Licenses }, WizardEvent::SelectMethod { method }) => {
                if self.draft.selection.method() != method {
                    self.draft.selection = LicenseSelection::for_method(method);
                }
                Ok((state, vec![WizardAction::RecordDraftChange], Vec::new()))
            }
            (WizardState::Authoring { step: Licenses }, WizardEvent::EnterLicenses { enterprise, cascade })
                if self.draft.selection.method() == LicenseSelectionMethod::Manual =>
            {
                self.draft.licenses = LicenseMix::new(enterprise, cascade);
                let warnings = self.draft.consistency_warning().into_iter().collect();
                Ok((state, vec![WizardAction::RecordDraftChange], warnings))
            }
            (WizardState::Authoring { step: Licenses }, WizardEvent::AnswerQuestionnaire { answers })
                if self.draft.selection.method() == LicenseSelectionMethod::Questionnaire =>
            {
                let issues = answers.range_issues();
                if !issues.is_empty() {
                    return Err(WizardError::Validation { step: Licenses, issues });
                }
                self.draft.selection = LicenseSelection::Questionnaire { answers };
                Ok((state, vec![WizardAction::RecordDraftChange], Vec::new()))
            }
            (WizardState::Authoring { step: Licenses }, WizardEvent::Next) => {
                let mut actions = Vec::new();
                if let LicenseSelection::Questionnaire { answers } = &self.draft.selection {
                    let team_size = self.draft.team_size.unwrap_or(0);
                    self.draft.licenses = self.runtime.recommend(team_size, answers);
                    actions.push(WizardAction::ApplyRecommendation);
                }
                actions.push(WizardAction::PresentReview);
                let warnings = self.draft.consistency_warning().into_iter().collect();
                Ok((WizardState::Authoring { step: Review }, actions, warnings))
            }
            (WizardState::Authoring { step: Licenses }, WizardEvent::Back) => {
                Ok((WizardState::Authoring { step: CompanyInfo }, Vec::new(), Vec::new()))
            }

            (WizardState::Authoring { step: Review }, WizardEvent::Back) => {
                Ok((WizardState::Authoring { step: Licenses }, Vec::new(), Vec::new()))
            }
            (WizardState::Authoring { step: Review }, WizardEvent::Finalize) => {
                let issues = self.draft.company_info_issues();
                if !issues.is_empty() {
                    return Err(WizardError::Validation { step: Review, issues });
                }
                let team_size = self.draft.team_size.unwrap_or(0);
                let record = QuoteRecord::issue(
                    self.ids.next_id(),
                    self.draft.company_name.clone(),
                    team_size,
                    self.draft.licenses,
                    self.clock.today(),
                )?;
                self.record = Some(record);
                Ok((
                    WizardState::Finalized,
                    vec![WizardAction::PriceQuote, WizardAction::IssueQuoteRecord],
                    Vec::new(),
                ))
            }

            (WizardState::Finalized, WizardEvent::EditLicenses { enterprise, cascade }) => {
                let Some(record) = self.record.as_ref() else {
                    return Err(WizardError::InvalidTransition { state, event: kind });
                };
                let updated = record.with_licenses(LicenseMix::new(enterprise, cascade))?;
                self.draft.licenses = updated.licenses();
                self.draft.team_size = Some(updated.team_size());
                self.record = Some(updated);
                Ok((state, vec![WizardAction::RepriceQuote], Vec::new()))
            }

            (WizardState::Authoring { .. } | WizardState::Finalized, _) => {
                Err(WizardError::InvalidTransition { state, event: kind })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::cpq::DeterministicCpqRuntime;
    use crate::domain::draft::{
        ConsistencyWarning, DraftField, LanguageCount, LicenseSelection, LicenseSelectionMethod,
        QuestionnaireAnswers, YesNo,
    };
    use crate::domain::license::LicenseMix;
    use crate::domain::quote::{QuoteId, QuoteIdGenerator, QuoteRecordError};
    use crate::wizard::states::{WizardAction, WizardEvent, WizardEventKind, WizardState, WizardStep};

    use super::{FixedClock, Wizard, WizardError};

    struct FixedIds;

    impl QuoteIdGenerator for FixedIds {
        fn next_id(&self) -> QuoteId {
            QuoteId::parse("Q1W2E3R4").expect("fixed id")
        }
    }

    fn issued_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("date")
    }

    fn wizard() -> Wizard<super::DefaultRuntime, FixedClock, FixedIds> {
        Wizard::with_parts(DeterministicCpqRuntime::default(), FixedClock(issued_on()), FixedIds)
    }

    fn company(name: &str, team_size: Option<u32>) -> WizardEvent {
        WizardEvent::UpdateCompany { company_name: name.to_string(), team_size }
    }

    fn at_license_step(team_size: u32) -> Wizard<super::DefaultRuntime, FixedClock, FixedIds> {
        let mut wizard = wizard();
        wizard.apply(company("Acme", Some(team_size))).expect("company");
        wizard.apply(WizardEvent::Next).expect("advance");
        wizard
    }

    #[test]
    fn manual_flow_issues_priced_record() {
        let mut wizard = at_license_step(10);
        wizard.apply(WizardEvent::EnterLicenses { enterprise: 7, cascade: 3 }).expect("counts");
        let review = wizard.apply(WizardEvent::Next).expect("review");
        assert!(review.warnings.is_empty());
        assert_eq!(review.actions, vec![WizardAction::PresentReview]);

        let outcome = wizard.apply(WizardEvent::Finalize).expect("finalize");

        assert_eq!(outcome.to, WizardState::Finalized);
        assert_eq!(outcome.actions, vec![WizardAction::PriceQuote, WizardAction::IssueQuoteRecord]);
        let record = wizard.record().expect("record");
        assert_eq!(record.total_cost(), 13_000);
        assert_eq!(record.quote_id().as_str(), "Q1W2E3R4");
        assert_eq!(record.quote_date(), issued_on());
        assert_eq!(record.expiry_date(), NaiveDate::from_ymd_opt(2026, 4, 1).expect("date"));
        assert_eq!(wizard.pricing().total, 13_000);
    }

    #[test]
    fn questionnaire_flow_applies_recommendation_on_next() {
        let mut wizard = at_license_step(20);
        wizard
            .apply(WizardEvent::SelectMethod { method: LicenseSelectionMethod::Questionnaire })
            .expect("method");
        wizard
            .apply(WizardEvent::AnswerQuestionnaire {
                answers: QuestionnaireAnswers {
                    proprietary_code_percentage: 100,
                    code_completion_importance: 5,
                    multi_repo_work: YesNo::Yes,
                    programming_languages: LanguageCount::SevenPlus,
                    needs_enterprise_security: YesNo::No,
                },
            })
            .expect("answers");

        let outcome = wizard.apply(WizardEvent::Next).expect("review");

        assert_eq!(outcome.actions, vec![WizardAction::ApplyRecommendation, WizardAction::PresentReview]);
        assert_eq!(wizard.draft().licenses, LicenseMix::new(3, 17));
        wizard.apply(WizardEvent::Finalize).expect("finalize");
        assert_eq!(wizard.record().map(|record| record.total_cost()), Some(37_000));
    }

    #[test]
    fn company_step_guard_reports_each_missing_field() {
        let mut wizard = wizard();
        wizard.apply(company("", Some(0))).expect("update");

        let error = wizard.apply(WizardEvent::Next).expect_err("guarded");

        let fields: Vec<_> = error.issues().iter().map(|issue| issue.field).collect();
        assert_eq!(fields, vec![DraftField::CompanyName, DraftField::TeamSize]);
        assert_eq!(wizard.step(), Some(WizardStep::CompanyInfo));

        wizard.apply(company("Acme", Some(1))).expect("update");
        assert!(wizard.apply(WizardEvent::Next).is_ok());
    }

    #[test]
    fn manual_mismatch_warns_without_blocking() {
        let mut wizard = at_license_step(10);
        let entered = wizard.apply(WizardEvent::EnterLicenses { enterprise: 2, cascade: 2 }).expect("counts");
        assert_eq!(
            entered.warnings,
            vec![ConsistencyWarning::LicenseCountMismatch { licensed_seats: 4, team_size: 10 }]
        );

        let review = wizard.apply(WizardEvent::Next).expect("review");
        assert_eq!(review.to, WizardState::Authoring { step: WizardStep::Review });
        assert_eq!(wizard.warnings().len(), 1);
    }

    #[test]
    fn out_of_range_answers_leave_draft_unchanged() {
        let mut wizard = at_license_step(5);
        wizard
            .apply(WizardEvent::SelectMethod { method: LicenseSelectionMethod::Questionnaire })
            .expect("method");

        let error = wizard
            .apply(WizardEvent::AnswerQuestionnaire {
                answers: QuestionnaireAnswers {
                    code_completion_importance: 9,
                    ..QuestionnaireAnswers::default()
                },
            })
            .expect_err("out of range");

        assert!(matches!(error, WizardError::Validation { step: WizardStep::LicenseSelection, .. }));
        assert_eq!(
            wizard.draft().selection,
            LicenseSelection::Questionnaire { answers: QuestionnaireAnswers::default() }
        );
    }

    #[test]
    fn events_outside_their_step_are_invalid_transitions() {
        let mut wizard = wizard();
        let error = wizard.apply(WizardEvent::Finalize).expect_err("not in review");
        assert_eq!(
            error,
            WizardError::InvalidTransition {
                state: WizardState::START,
                event: WizardEventKind::Finalize,
            }
        );

        let mut wizard = at_license_step(4);
        let error = wizard
            .apply(WizardEvent::AnswerQuestionnaire { answers: QuestionnaireAnswers::default() })
            .expect_err("manual method");
        assert!(matches!(error, WizardError::InvalidTransition { .. }));
    }

    #[test]
    fn back_preserves_answers_and_counts() {
        let mut wizard = at_license_step(20);
        wizard
            .apply(WizardEvent::SelectMethod { method: LicenseSelectionMethod::Questionnaire })
            .expect("method");
        let answers = QuestionnaireAnswers { proprietary_code_percentage: 80, ..QuestionnaireAnswers::default() };
        wizard.apply(WizardEvent::AnswerQuestionnaire { answers }).expect("answers");
        wizard.apply(WizardEvent::Next).expect("review");
        let recommended = wizard.draft().licenses;

        wizard.apply(WizardEvent::Back).expect("back to licenses");
        wizard.apply(WizardEvent::Back).expect("back to company");

        assert_eq!(wizard.step(), Some(WizardStep::CompanyInfo));
        assert_eq!(wizard.draft().selection, LicenseSelection::Questionnaire { answers });
        assert_eq!(wizard.draft().licenses, recommended);
    }

    #[test]
    fn reselecting_current_method_keeps_answers() {
        let mut wizard = at_license_step(8);
        let questionnaire = WizardEvent::SelectMethod { method: LicenseSelectionMethod::Questionnaire };
        wizard.apply(questionnaire.clone()).expect("method");
        let answers = QuestionnaireAnswers { multi_repo_work: YesNo::Yes, ..QuestionnaireAnswers::default() };
        wizard.apply(WizardEvent::AnswerQuestionnaire { answers }).expect("answers");

        wizard.apply(questionnaire).expect("same method");

        assert_eq!(wizard.draft().selection, LicenseSelection::Questionnaire { answers });
    }

    fn finalized() -> Wizard<super::DefaultRuntime, FixedClock, FixedIds> {
        let mut wizard = at_license_step(10);
        wizard.apply(WizardEvent::EnterLicenses { enterprise: 7, cascade: 3 }).expect("counts");
        wizard.apply(WizardEvent::Next).expect("review");
        wizard.apply(WizardEvent::Finalize).expect("finalize");
        wizard
    }

    #[test]
    fn edit_licenses_reprices_but_keeps_identity() {
        let mut wizard = finalized();

        let outcome = wizard.apply(WizardEvent::EditLicenses { enterprise: 2, cascade: 5 }).expect("edit");

        assert_eq!(outcome.actions, vec![WizardAction::RepriceQuote]);
        let record = wizard.record().expect("record");
        assert_eq!(record.total_cost(), 12_000);
        assert_eq!(record.team_size(), 7);
        assert_eq!(record.quote_id().as_str(), "Q1W2E3R4");
        assert_eq!(record.quote_date(), issued_on());

        let first = record.clone();
        wizard.apply(WizardEvent::EditLicenses { enterprise: 2, cascade: 5 }).expect("edit again");
        assert_eq!(wizard.record(), Some(&first));
    }

    #[test]
    fn edit_licenses_overflowing_team_size_keeps_record() {
        let mut wizard = finalized();
        let before = wizard.record().cloned();

        let error = wizard
            .apply(WizardEvent::EditLicenses { enterprise: u32::MAX, cascade: u32::MAX })
            .expect_err("overflow");

        assert!(matches!(error, WizardError::Record(QuoteRecordError::TeamSizeOverflow { .. })));
        assert_eq!(wizard.record().cloned(), before);
    }

    #[test]
    fn reset_after_finalize_returns_to_empty_first_step() {
        let mut wizard = finalized();

        let outcome = wizard.apply(WizardEvent::Reset).expect("reset");

        assert_eq!(outcome.to, WizardState::START);
        assert_eq!(outcome.actions, vec![WizardAction::DiscardDraft]);
        assert!(wizard.record().is_none());
        assert_eq!(wizard.draft(), &Default::default());
    }

    #[test]
    fn audit_sink_receives_applied_and_rejected_transitions() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, Some("session-9".to_string()), "req-9", "wizard");
        let mut wizard = wizard();

        wizard.apply_with_audit(WizardEvent::Next, &sink, &context).expect_err("guarded");
        wizard.apply_with_audit(company("Acme", Some(3)), &sink, &context).expect("update");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "wizard.transition_rejected");
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[1].event_type, "wizard.transition_applied");
        assert_eq!(events[1].metadata.get("event").map(String::as_str), Some("UpdateCompany"));
    }
}
