use thiserror::Error;

use crate::crm::SubmissionError;
use crate::domain::draft::FieldIssue;
use crate::{domain::quote::QuoteRecordError, wizard::WizardError};

const INVALID_QUOTE_DATA: &str = "Invalid quote data";
const MISSING_REQUIRED_DATA: &str = "Missing required data";
const INTERNAL_ERROR: &str = "An unexpected internal error occurred.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    QuoteRecord(#[from] QuoteRecordError),
    #[error("quote payload could not be decoded: {0}")]
    MalformedQuote(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("request is missing {0}")]
    MissingInput(&'static str),
    #[error("wizard session `{0}` not found")]
    SessionNotFound(String),
    #[error("quote has not been finalized for session `{0}`")]
    QuoteNotFinalized(String),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("CRM integration is disabled")]
    CrmDisabled,
    #[error("document export failure: {0}")]
    Export(String),
}

impl From<WizardError> for ApplicationError {
    fn from(value: WizardError) -> Self {
        Self::Domain(DomainError::Wizard(value))
    }
}

/// Transport-facing error. `summary` is what callers see; `message` carries
/// the underlying cause for logs and the `details` field.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { summary: &'static str, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { message: String, issues: Vec<FieldIssue>, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { summary: &'static str, message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { summary, .. } | Self::Internal { summary, .. } => summary,
            Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::Unprocessable { message, .. }
            | Self::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Underlying cause, only for variants whose summary hides it.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::BadRequest { message, .. } | Self::Internal { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn issues(&self) -> &[FieldIssue] {
        match self {
            Self::Unprocessable { issues, .. } => issues,
            _ => &[],
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        let message = value.to_string();
        match value {
            ApplicationError::Domain(DomainError::Wizard(error)) => match error {
                WizardError::InvalidTransition { .. } => Self::Conflict { message, correlation_id },
                WizardError::Validation { .. } | WizardError::Record(_) => {
                    Self::Unprocessable { message, issues: error.issues().to_vec(), correlation_id }
                }
            },
            ApplicationError::Domain(
                DomainError::QuoteRecord(_) | DomainError::MalformedQuote(_),
            ) => Self::BadRequest { summary: INVALID_QUOTE_DATA, message, correlation_id },
            ApplicationError::MissingInput(_) => {
                Self::BadRequest { summary: MISSING_REQUIRED_DATA, message, correlation_id }
            }
            ApplicationError::SessionNotFound(_) => Self::NotFound { message, correlation_id },
            ApplicationError::QuoteNotFinalized(_) => Self::Conflict { message, correlation_id },
            ApplicationError::Submission(error @ SubmissionError::InvalidEmail(_)) => {
                Self::BadRequest { summary: error.user_message(), message, correlation_id }
            }
            ApplicationError::Submission(error @ SubmissionError::Crm(_)) => {
                Self::Internal { summary: error.user_message(), message, correlation_id }
            }
            ApplicationError::CrmDisabled => Self::ServiceUnavailable { message, correlation_id },
            ApplicationError::Export(_) => {
                Self::Internal { summary: INTERNAL_ERROR, message, correlation_id }
            }
        }
    }
}
