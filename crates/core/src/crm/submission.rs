use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crm::email::ContactEmail;
use crate::crm::opportunity::{Opportunity, OpportunitySchema};
use crate::domain::quote::QuoteRecord;

pub const SUBMISSION_SUCCESS_MESSAGE: &str = "Quote created successfully in Salesforce";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmCreateError {
    #[error("CRM does not recognize field(s) {}: {message}", .fields.join(", "))]
    UnrecognizedFields { fields: Vec<String>, message: String },
    #[error("CRM rejected the opportunity ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("CRM authentication failed: {0}")]
    Auth(String),
    #[error("CRM request failed: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error(transparent)]
    Crm(#[from] CrmCreateError),
}

impl SubmissionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.",
            Self::Crm(_) => "Failed to create opportunity in Salesforce",
        }
    }
}

#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Creates the opportunity and returns the CRM's record id.
    async fn create_opportunity(&self, opportunity: &Opportunity) -> Result<String, CrmCreateError>;
}

#[async_trait]
impl<T> CrmClient for Arc<T>
where
    T: CrmClient + ?Sized,
{
    async fn create_opportunity(&self, opportunity: &Opportunity) -> Result<String, CrmCreateError> {
        self.as_ref().create_opportunity(opportunity).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub success: bool,
    pub external_id: String,
    pub message: String,
    pub schema: OpportunitySchema,
    pub rejected_schemas: Vec<OpportunitySchema>,
}

impl SubmissionReceipt {
    pub fn used_fallback(&self) -> bool {
        !self.rejected_schemas.is_empty()
    }
}

pub struct OpportunitySubmitter<C> {
    client: C,
}

impl<C> OpportunitySubmitter<C>
where
    C: CrmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Walks [`OpportunitySchema::FALLBACK_ORDER`]. Only an unrecognized-field rejection
    /// moves on to the next tier; every other failure is returned as is.
    pub async fn submit(
        &self,
        record: &QuoteRecord,
        email: &ContactEmail,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut rejected_schemas = Vec::new();
        let mut last_error = None;

        for schema in OpportunitySchema::FALLBACK_ORDER {
            let opportunity = Opportunity::from_quote(record, email, schema, now);
            match self.client.create_opportunity(&opportunity).await {
                Ok(external_id) => {
                    return Ok(SubmissionReceipt {
                        success: true,
                        external_id,
                        message: SUBMISSION_SUCCESS_MESSAGE.to_string(),
                        schema,
                        rejected_schemas,
                    });
                }
                Err(error @ CrmCreateError::UnrecognizedFields { .. }) => {
                    rejected_schemas.push(schema);
                    last_error = Some(error);
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(last_error
            .unwrap_or_else(|| CrmCreateError::Transport("no opportunity schema configured".to_string()))
            .into())
    }
}
