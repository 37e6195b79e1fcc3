//! Forwarding finalized quotes to the sales CRM as opportunities.
//!
//! The core owns the record-to-opportunity mapping and the schema fallback
//! strategy. Transport lives behind [`CrmClient`] so the server can plug in the
//! Salesforce REST client and tests can plug in a scripted fake.

pub mod email;
pub mod opportunity;
pub mod submission;

pub use email::ContactEmail;
pub use opportunity::{Opportunity, OpportunitySchema};
pub use submission::{
    CrmClient, CrmCreateError, OpportunitySubmitter, SubmissionError, SubmissionReceipt,
};
