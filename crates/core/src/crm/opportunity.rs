use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::cpq::pricing::format_usd;
use crate::crm::email::ContactEmail;
use crate::domain::quote::QuoteRecord;

pub const STAGE_NAME: &str = "Prospecting";
pub const LEAD_SOURCE: &str = "Web Quote Tool";
pub const OPPORTUNITY_TYPE: &str = "New Customer";
pub const CLOSE_DATE_OFFSET_DAYS: u64 = 30;

const SEPARATOR: &str = "---------------------------";

/// Field sets tried in order when creating an opportunity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunitySchema {
    /// Standard fields plus the `*Email__c` custom fields.
    Extended,
    /// Standard fields only; the contact email is appended to the description.
    Standard,
}

impl OpportunitySchema {
    pub const FALLBACK_ORDER: [OpportunitySchema; 2] =
        [OpportunitySchema::Extended, OpportunitySchema::Standard];
}

/// Salesforce `Opportunity` create payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Opportunity {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "StageName")]
    pub stage_name: &'static str,
    #[serde(rename = "CloseDate")]
    pub close_date: chrono::NaiveDate,
    #[serde(rename = "Amount")]
    pub amount: u64,
    #[serde(rename = "NextStep")]
    pub next_step: String,
    #[serde(rename = "LeadSource")]
    pub lead_source: &'static str,
    #[serde(rename = "Type")]
    pub opportunity_type: &'static str,
    #[serde(rename = "Email__c", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "Customer_Email__c", skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(rename = "Contact_Email__c", skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl Opportunity {
    pub fn from_quote(
        record: &QuoteRecord,
        email: &ContactEmail,
        schema: OpportunitySchema,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let today = generated_at.date_naive();
        let close_date = today.checked_add_days(Days::new(CLOSE_DATE_OFFSET_DAYS)).unwrap_or(today);
        let mut description = describe_quote(record, email, generated_at);
        let custom_email = match schema {
            OpportunitySchema::Extended => Some(email.to_string()),
            OpportunitySchema::Standard => {
                description.push_str(&format!("\n\nCONTACT EMAIL: {email}"));
                None
            }
        };

        Self {
            name: format!("Quote for {}", record.company_name()),
            description,
            stage_name: STAGE_NAME,
            close_date,
            amount: record.total_cost(),
            next_step: format!("Contact customer at: {email}"),
            lead_source: LEAD_SOURCE,
            opportunity_type: OPPORTUNITY_TYPE,
            email: custom_email.clone(),
            customer_email: custom_email.clone(),
            contact_email: custom_email,
        }
    }

    pub fn schema(&self) -> OpportunitySchema {
        if self.email.is_some() {
            OpportunitySchema::Extended
        } else {
            OpportunitySchema::Standard
        }
    }
}

fn describe_quote(record: &QuoteRecord, email: &ContactEmail, generated_at: DateTime<Utc>) -> String {
    let licenses = record.licenses();
    [
        "QUOTE DETAILS:".to_string(),
        SEPARATOR.to_string(),
        format!("Contact Email: {email}"),
        format!("Company: {}", record.company_name()),
        format!("Quote ID: {}", record.quote_id()),
        format!("Quote Date: {}", record.quote_date()),
        format!("Expiry Date: {}", record.expiry_date()),
        SEPARATOR.to_string(),
        "LICENSE DETAILS:".to_string(),
        format!("Cascade Licenses: {}", licenses.cascade),
        format!("Enterprise Licenses: {}", licenses.enterprise),
        SEPARATOR.to_string(),
        format!("Total Cost: {}", format_usd(record.total_cost())),
        SEPARATOR.to_string(),
        format!("Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]
    .join("\n")
}
