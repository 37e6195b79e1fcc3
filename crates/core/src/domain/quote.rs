use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cpq::pricing::price;
use crate::domain::license::LicenseMix;

/// Days a quote stays valid after it is issued.
pub const QUOTE_VALIDITY_DAYS: u64 = 30;

pub const QUOTE_ID_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuoteId(String);

impl QuoteId {
    pub fn parse(raw: &str) -> Result<Self, QuoteRecordError> {
        let valid = raw.len() == QUOTE_ID_LEN
            && raw.chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(QuoteRecordError::InvalidQuoteId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for QuoteId {
    type Error = QuoteRecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<QuoteId> for String {
    fn from(value: QuoteId) -> Self {
        value.0
    }
}

pub trait QuoteIdGenerator: Send + Sync {
    fn next_id(&self) -> QuoteId;
}

/// Takes the first eight hex digits of a random UUID, upper-cased.
#[derive(Clone, Debug, Default)]
pub struct UuidQuoteIds;

impl QuoteIdGenerator for UuidQuoteIds {
    fn next_id(&self) -> QuoteId {
        let simple = Uuid::new_v4().simple().to_string();
        QuoteId(simple[..QUOTE_ID_LEN].to_ascii_uppercase())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuoteRecordError {
    #[error("quote id `{0}` must be 8 uppercase alphanumeric characters")]
    InvalidQuoteId(String),
    #[error("company name is required")]
    MissingCompanyName,
    #[error("expiry date {expiry} must be 30 days after quote date {issued}")]
    InconsistentExpiry { issued: NaiveDate, expiry: NaiveDate },
    #[error("quote date {0} is out of range")]
    DateOutOfRange(NaiveDate),
    #[error("{enterprise} enterprise and {cascade} cascade seats exceed the supported team size")]
    TeamSizeOverflow { enterprise: u32, cascade: u32 },
}

/// Finalized quote. Values are replaced, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuoteRecordPayload")]
pub struct QuoteRecord {
    quote_id: QuoteId,
    quote_date: NaiveDate,
    expiry_date: NaiveDate,
    company_name: String,
    team_size: u32,
    enterprise_licenses: u32,
    cascade_licenses: u32,
    total_cost: u64,
}

impl QuoteRecord {
    pub fn issue(
        quote_id: QuoteId,
        company_name: impl Into<String>,
        team_size: u32,
        licenses: LicenseMix,
        quote_date: NaiveDate,
    ) -> Result<Self, QuoteRecordError> {
        let company_name = company_name.into().trim().to_string();
        if company_name.is_empty() {
            return Err(QuoteRecordError::MissingCompanyName);
        }
        let expiry_date = expiry_for(quote_date)?;

        Ok(Self {
            quote_id,
            quote_date,
            expiry_date,
            company_name,
            team_size,
            enterprise_licenses: licenses.enterprise,
            cascade_licenses: licenses.cascade,
            total_cost: price(licenses.enterprise, licenses.cascade),
        })
    }

    /// Re-prices the quote for new counts; the team size follows the seat total.
    pub fn with_licenses(&self, licenses: LicenseMix) -> Result<Self, QuoteRecordError> {
        let team_size = licenses.enterprise.checked_add(licenses.cascade).ok_or(
            QuoteRecordError::TeamSizeOverflow {
                enterprise: licenses.enterprise,
                cascade: licenses.cascade,
            },
        )?;

        Ok(Self {
            team_size,
            enterprise_licenses: licenses.enterprise,
            cascade_licenses: licenses.cascade,
            total_cost: price(licenses.enterprise, licenses.cascade),
            ..self.clone()
        })
    }

    pub fn quote_id(&self) -> &QuoteId {
        &self.quote_id
    }

    pub fn quote_date(&self) -> NaiveDate {
        self.quote_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn team_size(&self) -> u32 {
        self.team_size
    }

    pub fn licenses(&self) -> LicenseMix {
        LicenseMix::new(self.enterprise_licenses, self.cascade_licenses)
    }

    pub fn total_cost(&self) -> u64 {
        self.total_cost
    }

    pub fn document_file_name(&self) -> String {
        format!("Quote_{}.pdf", self.quote_id)
    }
}

fn expiry_for(quote_date: NaiveDate) -> Result<NaiveDate, QuoteRecordError> {
    quote_date
        .checked_add_days(Days::new(QUOTE_VALIDITY_DAYS))
        .ok_or(QuoteRecordError::DateOutOfRange(quote_date))
}

/// Wire shape accepted from clients. The total is informational only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecordPayload {
    pub quote_id: String,
    pub quote_date: NaiveDate,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    pub company_name: String,
    pub team_size: u32,
    pub enterprise_licenses: u32,
    pub cascade_licenses: u32,
    #[serde(default)]
    pub total_cost: Option<u64>,
}

impl QuoteRecordPayload {
    /// True when the client sent a total that disagrees with the recomputed one.
    pub fn has_stale_total(&self) -> bool {
        self.total_cost
            .is_some_and(|total| total != price(self.enterprise_licenses, self.cascade_licenses))
    }
}

impl TryFrom<QuoteRecordPayload> for QuoteRecord {
    type Error = QuoteRecordError;

    fn try_from(payload: QuoteRecordPayload) -> Result<Self, Self::Error> {
        let quote_id = QuoteId::parse(&payload.quote_id)?;
        let record = Self::issue(
            quote_id,
            payload.company_name,
            payload.team_size,
            LicenseMix::new(payload.enterprise_licenses, payload.cascade_licenses),
            payload.quote_date,
        )?;

        if let Some(expiry) = payload.expiry_date {
            if expiry != record.expiry_date {
                return Err(QuoteRecordError::InconsistentExpiry {
                    issued: record.quote_date,
                    expiry,
                });
            }
        }
        Ok(record)
    }
}
