//! Salesforce REST client for opportunity creation.
//!
//! Authenticates with the OAuth2 username-password flow on every submission
//! and posts to the `Opportunity` sObject endpoint.

use std::time::Duration;

use async_trait::async_trait;
use quotewise_core::config::CrmConfig;
use quotewise_core::crm::{CrmClient, CrmCreateError, Opportunity};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{error, info};

const INVALID_FIELD: &str = "INVALID_FIELD";

#[derive(Clone, Debug)]
pub struct SalesforceClient {
    client: Client,
    token_url: String,
    api_version: String,
    credentials: PasswordCredentials,
}

#[derive(Clone, Debug)]
struct PasswordCredentials {
    client_id: String,
    client_secret: SecretString,
    username: String,
    password: SecretString,
    security_token: Option<SecretString>,
}

#[derive(Debug, thiserror::Error)]
pub enum SalesforceSetupError {
    #[error("crm credentials are incomplete: {0} is missing")]
    MissingCredential(&'static str),
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: Option<String>,
    success: bool,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorItem {
    #[serde(default)]
    message: String,
    #[serde(default, alias = "statusCode")]
    error_code: String,
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug)]
struct Session {
    access_token: SecretString,
    instance_url: String,
}

impl SalesforceClient {
    pub fn from_config(config: &CrmConfig) -> Result<Self, SalesforceSetupError> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let credentials = PasswordCredentials {
            client_id: config
                .client_id
                .clone()
                .ok_or(SalesforceSetupError::MissingCredential("crm.client_id"))?,
            client_secret: config
                .client_secret
                .clone()
                .ok_or(SalesforceSetupError::MissingCredential("crm.client_secret"))?,
            username: config
                .username
                .clone()
                .ok_or(SalesforceSetupError::MissingCredential("crm.username"))?,
            password: config
                .password
                .clone()
                .ok_or(SalesforceSetupError::MissingCredential("crm.password"))?,
            security_token: config.security_token.clone(),
        };

        Ok(Self {
            client,
            token_url: config.token_url(),
            api_version: config.api_version.clone(),
            credentials,
        })
    }

    async fn login(&self) -> Result<Session, CrmCreateError> {
        let credentials = &self.credentials;
        let password = format!(
            "{}{}",
            credentials.password.expose_secret(),
            credentials.security_token.as_ref().map(|token| token.expose_secret()).unwrap_or("")
        );

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.expose_secret()),
                ("username", credentials.username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await
            .map_err(|error| {
                error!(
                    event_name = "crm.salesforce.login_failed",
                    error = %error,
                    "salesforce token request failed"
                );
                CrmCreateError::Transport(error.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CrmCreateError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response.json().await.map_err(|error| {
            CrmCreateError::Auth(format!("failed to decode token response: {error}"))
        })?;
        if token.access_token.is_empty() {
            return Err(CrmCreateError::Auth("token endpoint returned empty access token".to_string()));
        }

        info!(
            event_name = "crm.salesforce.login_succeeded",
            instance_url = %token.instance_url,
            "connected to salesforce"
        );
        Ok(Session { access_token: token.access_token.into(), instance_url: token.instance_url })
    }

    fn opportunity_url(&self, instance_url: &str) -> String {
        format!(
            "{}/services/data/v{}/sobjects/Opportunity/",
            instance_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

#[async_trait]
impl CrmClient for SalesforceClient {
    async fn create_opportunity(&self, opportunity: &Opportunity) -> Result<String, CrmCreateError> {
        let session = self.login().await?;

        let response = self
            .client
            .post(self.opportunity_url(&session.instance_url))
            .bearer_auth(session.access_token.expose_secret())
            .json(opportunity)
            .send()
            .await
            .map_err(|error| CrmCreateError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| CrmCreateError::Transport(error.to_string()))?;
        parse_create_response(status, &body)
    }
}

/// Maps a create response to the record id or a classified error.
fn parse_create_response(status: StatusCode, body: &str) -> Result<String, CrmCreateError> {
    if status.is_success() {
        let created: CreateResponse = serde_json::from_str(body).map_err(|error| {
            CrmCreateError::Transport(format!("failed to decode create response: {error}"))
        })?;
        return match (created.success, created.id) {
            (true, Some(id)) => Ok(id),
            _ => Err(classify_errors(created.errors)),
        };
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(CrmCreateError::Auth(format!("salesforce returned {status}")));
    }

    match serde_json::from_str::<Vec<ApiErrorItem>>(body) {
        Ok(items) if !items.is_empty() => Err(classify_errors(items)),
        _ => Err(CrmCreateError::Rejected { code: status.as_u16().to_string(), message: body.to_string() }),
    }
}

fn classify_errors(items: Vec<ApiErrorItem>) -> CrmCreateError {
    if let Some(item) = items.iter().find(|item| item.error_code == INVALID_FIELD) {
        let fields = if item.fields.is_empty() { quoted_fields(&item.message) } else { item.fields.clone() };
        return CrmCreateError::UnrecognizedFields { fields, message: item.message.clone() };
    }

    match items.into_iter().next() {
        Some(item) => CrmCreateError::Rejected { code: item.error_code, message: item.message },
        None => CrmCreateError::Rejected {
            code: "UNKNOWN".to_string(),
            message: "Failed to create quote in Salesforce".to_string(),
        },
    }
}

/// Field names Salesforce quotes in INVALID_FIELD messages, e.g. `No such column 'Email__c'`.
fn quoted_fields(message: &str) -> Vec<String> {
    message
        .split('\'')
        .skip(1)
        .step_by(2)
        .filter(|candidate| candidate.ends_with("__c"))
        .map(str::to_string)
        .collect()
}
