use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use quotewise_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use quotewise_core::crm::{ContactEmail, CrmClient, OpportunitySubmitter};
use quotewise_core::domain::draft::FieldIssue;
use quotewise_core::domain::quote::{QuoteRecord, QuoteRecordPayload};
use quotewise_core::errors::{ApplicationError, DomainError, InterfaceError};
use quotewise_core::wizard::{TransitionOutcome, WizardEvent};
use serde::{Deserialize, Serialize};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::document::DocumentRenderer;
use crate::health;
use crate::sessions::{SessionStore, SessionView};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub type SharedSubmitter = Arc<OpportunitySubmitter<Arc<dyn CrmClient>>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub submitter: Option<SharedSubmitter>,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FieldIssue>,
    pub correlation_id: String,
}

impl From<&InterfaceError> for ApiError {
    fn from(error: &InterfaceError) -> Self {
        Self {
            error: error.user_message().to_string(),
            details: error.details().map(str::to_string),
            issues: error.issues().to_vec(),
            correlation_id: error.correlation_id().to_string(),
        }
    }
}

type Rejection = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<T, Rejection>;

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> Rejection {
    let interface = error.into().into_interface(correlation_id);
    (status_for(&interface), Json(ApiError::from(&interface)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[serde(default)]
    pub quote_data: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSessionRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub view: SessionView,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub outcome: TransitionOutcome,
    pub view: SessionView,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    let static_files =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/health", get(health::health))
        .route("/api/quotes", post(create_quote_opportunity))
        .route("/api/v1/wizard/sessions", post(create_session))
        .route("/api/v1/wizard/sessions/{session_id}", get(get_session).delete(delete_session))
        .route("/api/v1/wizard/sessions/{session_id}/events", post(apply_event))
        .route("/api/v1/wizard/sessions/{session_id}/document", get(session_document))
        .route("/api/v1/wizard/sessions/{session_id}/submit", post(submit_session))
        .fallback_service(static_files)
        .with_state(state)
}

/// Creates a CRM opportunity from a quote record built in the browser.
pub async fn create_quote_opportunity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateQuoteRequest>,
) -> ApiResult<Json<SubmissionResponse>> {
    let correlation_id = correlation_id(&headers);
    let (Some(quote_data), Some(email)) = (body.quote_data, non_blank(body.email)) else {
        return Err(reject(ApplicationError::MissingInput("quoteData and email"), &correlation_id));
    };

    let payload: QuoteRecordPayload = serde_json::from_value(quote_data).map_err(|error| {
        reject(DomainError::MalformedQuote(error.to_string()), &correlation_id)
    })?;
    if payload.has_stale_total() {
        warn!(
            event_name = "ingress.quote.stale_total",
            correlation_id = %correlation_id,
            quote_id = %payload.quote_id,
            submitted_total = ?payload.total_cost,
            "submitted total disagrees with recomputed price; using recomputed total"
        );
    }
    let record = QuoteRecord::try_from(payload)
        .map_err(|error| reject(DomainError::from(error), &correlation_id))?;

    submit_record(&state, &record, &email, None, &correlation_id).await
}

pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let view = state.sessions.create().await;
    info!(
        event_name = "wizard.session.created",
        correlation_id = %correlation_id(&headers),
        session_id = %view.session_id,
        "wizard session created"
    );
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id: view.session_id.clone(), view }))
}

pub async fn get_session(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    match state.sessions.view(&session_id).await {
        Some(view) => Ok(Json(view)),
        None => Err(reject(ApplicationError::SessionNotFound(session_id), &correlation_id(&headers))),
    }
}

pub async fn delete_session(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    if state.sessions.remove(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(reject(ApplicationError::SessionNotFound(session_id), &correlation_id(&headers)))
    }
}

pub async fn apply_event(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
    headers: HeaderMap,
    Json(event): Json<WizardEvent>,
) -> ApiResult<Json<EventResponse>> {
    let correlation_id = correlation_id(&headers);
    let (outcome, view) = state
        .sessions
        .apply(&session_id, event, state.audit.as_ref(), &correlation_id)
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    Ok(Json(EventResponse { outcome, view }))
}

/// Renders the session's finalized quote as PDF, or printable HTML without `wkhtmltopdf`.
pub async fn session_document(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let correlation_id = correlation_id(&headers);
    let record = finalized_record(&state, &session_id, &correlation_id).await?;

    let document = state.renderer.render_quote(&record).await.map_err(|error| {
        error!(
            event_name = "export.render_failed",
            correlation_id = %correlation_id,
            quote_id = %record.quote_id(),
            error = %error,
            "quote document rendering failed"
        );
        reject(ApplicationError::Export(error.to_string()), &correlation_id)
    })?;

    state.audit.emit(
        AuditEvent::new(
            &AuditContext::new(
                Some(record.quote_id().clone()),
                Some(session_id),
                correlation_id,
                "web",
            ),
            "export.document_rendered",
            AuditCategory::Export,
            AuditOutcome::Success,
        )
        .with_metadata("mode", format!("{:?}", state.renderer.output_mode())),
    );

    Ok(document.into_response(&record.document_file_name()))
}

pub async fn submit_session(
    State(state): State<AppState>,
    UrlPath(session_id): UrlPath<String>,
    headers: HeaderMap,
    Json(body): Json<SubmitSessionRequest>,
) -> ApiResult<Json<SubmissionResponse>> {
    let correlation_id = correlation_id(&headers);
    let Some(email) = non_blank(body.email) else {
        return Err(reject(ApplicationError::MissingInput("email"), &correlation_id));
    };
    let record = finalized_record(&state, &session_id, &correlation_id).await?;

    submit_record(&state, &record, &email, Some(session_id), &correlation_id).await
}

async fn submit_record(
    state: &AppState,
    record: &QuoteRecord,
    raw_email: &str,
    session_id: Option<String>,
    correlation_id: &str,
) -> ApiResult<Json<SubmissionResponse>> {
    let email = ContactEmail::parse(raw_email).map_err(|error| reject(error, correlation_id))?;
    let Some(submitter) = &state.submitter else {
        return Err(reject(ApplicationError::CrmDisabled, correlation_id));
    };

    let context =
        AuditContext::new(Some(record.quote_id().clone()), session_id, correlation_id, "web");

    match submitter.submit(record, &email, Utc::now()).await {
        Ok(receipt) => {
            if receipt.used_fallback() {
                warn!(
                    event_name = "crm.opportunity.schema_fallback",
                    correlation_id = %correlation_id,
                    quote_id = %record.quote_id(),
                    rejected = ?receipt.rejected_schemas,
                    "custom email fields rejected; opportunity created with standard fields"
                );
            }
            info!(
                event_name = "crm.opportunity.created",
                correlation_id = %correlation_id,
                quote_id = %record.quote_id(),
                external_id = %receipt.external_id,
                "opportunity created"
            );
            state.audit.emit(
                AuditEvent::new(
                    &context,
                    "crm.opportunity_created",
                    AuditCategory::Crm,
                    AuditOutcome::Success,
                )
                .with_metadata("external_id", receipt.external_id.clone())
                .with_metadata("schema", format!("{:?}", receipt.schema)),
            );

            Ok(Json(SubmissionResponse {
                success: receipt.success,
                id: receipt.external_id,
                message: receipt.message,
            }))
        }
        Err(submission_error) => {
            error!(
                event_name = "crm.opportunity.failed",
                correlation_id = %correlation_id,
                quote_id = %record.quote_id(),
                error = %submission_error,
                "opportunity creation failed"
            );
            state.audit.emit(
                AuditEvent::new(&context, "crm.opportunity_failed", AuditCategory::Crm, AuditOutcome::Failed)
                    .with_metadata("error", submission_error.to_string()),
            );

            Err(reject(submission_error, correlation_id))
        }
    }
}

async fn finalized_record(
    state: &AppState,
    session_id: &str,
    correlation_id: &str,
) -> ApiResult<QuoteRecord> {
    match state.sessions.record(session_id).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => {
            Err(reject(ApplicationError::QuoteNotFinalized(session_id.to_string()), correlation_id))
        }
        Err(error) => Err(reject(error, correlation_id)),
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
