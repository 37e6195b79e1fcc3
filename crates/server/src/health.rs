use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::document::OutputMode;
use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub renderer: HealthCheck,
    pub crm: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

/// Export and CRM readiness. A disabled CRM or missing `wkhtmltopdf` limits
/// features but does not make the service unready.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let renderer = match state.renderer.output_mode() {
        OutputMode::Pdf => {
            HealthCheck { status: "ready", detail: "PDF export via wkhtmltopdf".to_string() }
        }
        OutputMode::Html => HealthCheck {
            status: "limited",
            detail: "wkhtmltopdf not found; quotes are served as printable HTML".to_string(),
        },
    };
    let crm = match &state.submitter {
        Some(_) => HealthCheck { status: "ready", detail: "salesforce credentials configured".to_string() },
        None => HealthCheck { status: "disabled", detail: "crm.enabled is false".to_string() },
    };

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "quotewise-server runtime initialized".to_string(),
        },
        renderer,
        crm,
        active_sessions: state.sessions.active_count().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{extract::State, http::StatusCode, Json};
    use quotewise_core::audit::InMemoryAuditSink;
    use quotewise_core::crm::{CrmClient, CrmCreateError, Opportunity, OpportunitySubmitter};

    use crate::document::TeraDocumentRenderer;
    use crate::health::health;
    use crate::routes::AppState;
    use crate::sessions::SessionStore;

    struct AcceptingCrm;

    #[async_trait]
    impl CrmClient for AcceptingCrm {
        async fn create_opportunity(&self, _: &Opportunity) -> Result<String, CrmCreateError> {
            Ok("006000000000001".to_string())
        }
    }

    fn state(crm: Option<Arc<dyn CrmClient>>) -> AppState {
        AppState {
            sessions: SessionStore::default(),
            renderer: Arc::new(TeraDocumentRenderer::html_only().expect("renderer")),
            submitter: crm.map(|client| Arc::new(OpportunitySubmitter::new(client))),
            audit: Arc::new(InMemoryAuditSink::default()),
        }
    }

    #[tokio::test]
    async fn health_reports_disabled_crm_and_html_fallback() {
        let (status, Json(payload)) = health(State(state(None))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.crm.status, "disabled");
        assert_eq!(payload.renderer.status, "limited");
        assert_eq!(payload.active_sessions, 0);
    }

    #[tokio::test]
    async fn health_reports_configured_crm_and_open_sessions() {
        let state = state(Some(Arc::new(AcceptingCrm)));
        state.sessions.create().await;

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.crm.status, "ready");
        assert_eq!(payload.active_sessions, 1);
    }
}
