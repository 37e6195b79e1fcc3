//! In-memory wizard sessions for the browser flow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quotewise_core::audit::{AuditContext, AuditSink};
use quotewise_core::cpq::pricing::PricingResult;
use quotewise_core::domain::draft::{ConsistencyWarning, QuoteDraft};
use quotewise_core::domain::quote::QuoteRecord;
use quotewise_core::errors::ApplicationError;
use quotewise_core::wizard::{TransitionOutcome, Wizard, WizardError, WizardEvent, WizardState};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const SESSION_ACTOR: &str = "web";
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("wizard session `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

impl From<SessionError> for ApplicationError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::NotFound(session_id) => Self::SessionNotFound(session_id),
            SessionError::Wizard(error) => Self::from(error),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WarningView {
    #[serde(flatten)]
    pub warning: ConsistencyWarning,
    pub message: String,
}

impl From<&ConsistencyWarning> for WarningView {
    fn from(warning: &ConsistencyWarning) -> Self {
        Self { warning: warning.clone(), message: warning.message() }
    }
}

/// Snapshot of a wizard as the browser renders it.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: WizardState,
    pub step_number: Option<u8>,
    pub step_title: Option<&'static str>,
    pub draft: QuoteDraft,
    pub record: Option<QuoteRecord>,
    pub warnings: Vec<WarningView>,
    pub pricing: PricingResult,
}

impl SessionView {
    fn of(session_id: &str, wizard: &Wizard) -> Self {
        let step = wizard.step();
        Self {
            session_id: session_id.to_string(),
            state: wizard.state(),
            step_number: step.map(|step| step.number()),
            step_title: step.map(|step| step.title()),
            draft: wizard.draft().clone(),
            record: wizard.record().cloned(),
            warnings: wizard.warnings().iter().map(WarningView::from).collect(),
            pricing: wizard.pricing(),
        }
    }
}

struct Session {
    wizard: Wizard,
    last_touched: Instant,
}

impl Session {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_touched.elapsed() >= ttl
    }
}

/// Wizards keyed by session id. Sessions idle for longer than the TTL are
/// treated as gone and dropped on the next write.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { sessions: Arc::default(), ttl }
    }

    pub async fn create(&self) -> SessionView {
        let session_id = Uuid::new_v4().to_string();
        let wizard = Wizard::new();
        let view = SessionView::of(&session_id, &wizard);

        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions);
        sessions.insert(session_id, Session { wizard, last_touched: Instant::now() });
        view
    }

    pub async fn view(&self, session_id: &str) -> Option<SessionView> {
        let mut sessions = self.sessions.write().await;
        let session = self.live_session(&mut sessions, session_id).ok()?;
        session.last_touched = Instant::now();
        Some(SessionView::of(session_id, &session.wizard))
    }

    /// Applies `event` under the write lock and audits the result.
    pub async fn apply<S>(
        &self,
        session_id: &str,
        event: WizardEvent,
        sink: &S,
        correlation_id: &str,
    ) -> Result<(TransitionOutcome, SessionView), SessionError>
    where
        S: AuditSink + ?Sized,
    {
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions);
        let session = self.live_session(&mut sessions, session_id)?;
        session.last_touched = Instant::now();

        let context = AuditContext::new(
            session.wizard.record().map(|record| record.quote_id().clone()),
            Some(session_id.to_string()),
            correlation_id,
            SESSION_ACTOR,
        );
        let outcome = session.wizard.apply_with_audit(event, sink, &context)?;
        Ok((outcome, SessionView::of(session_id, &session.wizard)))
    }

    /// Issued record of a session, `Ok(None)` while still authoring.
    pub async fn record(&self, session_id: &str) -> Result<Option<QuoteRecord>, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = self.live_session(&mut sessions, session_id)?;
        session.last_touched = Instant::now();
        Ok(session.wizard.record().cloned())
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some_and(|session| !session.is_expired(self.ttl))
    }

    pub async fn active_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|session| !session.is_expired(self.ttl)).count()
    }

    fn live_session<'a>(
        &self,
        sessions: &'a mut HashMap<String, Session>,
        session_id: &str,
    ) -> Result<&'a mut Session, SessionError> {
        sessions
            .get_mut(session_id)
            .filter(|session| !session.is_expired(self.ttl))
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, Session>) {
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                event_name = "wizard.session.expired",
                correlation_id = "session_store",
                evicted,
                remaining = sessions.len(),
                "evicted idle wizard sessions"
            );
        }
    }
}
