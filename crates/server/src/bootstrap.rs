use std::sync::Arc;
use std::time::Duration;

use quotewise_core::config::{AppConfig, ConfigError, LoadOptions};
use quotewise_core::crm::{CrmClient, OpportunitySubmitter};
use thiserror::Error;
use tracing::info;

use crate::audit::TracingAuditSink;
use crate::document::{RenderError, TeraDocumentRenderer};
use crate::routes::AppState;
use crate::salesforce::{SalesforceClient, SalesforceSetupError};
use crate::sessions::SessionStore;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("document renderer setup failed: {0}")]
    Renderer(#[source] RenderError),
    #[error("salesforce client setup failed: {0}")]
    Crm(#[source] SalesforceSetupError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        quote_id = "unknown",
        "starting application bootstrap"
    );

    let renderer =
        TeraDocumentRenderer::from_config(&config.export).map_err(BootstrapError::Renderer)?;

    let submitter = if config.crm.enabled {
        let client = SalesforceClient::from_config(&config.crm).map_err(BootstrapError::Crm)?;
        let client: Arc<dyn CrmClient> = Arc::new(client);
        info!(
            event_name = "system.bootstrap.crm_configured",
            correlation_id = "bootstrap",
            quote_id = "unknown",
            login_url = %config.crm.login_url,
            api_version = %config.crm.api_version,
            "salesforce integration enabled"
        );
        Some(Arc::new(OpportunitySubmitter::new(client)))
    } else {
        info!(
            event_name = "system.bootstrap.crm_disabled",
            correlation_id = "bootstrap",
            quote_id = "unknown",
            "salesforce integration disabled; quote submissions will be refused"
        );
        None
    };

    let state = AppState {
        sessions: SessionStore::with_ttl(Duration::from_secs(config.server.session_ttl_secs)),
        renderer: Arc::new(renderer),
        submitter,
        audit: Arc::new(TracingAuditSink),
    };

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use quotewise_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};
    use crate::document::OutputMode;

    fn missing_config_file() -> PathBuf {
        std::env::temp_dir().join(format!("quotewise-absent-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn bootstrap_fails_fast_when_crm_enabled_without_credentials() {
        let result = bootstrap(LoadOptions {
            config_path: Some(missing_config_file()),
            overrides: ConfigOverrides { crm_enabled: Some(true), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        });

        let error = result.err().expect("error");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("crm.enabled"));
    }

    #[test]
    fn bootstrap_with_defaults_serves_without_crm() {
        let converter = tempfile::NamedTempFile::new().expect("converter stand-in");
        let app = bootstrap(LoadOptions {
            config_path: Some(missing_config_file()),
            overrides: ConfigOverrides {
                wkhtmltopdf_path: Some(converter.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with defaults");

        assert!(app.state.submitter.is_none());
        assert_eq!(app.state.renderer.output_mode(), OutputMode::Pdf);
        assert!(!app.config.crm.enabled);
    }

    #[test]
    fn missing_configured_converter_falls_back_to_html() {
        let app = bootstrap(LoadOptions {
            config_path: Some(missing_config_file()),
            overrides: ConfigOverrides {
                wkhtmltopdf_path: Some(PathBuf::from("/nonexistent/wkhtmltopdf")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed");

        assert_eq!(app.state.renderer.output_mode(), OutputMode::Html);
    }

    #[test]
    fn bootstrap_loads_repository_template_dir() {
        let templates = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates");

        let app = bootstrap(LoadOptions {
            config_path: Some(missing_config_file()),
            overrides: ConfigOverrides {
                template_dir: Some(templates),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("repository templates should load");

        assert!(app.state.submitter.is_none());
    }

    #[test]
    fn bootstrap_rejects_template_dir_without_quote_template() {
        let dir = tempfile::tempdir().expect("tempdir");

        let result = bootstrap(LoadOptions {
            config_path: Some(missing_config_file()),
            overrides: ConfigOverrides {
                template_dir: Some(dir.path().to_path_buf()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(matches!(result.err(), Some(BootstrapError::Renderer(_))));
    }
}
