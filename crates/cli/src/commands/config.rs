use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quotewise_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct SourceLookup {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl SourceLookup {
    fn detect() -> Self {
        let path = resolve_config_path(None);
        let doc = load_config_file_doc(path.as_deref());
        Self { doc, path }
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        field_source(key_path, env_keys, self.doc.as_ref(), self.path.as_deref())
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let sources = SourceLookup::detect();

    let mut lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
    ];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(key, value, sources.source(key, env_keys)));
    };

    let server = &config.server;
    push("server.bind_address", &server.bind_address, &["QUOTEWISE_SERVER_BIND_ADDRESS"]);
    push("server.port", &server.port.to_string(), &["QUOTEWISE_SERVER_PORT", "PORT"]);
    push(
        "server.static_dir",
        &server.static_dir.display().to_string(),
        &["QUOTEWISE_SERVER_STATIC_DIR"],
    );
    push(
        "server.graceful_shutdown_secs",
        &server.graceful_shutdown_secs.to_string(),
        &["QUOTEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );
    push(
        "server.session_ttl_secs",
        &server.session_ttl_secs.to_string(),
        &["QUOTEWISE_SERVER_SESSION_TTL_SECS"],
    );

    let crm = &config.crm;
    push("crm.enabled", &crm.enabled.to_string(), &["QUOTEWISE_CRM_ENABLED"]);
    push("crm.login_url", &crm.login_url, &["QUOTEWISE_CRM_LOGIN_URL"]);
    push("crm.api_version", &crm.api_version, &["QUOTEWISE_CRM_API_VERSION"]);
    push(
        "crm.client_id",
        &crm.client_id.as_deref().map_or_else(|| "<unset>".to_string(), redact_identifier),
        &["QUOTEWISE_CRM_CLIENT_ID"],
    );
    push("crm.client_secret", secret_state(crm.client_secret.as_ref()), &["QUOTEWISE_CRM_CLIENT_SECRET"]);
    push("crm.username", crm.username.as_deref().unwrap_or("<unset>"), &["QUOTEWISE_CRM_USERNAME"]);
    push("crm.password", secret_state(crm.password.as_ref()), &["QUOTEWISE_CRM_PASSWORD"]);
    push(
        "crm.security_token",
        secret_state(crm.security_token.as_ref()),
        &["QUOTEWISE_CRM_SECURITY_TOKEN"],
    );
    push("crm.timeout_secs", &crm.timeout_secs.to_string(), &["QUOTEWISE_CRM_TIMEOUT_SECS"]);

    let export = &config.export;
    push(
        "export.template_dir",
        &display_path(export.template_dir.as_deref(), "<bundled>"),
        &["QUOTEWISE_EXPORT_TEMPLATE_DIR"],
    );
    push(
        "export.wkhtmltopdf_path",
        &display_path(export.wkhtmltopdf_path.as_deref(), "<search PATH>"),
        &["QUOTEWISE_EXPORT_WKHTMLTOPDF_PATH"],
    );

    push(
        "logging.level",
        &config.logging.level,
        &["QUOTEWISE_LOGGING_LEVEL", "QUOTEWISE_LOG_LEVEL"],
    );
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["QUOTEWISE_LOGGING_FORMAT", "QUOTEWISE_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn display_path(path: Option<&Path>, unset: &str) -> String {
    path.map_or_else(|| unset.to_string(), |path| path.display().to_string())
}

fn secret_state(secret: Option<&SecretString>) -> &'static str {
    match secret {
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>",
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

/// Keeps the first four characters of an OAuth client id.
fn redact_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    if prefix.len() == trimmed.len() {
        return "<redacted>".to_string();
    }
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_identifier};

    #[test]
    fn client_id_keeps_short_prefix() {
        assert_eq!(redact_identifier("3MVG9abcdefgh"), "3MVG***");
        assert_eq!(redact_identifier("abc"), "<redacted>");
        assert_eq!(redact_identifier("  "), "<empty>");
    }

    #[test]
    fn nested_key_lookup_follows_dotted_path() {
        let doc: toml::Value = "[crm]\nlogin_url = \"https://test.salesforce.com\"".parse().expect("toml");

        assert!(contains_path(&doc, "crm.login_url"));
        assert!(!contains_path(&doc, "crm.username"));
    }
}
