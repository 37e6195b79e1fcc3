use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "quotewise.toml";
pub const NESTED_CONFIG_FILE: &str = "config/quotewise.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub crm: CrmConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub graceful_shutdown_secs: u64,
    /// Idle time after which a wizard session is dropped.
    pub session_ttl_secs: u64,
}

/// Salesforce connection settings. Submission is disabled unless `enabled` is set.
#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub enabled: bool,
    pub login_url: String,
    pub api_version: String,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub security_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ExportConfig {
    pub template_dir: Option<PathBuf>,
    pub wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
    pub session_ttl_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub crm_enabled: Option<bool>,
    pub crm_login_url: Option<String>,
    pub crm_username: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3001,
                static_dir: PathBuf::from("public"),
                graceful_shutdown_secs: 15,
                session_ttl_secs: 3600,
            },
            crm: CrmConfig {
                enabled: false,
                login_url: "https://login.salesforce.com".to_string(),
                api_version: "56.0".to_string(),
                client_id: None,
                client_secret: None,
                username: None,
                password: None,
                security_token: None,
                timeout_secs: 30,
            },
            export: ExportConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl CrmConfig {
    /// True when every credential the password flow needs is present.
    pub fn has_credentials(&self) -> bool {
        let present = |value: Option<&str>| value.is_some_and(|value| !value.trim().is_empty());
        present(self.client_id.as_deref())
            && present(self.client_secret.as_ref().map(|value| value.expose_secret()))
            && present(self.username.as_deref())
            && present(self.password.as_ref().map(|value| value.expose_secret()))
    }

    pub fn token_url(&self) -> String {
        format!("{}/services/oauth2/token", self.login_url.trim_end_matches('/'))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(static_dir) = server.static_dir {
                self.server.static_dir = static_dir;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(session_ttl_secs) = server.session_ttl_secs {
                self.server.session_ttl_secs = session_ttl_secs;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(enabled) = crm.enabled {
                self.crm.enabled = enabled;
            }
            if let Some(login_url) = crm.login_url {
                self.crm.login_url = login_url;
            }
            if let Some(api_version) = crm.api_version {
                self.crm.api_version = api_version;
            }
            if let Some(client_id) = crm.client_id {
                self.crm.client_id = Some(client_id);
            }
            if let Some(client_secret) = crm.client_secret {
                self.crm.client_secret = Some(secret_value(client_secret));
            }
            if let Some(username) = crm.username {
                self.crm.username = Some(username);
            }
            if let Some(password) = crm.password {
                self.crm.password = Some(secret_value(password));
            }
            if let Some(security_token) = crm.security_token {
                self.crm.security_token = Some(secret_value(security_token));
            }
            if let Some(timeout_secs) = crm.timeout_secs {
                self.crm.timeout_secs = timeout_secs;
            }
        }

        if let Some(export) = patch.export {
            if let Some(template_dir) = export.template_dir {
                self.export.template_dir = Some(template_dir);
            }
            if let Some(wkhtmltopdf_path) = export.wkhtmltopdf_path {
                self.export.wkhtmltopdf_path = Some(wkhtmltopdf_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTEWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("QUOTEWISE_SERVER_PORT").map(|value| ("QUOTEWISE_SERVER_PORT", value));
        if let Some((key, value)) = port.or_else(|| read_env("PORT").map(|value| ("PORT", value)))
        {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("QUOTEWISE_SERVER_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("QUOTEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("QUOTEWISE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("QUOTEWISE_SERVER_SESSION_TTL_SECS") {
            self.server.session_ttl_secs = parse_u64("QUOTEWISE_SERVER_SESSION_TTL_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEWISE_CRM_ENABLED") {
            self.crm.enabled = parse_bool("QUOTEWISE_CRM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_LOGIN_URL") {
            self.crm.login_url = value;
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_API_VERSION") {
            self.crm.api_version = value;
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_CLIENT_ID") {
            self.crm.client_id = Some(value);
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_CLIENT_SECRET") {
            self.crm.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_USERNAME") {
            self.crm.username = Some(value);
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_PASSWORD") {
            self.crm.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_SECURITY_TOKEN") {
            self.crm.security_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEWISE_CRM_TIMEOUT_SECS") {
            self.crm.timeout_secs = parse_u64("QUOTEWISE_CRM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEWISE_EXPORT_TEMPLATE_DIR") {
            self.export.template_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("QUOTEWISE_EXPORT_WKHTMLTOPDF_PATH") {
            self.export.wkhtmltopdf_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("QUOTEWISE_LOGGING_LEVEL").or_else(|| read_env("QUOTEWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTEWISE_LOGGING_FORMAT").or_else(|| read_env("QUOTEWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(static_dir) = overrides.static_dir {
            self.server.static_dir = static_dir;
        }
        if let Some(session_ttl_secs) = overrides.session_ttl_secs {
            self.server.session_ttl_secs = session_ttl_secs;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }

        if let Some(enabled) = overrides.crm_enabled {
            self.crm.enabled = enabled;
        }
        if let Some(login_url) = overrides.crm_login_url {
            self.crm.login_url = login_url;
        }
        if let Some(username) = overrides.crm_username {
            self.crm.username = Some(username);
        }

        if let Some(template_dir) = overrides.template_dir {
            self.export.template_dir = Some(template_dir);
        }
        if let Some(wkhtmltopdf_path) = overrides.wkhtmltopdf_path {
            self.export.wkhtmltopdf_path = Some(wkhtmltopdf_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_crm(&self.crm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Quote template name, relative to `export.template_dir`, in lookup order.
pub const QUOTE_TEMPLATE_NAMES: [&str; 2] = ["quote.html.tera", "quotes/quote.html.tera"];

/// Name of the quote template under `dir`, as Tera registers it.
pub fn resolve_quote_template(dir: &Path) -> Option<&'static str> {
    QUOTE_TEMPLATE_NAMES.into_iter().find(|name| dir.join(name).is_file())
}

/// First existing config file: the explicit path, else `quotewise.toml`, else `config/quotewise.toml`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "server.session_ttl_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_crm(crm: &CrmConfig) -> Result<(), ConfigError> {
    if !crm.login_url.starts_with("http://") && !crm.login_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "crm.login_url must start with http:// or https://".to_string(),
        ));
    }

    let version_ok = crm
        .api_version
        .split_once('.')
        .is_some_and(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|ch| ch.is_ascii_digit())
                && minor.chars().all(|ch| ch.is_ascii_digit())
        });
    if !version_ok {
        return Err(ConfigError::Validation(format!(
            "crm.api_version must look like `56.0`, got `{}`",
            crm.api_version
        )));
    }

    if crm.timeout_secs == 0 || crm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "crm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if crm.enabled && !crm.has_credentials() {
        return Err(ConfigError::Validation(
            "crm.enabled is true but client_id, client_secret, username and password are not all configured"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    crm: Option<CrmPatch>,
    export: Option<ExportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
    graceful_shutdown_secs: Option<u64>,
    session_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    enabled: Option<bool>,
    login_url: Option<String>,
    api_version: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
    security_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    template_dir: Option<PathBuf>,
    wkhtmltopdf_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_and_keep_crm_disabled() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(!config.crm.enabled, "crm should be disabled by default")?;
        ensure(config.crm.api_version == "56.0", "default api version should be 56.0")?;
        ensure(config.server.port == 3001, "default port should be 3001")?;
        ensure(
            config.crm.token_url() == "https://login.salesforce.com/services/oauth2/token",
            "token url should be derived from the login url",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SF_PASSWORD", "hunter2");
        env::set_var("TEST_SF_CLIENT_SECRET", "client-secret-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quotewise.toml");
            fs::write(
                &path,
                r#"
[crm]
enabled = true
client_id = "connected-app"
client_secret = "${TEST_SF_CLIENT_SECRET}"
username = "sales@example.com"
password = "${TEST_SF_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.crm.password.as_ref().map(|value| value.expose_secret().to_string())
                    == Some("hunter2".to_string()),
                "password should be interpolated from environment",
            )?;
            ensure(
                config.crm.client_secret.as_ref().map(|value| value.expose_secret().to_string())
                    == Some("client-secret-from-env".to_string()),
                "client secret should be interpolated from environment",
            )?;
            ensure(config.crm.has_credentials(), "credentials should be complete")?;
            Ok(())
        })();

        clear_vars(&["TEST_SF_PASSWORD", "TEST_SF_CLIENT_SECRET"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_QUOTEWISE_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("quotewise.toml");
        fs::write(&path, "[crm]\npassword = \"${TEST_QUOTEWISE_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Ok(_) => return Err("expected interpolation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_QUOTEWISE_UNSET"),
            "missing variable should be named in the error",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEWISE_LOG_LEVEL", "warn");
        env::set_var("QUOTEWISE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["QUOTEWISE_LOG_LEVEL", "QUOTEWISE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEWISE_SERVER_PORT", "4000");
        env::set_var("QUOTEWISE_CRM_API_VERSION", "58.0");
        env::set_var("QUOTEWISE_SERVER_SESSION_TTL_SECS", "900");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("quotewise.toml");
            fs::write(
                &path,
                r#"
[server]
port = 5000
static_dir = "site"
session_ttl_secs = 600

[crm]
api_version = "57.0"
login_url = "https://test.salesforce.com"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    port: Some(6000),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 6000, "override port should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.crm.api_version == "58.0", "env api version should win over file")?;
            ensure(
                config.crm.login_url == "https://test.salesforce.com",
                "file login url should win over default",
            )?;
            ensure(config.server.static_dir == PathBuf::from("site"), "file static dir should apply")?;
            ensure(config.server.session_ttl_secs == 900, "env session ttl should win over file")?;
            Ok(())
        })();

        clear_vars(&[
            "QUOTEWISE_SERVER_PORT",
            "QUOTEWISE_CRM_API_VERSION",
            "QUOTEWISE_SERVER_SESSION_TTL_SECS",
        ]);
        result
    }

    #[test]
    fn enabled_crm_without_credentials_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEWISE_CRM_ENABLED", "true");
        env::set_var("QUOTEWISE_CRM_USERNAME", "sales@example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("crm.enabled")
            );
            ensure(has_message, "validation failure should mention crm.enabled")
        })();

        clear_vars(&["QUOTEWISE_CRM_ENABLED", "QUOTEWISE_CRM_USERNAME"]);
        result
    }

    #[test]
    fn invalid_env_port_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        env::set_var("QUOTEWISE_SERVER_PORT", "not-a-port");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override".to_string()),
            Err(error) => ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "QUOTEWISE_SERVER_PORT"),
                "error should name the offending variable",
            ),
        };

        clear_vars(&["QUOTEWISE_SERVER_PORT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEWISE_CRM_PASSWORD", "sf-password-value");
        env::set_var("QUOTEWISE_CRM_SECURITY_TOKEN", "sf-token-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sf-password-value"), "debug output should not contain password")?;
            ensure(
                !debug.contains("sf-token-value"),
                "debug output should not contain security token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["QUOTEWISE_CRM_PASSWORD", "QUOTEWISE_CRM_SECURITY_TOKEN"]);
        result
    }
}
