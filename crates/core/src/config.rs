use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::negotiation::PolicyConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub fmcsa: FmcsaConfig,
    pub server: ServerConfig,
    pub negotiation: PolicyConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct FmcsaConfig {
    /// When false the server uses the built-in carrier directory instead
    /// of calling out to the registry.
    pub enabled: bool,
    pub base_url: String,
    pub web_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub api_key: SecretString,
    pub graceful_shutdown_secs: u64,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
    pub server_api_key: Option<String>,
    pub fmcsa_enabled: Option<bool>,
    pub fmcsa_web_key: Option<String>,
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
            database: DatabaseConfig {
                url: "sqlite://loadline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            fmcsa: FmcsaConfig {
                enabled: false,
                base_url: "https://mobile.fmcsa.dot.gov/qc/services".to_string(),
                web_key: None,
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
                api_key: "dev-local-key".to_string().into(),
                graceful_shutdown_secs: 15,
            },
            negotiation: PolicyConfig::default(),
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("loadline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(fmcsa) = patch.fmcsa {
            if let Some(enabled) = fmcsa.enabled {
                self.fmcsa.enabled = enabled;
            }
            if let Some(base_url) = fmcsa.base_url {
                self.fmcsa.base_url = base_url;
            }
            if let Some(web_key_value) = fmcsa.web_key {
                self.fmcsa.web_key = Some(secret_value(web_key_value));
            }
            if let Some(timeout_secs) = fmcsa.timeout_secs {
                self.fmcsa.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(api_key_value) = server.api_key {
                self.server.api_key = secret_value(api_key_value);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(negotiation) = patch.negotiation {
            if let Some(max_rounds) = negotiation.max_rounds {
                self.negotiation.max_rounds = max_rounds;
            }
            if let Some(multiplier) = negotiation.acceptance_threshold_multiplier {
                self.negotiation.acceptance_threshold_multiplier = multiplier;
            }
            if let Some(multiplier) = negotiation.walk_away_multiplier {
                self.negotiation.walk_away_multiplier = multiplier;
            }
            if let Some(fraction) = negotiation.round_one_move {
                self.negotiation.round_one_move = fraction;
            }
            if let Some(fraction) = negotiation.round_two_move {
                self.negotiation.round_two_move = fraction;
            }
            if let Some(fraction) = negotiation.final_round_move {
                self.negotiation.final_round_move = fraction;
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
        if let Some(value) = read_env("LOADLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LOADLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LOADLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LOADLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LOADLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LOADLINE_FMCSA_ENABLED") {
            self.fmcsa.enabled = parse_bool("LOADLINE_FMCSA_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LOADLINE_FMCSA_BASE_URL") {
            self.fmcsa.base_url = value;
        }
        if let Some(value) = read_env("LOADLINE_FMCSA_WEB_KEY") {
            self.fmcsa.web_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("LOADLINE_FMCSA_TIMEOUT_SECS") {
            self.fmcsa.timeout_secs = parse_u64("LOADLINE_FMCSA_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LOADLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LOADLINE_SERVER_PORT") {
            self.server.port = parse_u16("LOADLINE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LOADLINE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("LOADLINE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("LOADLINE_SERVER_API_KEY") {
            self.server.api_key = secret_value(value);
        }
        if let Some(value) = read_env("LOADLINE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LOADLINE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("LOADLINE_NEGOTIATION_MAX_ROUNDS") {
            self.negotiation.max_rounds = parse_u32("LOADLINE_NEGOTIATION_MAX_ROUNDS", &value)?;
        }
        if let Some(value) = read_env("LOADLINE_NEGOTIATION_WALK_AWAY_MULTIPLIER") {
            self.negotiation.walk_away_multiplier =
                parse_decimal("LOADLINE_NEGOTIATION_WALK_AWAY_MULTIPLIER", &value)?;
        }

        let log_level =
            read_env("LOADLINE_LOGGING_LEVEL").or_else(|| read_env("LOADLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LOADLINE_LOGGING_FORMAT").or_else(|| read_env("LOADLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(api_key) = overrides.server_api_key {
            self.server.api_key = secret_value(api_key);
        }
        if let Some(enabled) = overrides.fmcsa_enabled {
            self.fmcsa.enabled = enabled;
        }
        if let Some(web_key) = overrides.fmcsa_web_key {
            self.fmcsa.web_key = Some(secret_value(web_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_fmcsa(&self.fmcsa)?;
        validate_server(&self.server)?;
        validate_negotiation(&self.negotiation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    if let Some(from_env) = read_env("LOADLINE_CONFIG") {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    [PathBuf::from("loadline.toml"), PathBuf::from("config/loadline.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_fmcsa(fmcsa: &FmcsaConfig) -> Result<(), ConfigError> {
    if fmcsa.timeout_secs == 0 || fmcsa.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "fmcsa.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if fmcsa.enabled {
        if !fmcsa.base_url.starts_with("http://") && !fmcsa.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "fmcsa.base_url must start with http:// or https://".to_string(),
            ));
        }

        let missing = fmcsa
            .web_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "fmcsa.web_key is required when fmcsa.enabled is true. Request one at https://mobile.fmcsa.dot.gov/QCDevsite/".to_string()
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("server.api_key must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_negotiation(negotiation: &PolicyConfig) -> Result<(), ConfigError> {
    if negotiation.max_rounds == 0 {
        return Err(ConfigError::Validation(
            "negotiation.max_rounds must be greater than zero".to_string(),
        ));
    }

    if negotiation.acceptance_threshold_multiplier < Decimal::ONE {
        return Err(ConfigError::Validation(
            "negotiation.acceptance_threshold_multiplier must be at least 1.0".to_string(),
        ));
    }

    if negotiation.walk_away_multiplier < negotiation.acceptance_threshold_multiplier {
        return Err(ConfigError::Validation(
            "negotiation.walk_away_multiplier must not be below the acceptance threshold multiplier".to_string(),
        ));
    }

    for (name, fraction) in [
        ("round_one_move", negotiation.round_one_move),
        ("round_two_move", negotiation.round_two_move),
        ("final_round_move", negotiation.final_round_move),
    ] {
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(ConfigError::Validation(format!(
                "negotiation.{name} must be in range (0, 1]"
            )));
        }
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    fmcsa: Option<FmcsaPatch>,
    server: Option<ServerPatch>,
    negotiation: Option<NegotiationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FmcsaPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    web_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    api_key: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    max_rounds: Option<u32>,
    acceptance_threshold_multiplier: Option<Decimal>,
    walk_away_multiplier: Option<Decimal>,
    round_one_move: Option<Decimal>,
    round_two_move: Option<Decimal>,
    final_round_move: Option<Decimal>,
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
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
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
    fn defaults_validate_without_a_config_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.database.url == "sqlite://loadline.db", "default database url")?;
        ensure(config.server.port == 8000, "default server port")?;
        ensure(!config.fmcsa.enabled, "fmcsa should be disabled by default")?;
        ensure(config.negotiation.max_rounds == 3, "default round cap should be three")?;
        ensure(
            config.server.api_key.expose_secret() == "dev-local-key",
            "default api key is the local development key",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FMCSA_WEB_KEY", "webkey-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("loadline.toml");
            fs::write(
                &path,
                r#"
[fmcsa]
enabled = true
web_key = "${TEST_FMCSA_WEB_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.fmcsa.enabled, "fmcsa should be enabled from the file")?;
            let web_key = config
                .fmcsa
                .web_key
                .as_ref()
                .map(|value| value.expose_secret().to_string())
                .unwrap_or_default();
            ensure(web_key == "webkey-from-env", "web key should be loaded from environment")
        })();

        clear_vars(&["TEST_FMCSA_WEB_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LOADLINE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("LOADLINE_SERVER_PORT", "9100");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("loadline.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[server]
port = 9000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.server.port == 9100, "env port should win over the file")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["LOADLINE_DATABASE_URL", "LOADLINE_SERVER_PORT"]);
        result
    }

    #[test]
    fn negotiation_section_patches_the_policy() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("loadline.toml");
        fs::write(
            &path,
            r#"
[negotiation]
max_rounds = 4
walk_away_multiplier = "1.25"
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.negotiation.max_rounds == 4, "round cap should come from the file")?;
        ensure(
            config.negotiation.walk_away_multiplier == Decimal::new(125, 2),
            "walk-away multiplier should come from the file",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LOADLINE_FMCSA_ENABLED", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("fmcsa.web_key")
            );
            ensure(has_message, "validation failure should mention fmcsa.web_key")
        })();

        clear_vars(&["LOADLINE_FMCSA_ENABLED"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("LOADLINE_SERVER_API_KEY", "super-secret-key");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("super-secret-key"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["LOADLINE_SERVER_API_KEY"]);
        result
    }
}
