use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use loadline_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let file_source = |key_path: &str| {
        field_source(key_path, None, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "LOADLINE_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "LOADLINE_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "LOADLINE_DATABASE_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "fmcsa.enabled",
        &config.fmcsa.enabled.to_string(),
        source("fmcsa.enabled", "LOADLINE_FMCSA_ENABLED"),
    ));
    lines.push(render_line(
        "fmcsa.base_url",
        &config.fmcsa.base_url,
        source("fmcsa.base_url", "LOADLINE_FMCSA_BASE_URL"),
    ));
    let web_key = match &config.fmcsa.web_key {
        Some(key) if !key.expose_secret().trim().is_empty() => "<redacted>",
        Some(_) => "<empty>",
        None => "<unset>",
    };
    lines.push(render_line(
        "fmcsa.web_key",
        web_key,
        source("fmcsa.web_key", "LOADLINE_FMCSA_WEB_KEY"),
    ));
    lines.push(render_line(
        "fmcsa.timeout_secs",
        &config.fmcsa.timeout_secs.to_string(),
        source("fmcsa.timeout_secs", "LOADLINE_FMCSA_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "LOADLINE_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", "LOADLINE_SERVER_PORT"),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", "LOADLINE_SERVER_HEALTH_CHECK_PORT"),
    ));
    let api_key = if config.server.api_key.expose_secret().trim().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    };
    lines.push(render_line(
        "server.api_key",
        api_key,
        source("server.api_key", "LOADLINE_SERVER_API_KEY"),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", "LOADLINE_SERVER_GRACEFUL_SHUTDOWN_SECS"),
    ));

    lines.push(render_line(
        "negotiation.max_rounds",
        &config.negotiation.max_rounds.to_string(),
        source("negotiation.max_rounds", "LOADLINE_NEGOTIATION_MAX_ROUNDS"),
    ));
    lines.push(render_line(
        "negotiation.acceptance_threshold_multiplier",
        &config.negotiation.acceptance_threshold_multiplier.to_string(),
        file_source("negotiation.acceptance_threshold_multiplier"),
    ));
    lines.push(render_line(
        "negotiation.walk_away_multiplier",
        &config.negotiation.walk_away_multiplier.to_string(),
        source("negotiation.walk_away_multiplier", "LOADLINE_NEGOTIATION_WALK_AWAY_MULTIPLIER"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "LOADLINE_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "LOADLINE_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    if let Some(from_env) = env::var_os("LOADLINE_CONFIG") {
        let path = PathBuf::from(from_env);
        if path.exists() {
            return Some(path);
        }
    }

    [PathBuf::from("loadline.toml"), PathBuf::from("config/loadline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
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
