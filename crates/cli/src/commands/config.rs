use std::env;
use std::fs;
use std::path::Path;

use invoicedesk_core::config::{detect_config_path, LoadOptions};
use invoicedesk_core::{FileSession, SessionContext};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = options.config_path.clone().or_else(detect_config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "api.base_url",
        &config.api.base_url,
        override_or(options.overrides.api_base_url.is_some(), || {
            source("api.base_url", &["INVOICEDESK_API_BASE_URL"])
        }),
    ));
    lines.push(render_line(
        "api.sales_path",
        &config.api.sales_path,
        source("api.sales_path", &["INVOICEDESK_API_SALES_PATH"]),
    ));
    lines.push(render_line(
        "api.timeout_secs",
        &config.api.timeout_secs.map(|secs| secs.to_string()).unwrap_or_else(|| "<unset>".into()),
        source("api.timeout_secs", &["INVOICEDESK_API_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "session.credentials_path",
        &config.session.credentials_path.display().to_string(),
        override_or(options.overrides.credentials_path.is_some(), || {
            source("session.credentials_path", &["INVOICEDESK_SESSION_CREDENTIALS_PATH"])
        }),
    ));
    lines.push(render_line(
        "session.login_url",
        &config.session.login_url,
        source("session.login_url", &["INVOICEDESK_SESSION_LOGIN_URL"]),
    ));
    lines.push(render_line(
        "session.default_user_type",
        &config.session.default_user_type,
        source("session.default_user_type", &["INVOICEDESK_SESSION_DEFAULT_USER_TYPE"]),
    ));

    let session = FileSession::new(config.session.credentials_path.clone());
    let token = session
        .token()
        .map(|token| redact_token(token.expose_secret()))
        .unwrap_or_else(|| "<absent>".to_string());
    lines.push(render_line(
        "session.auth_token",
        &token,
        format!("credentials file ({})", session.path().display()),
    ));

    lines.push(render_line(
        "display.currency",
        &config.display.currency,
        source("display.currency", &["INVOICEDESK_DISPLAY_CURRENCY"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        override_or(options.overrides.log_level.is_some(), || {
            source("logging.level", &["INVOICEDESK_LOGGING_LEVEL", "INVOICEDESK_LOG_LEVEL"])
        }),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_lowercase(),
        override_or(options.overrides.log_format.is_some(), || {
            source("logging.format", &["INVOICEDESK_LOGGING_FORMAT", "INVOICEDESK_LOG_FORMAT"])
        }),
    ));

    CommandResult::text(0, lines.join("\n"))
}

fn override_or(flagged: bool, fallback: impl FnOnce() -> String) -> String {
    if flagged {
        return "flag".to_string();
    }
    fallback()
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

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let visible: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 8 {
        return format!("{visible}***");
    }

    "<redacted>".to_string()
}
