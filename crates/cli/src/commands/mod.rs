pub mod config;
pub mod doctor;
pub mod list;
pub mod session;
pub mod submit;

use invoicedesk_client::InvoiceDesk;
use invoicedesk_core::config::{AppConfig, LoadOptions};
use invoicedesk_core::{ApplicationError, InterfaceError};
use serde::Serialize;
use tokio::runtime::Runtime;

pub const EXIT_INTERNAL: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_SESSION: u8 = 4;
pub const EXIT_UNAVAILABLE: u8 = 5;
pub const EXIT_BAD_REQUEST: u8 = 6;
pub const EXIT_PARTIAL_FAILURE: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Plain output that bypasses the envelope, for human-readable renderings.
    pub fn text(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }

    pub fn from_interface(command: &str, error: &InterfaceError) -> Self {
        let exit_code = match error {
            InterfaceError::LoginRequired { .. } => EXIT_SESSION,
            InterfaceError::BadRequest { .. } => EXIT_BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => EXIT_UNAVAILABLE,
            InterfaceError::Internal { .. } => EXIT_INTERNAL,
        };
        let message = match error {
            InterfaceError::LoginRequired { login_url, .. } => {
                format!("{} Log in at {login_url}", error.user_message())
            }
            _ => format!("{} ({})", error.user_message(), error.message()),
        };
        Self::failure(command, error.error_class(), message, exit_code)
    }

    pub fn from_application(command: &str, error: impl Into<ApplicationError>) -> Self {
        let error: ApplicationError = error.into();
        Self::from_interface(command, &InterfaceError::from(error))
    }
}

pub(crate) fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("config validation failed: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn build_desk(command: &str, config: &AppConfig) -> Result<InvoiceDesk, CommandResult> {
    InvoiceDesk::from_config(config).map_err(|error| CommandResult::from_application(command, error))
}

pub(crate) fn serialize_report<T: Serialize>(command: &str, report: &T) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|error| {
        serialize_payload(CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some("serialization".to_string()),
            message: error.to_string(),
        })
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
