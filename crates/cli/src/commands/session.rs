use std::sync::Arc;

use invoicedesk_core::config::{AppConfig, LoadOptions};
use invoicedesk_core::{Credentials, FileSession, SessionGuard};
use tracing::info;

use crate::commands::{load_config, CommandResult, EXIT_BAD_REQUEST, EXIT_INTERNAL};

fn guard_for(config: &AppConfig) -> (Arc<FileSession>, SessionGuard) {
    let session = Arc::new(FileSession::new(config.session.credentials_path.clone()));
    let guard = SessionGuard::new(session.clone(), config.session.login_url.clone())
        .with_default_user_type(config.session.default_user_type.clone());
    (session, guard)
}

/// Stores a token issued by the login page.
pub fn login(options: &LoadOptions, token: &str, user_type: Option<String>) -> CommandResult {
    const COMMAND: &str = "login";

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let token = token.trim();
    if token.is_empty() {
        return CommandResult::failure(
            COMMAND,
            "bad_request",
            "token must not be empty",
            EXIT_BAD_REQUEST,
        );
    }

    let (session, _) = guard_for(&config);
    let user_type = user_type.filter(|value| !value.trim().is_empty());
    let shown_type = user_type.clone().unwrap_or_else(|| config.session.default_user_type.clone());

    match session.store(&Credentials::new(token, user_type)) {
        Ok(()) => {
            info!(event_name = "session.login", path = %session.path().display(), "credentials stored");
            CommandResult::success(
                COMMAND,
                format!(
                    "stored credentials for {shown_type} at `{}`",
                    session.path().display()
                ),
            )
        }
        Err(error) => {
            CommandResult::failure(COMMAND, "persistence", error.to_string(), EXIT_INTERNAL)
        }
    }
}

pub fn logout(options: &LoadOptions) -> CommandResult {
    const COMMAND: &str = "logout";

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let (_, guard) = guard_for(&config);
    let redirect = guard.logout();
    CommandResult::success(COMMAND, format!("logged out; {redirect}"))
}

pub fn whoami(options: &LoadOptions) -> CommandResult {
    const COMMAND: &str = "whoami";

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let (_, guard) = guard_for(&config);
    match guard.activate() {
        Ok(session) => {
            CommandResult::success(COMMAND, format!("active session for {}", session.user_type))
        }
        Err(error) => CommandResult::from_application(COMMAND, error),
    }
}
