use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_USER_TYPE: &str = "Buyer";

#[derive(Clone, Debug)]
pub struct Credentials {
    pub auth_token: SecretString,
    pub user_type: Option<String>,
}

impl Credentials {
    pub fn new(auth_token: impl Into<String>, user_type: Option<String>) -> Self {
        Self { auth_token: SecretString::from(auth_token.into()), user_type }
    }
}

/// Where the bearer token for the sales API lives between calls.
pub trait SessionContext: Send + Sync {
    fn token(&self) -> Option<SecretString>;
    fn user_type(&self) -> Option<String>;
    /// Forget the stored token and user type.
    fn invalidate(&self);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    credentials: Mutex<Option<Credentials>>,
}

impl MemorySession {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self { credentials: Mutex::new(credentials) }
    }

    pub fn store(&self, credentials: Credentials) {
        *self.credentials.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<SecretString> {
        let guard = self.credentials.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|credentials| credentials.auth_token.clone())
            .filter(|token| !token.expose_secret().trim().is_empty())
    }

    fn user_type(&self) -> Option<String> {
        let guard = self.credentials.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|credentials| credentials.user_type.clone())
    }

    fn invalidate(&self) {
        *self.credentials.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("could not write credentials file `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not encode credentials: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    auth_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_type: Option<String>,
}

/// Credentials persisted as a small TOML file. Every read goes back to disk so
/// a logout from another process is observed on the next call.
#[derive(Clone, Debug)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self, credentials: &Credentials) -> Result<(), SessionStoreError> {
        let file = CredentialFile {
            auth_token: credentials.auth_token.expose_secret().to_string(),
            user_type: credentials.user_type.clone(),
        };
        let encoded = toml::to_string(&file)?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| SessionStoreError::Write { path: self.path.clone(), source })?;
        }
        fs::write(&self.path, encoded)
            .map_err(|source| SessionStoreError::Write { path: self.path.clone(), source })?;
        restrict_permissions(&self.path);

        Ok(())
    }

    fn read(&self) -> Option<CredentialFile> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "credentials file unreadable");
                return None;
            }
        };

        match toml::from_str::<CredentialFile>(&raw) {
            Ok(file) => Some(file),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "credentials file malformed");
                None
            }
        }
    }
}

impl SessionContext for FileSession {
    fn token(&self) -> Option<SecretString> {
        self.read()
            .map(|file| file.auth_token)
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::from)
    }

    fn user_type(&self) -> Option<String> {
        self.read().and_then(|file| file.user_type)
    }

    fn invalidate(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "could not remove credentials file");
            }
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(error) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), error = %error, "could not restrict credentials file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRedirect {
    pub url: String,
}

impl std::fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "log in again at {}", self.url)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session expired: no stored credentials, {redirect}")]
    LoginRequired { redirect: LoginRedirect },
    #[error("session rejected by server with status {status}, {redirect}")]
    Rejected { status: u16, redirect: LoginRedirect },
}

impl SessionError {
    pub fn redirect(&self) -> &LoginRedirect {
        match self {
            Self::LoginRequired { redirect } | Self::Rejected { redirect, .. } => redirect,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ActiveSession {
    pub token: SecretString,
    pub user_type: String,
}

#[derive(Clone)]
pub struct SessionGuard {
    context: Arc<dyn SessionContext>,
    login_url: String,
    default_user_type: String,
}

impl SessionGuard {
    pub fn new(context: Arc<dyn SessionContext>, login_url: impl Into<String>) -> Self {
        Self {
            context,
            login_url: login_url.into(),
            default_user_type: DEFAULT_USER_TYPE.to_string(),
        }
    }

    pub fn with_default_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.default_user_type = user_type.into();
        self
    }

    pub fn redirect(&self) -> LoginRedirect {
        LoginRedirect { url: self.login_url.clone() }
    }

    pub fn activate(&self) -> Result<ActiveSession, SessionError> {
        let Some(token) = self.context.token() else {
            info!(event_name = "session.login_required", login_url = %self.login_url, "no stored token");
            return Err(SessionError::LoginRequired { redirect: self.redirect() });
        };

        let user_type = self.context.user_type().unwrap_or_else(|| self.default_user_type.clone());
        Ok(ActiveSession { token, user_type })
    }

    /// Inspects the status of an authenticated call. 401 and 403 clear the
    /// stored credentials.
    pub fn check_status(&self, status: u16) -> Result<(), SessionError> {
        if status == 401 || status == 403 {
            warn!(event_name = "session.rejected", status, "server rejected the session token");
            self.context.invalidate();
            return Err(SessionError::Rejected { status, redirect: self.redirect() });
        }
        Ok(())
    }

    pub fn invalidate(&self) {
        self.context.invalidate();
    }

    pub fn logout(&self) -> LoginRedirect {
        self.context.invalidate();
        info!(event_name = "session.logout", "credentials cleared");
        self.redirect()
    }
}
