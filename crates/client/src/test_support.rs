use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use invoicedesk_core::{Credentials, MemorySession, SessionGuard, SubmissionPayload};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use crate::api::{ApiResponse, SalesApi, TransportError};

pub const LOGIN_URL: &str = "http://localhost:3000/login";

#[derive(Default)]
pub struct ScriptedSalesApi {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    listings: VecDeque<Result<ApiResponse, TransportError>>,
    creations: VecDeque<Result<ApiResponse, TransportError>>,
    list_calls: usize,
    submitted: Vec<SubmissionPayload>,
    tokens: Vec<String>,
}

impl ScriptedSalesApi {
    pub fn with_script(
        listings: Vec<Result<ApiResponse, TransportError>>,
        creations: Vec<Result<ApiResponse, TransportError>>,
    ) -> Self {
        Self {
            state: Mutex::new(ScriptedState {
                listings: listings.into(),
                creations: creations.into(),
                ..ScriptedState::default()
            }),
        }
    }

    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }

    pub async fn submitted(&self) -> Vec<SubmissionPayload> {
        self.state.lock().await.submitted.clone()
    }

    pub async fn tokens(&self) -> Vec<String> {
        self.state.lock().await.tokens.clone()
    }
}

#[async_trait]
impl SalesApi for ScriptedSalesApi {
    async fn list_sales(&self, token: &SecretString) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().await;
        state.list_calls += 1;
        state.tokens.push(token.expose_secret().to_owned());
        state.listings.pop_front().unwrap_or_else(|| Ok(ApiResponse::new(200, "[]")))
    }

    async fn create_sale(
        &self,
        token: &SecretString,
        payload: &SubmissionPayload,
    ) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().await;
        state.tokens.push(token.expose_secret().to_owned());
        state.submitted.push(payload.clone());
        state.creations.pop_front().unwrap_or_else(|| Ok(ApiResponse::new(201, "")))
    }
}

pub fn session(token: Option<&str>) -> (Arc<MemorySession>, SessionGuard) {
    let session = Arc::new(MemorySession::new(
        token.map(|token| Credentials::new(token, Some("Buyer".to_owned()))),
    ));
    let guard = SessionGuard::new(session.clone(), LOGIN_URL);
    (session, guard)
}
