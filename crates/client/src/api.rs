use std::time::Duration;

use async_trait::async_trait;
use invoicedesk_core::config::ApiConfig;
use invoicedesk_core::SubmissionPayload;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not build http client: {0}")]
    Setup(String),
    #[error("{0}")]
    Request(String),
    #[error("could not read response body: {0}")]
    Body(String),
}

/// Status and raw body of an API call. Interpretation is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two calls this client makes against the sales resource.
#[async_trait]
pub trait SalesApi: Send + Sync {
    async fn list_sales(&self, token: &SecretString) -> Result<ApiResponse, TransportError>;
    async fn create_sale(
        &self,
        token: &SecretString,
        payload: &SubmissionPayload,
    ) -> Result<ApiResponse, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpSalesApi {
    client: Client,
    sales_url: String,
}

impl HttpSalesApi {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().map_err(|error| TransportError::Setup(error.to_string()))?;

        Ok(Self { client, sales_url: config.sales_url() })
    }

    pub fn sales_url(&self) -> &str {
        &self.sales_url
    }

    async fn read(response: reqwest::Response) -> Result<ApiResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| TransportError::Body(error.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl SalesApi for HttpSalesApi {
    async fn list_sales(&self, token: &SecretString) -> Result<ApiResponse, TransportError> {
        debug!(url = %self.sales_url, "GET sales listing");
        let response = self
            .client
            .get(&self.sales_url)
            .bearer_auth(token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        Self::read(response).await
    }

    async fn create_sale(
        &self,
        token: &SecretString,
        payload: &SubmissionPayload,
    ) -> Result<ApiResponse, TransportError> {
        debug!(url = %self.sales_url, invoice_no = %payload.invoice_no, "POST sale for approval");
        let response = self
            .client
            .post(&self.sales_url)
            .bearer_auth(token.expose_secret())
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        Self::read(response).await
    }
}
