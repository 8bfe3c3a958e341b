use std::sync::Arc;

use invoicedesk_core::{normalize_listing, FetchError, NormalizedListing, SessionGuard};
use serde_json::Value;
use tracing::{info, warn};

use crate::api::SalesApi;

/// Reads the current invoice listing on behalf of an authenticated session.
#[derive(Clone)]
pub struct InvoiceRepository {
    api: Arc<dyn SalesApi>,
    guard: SessionGuard,
}

impl InvoiceRepository {
    pub fn new(api: Arc<dyn SalesApi>, guard: SessionGuard) -> Self {
        Self { api, guard }
    }

    /// Fetches and normalizes the listing. A missing token fails before any
    /// request is sent; a 401/403 answer clears the stored session.
    pub async fn fetch_invoices(&self) -> Result<NormalizedListing, FetchError> {
        let session = self.guard.activate()?;

        let response = self.api.list_sales(&session.token).await.map_err(|error| {
            warn!(event_name = "invoices.fetch.transport_failed", error = %error, "invoice fetch failed");
            FetchError::Transport(error.to_string())
        })?;

        self.guard.check_status(response.status)?;
        if !response.is_success() {
            warn!(
                event_name = "invoices.fetch.unexpected_status",
                status = response.status,
                "invoice listing returned a non-success status"
            );
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|error| {
            warn!(event_name = "invoices.fetch.parse_failed", error = %error, "invoice listing is not JSON");
            FetchError::Parse(error.to_string())
        })?;

        let listing = normalize_listing(body);
        match &listing {
            NormalizedListing::Records { records, shape, dropped } => info!(
                event_name = "invoices.fetch.completed",
                count = records.len(),
                dropped,
                shape = ?shape,
                "invoice listing loaded"
            ),
            NormalizedListing::Empty { reason } => warn!(
                event_name = "invoices.fetch.empty",
                reason = reason.as_str(),
                "invoice listing normalized to empty"
            ),
        }

        Ok(listing)
    }
}
