//! The buyer's invoice desk: one session's view of the listing, the current
//! selection, and the approval cycle that ties them together.

use std::sync::Arc;

use invoicedesk_core::config::AppConfig;
use invoicedesk_core::{
    ActiveSession, ApplicationError, ApprovalStatus, ConfirmationSummary, FetchError, FileSession,
    InvoiceId, InvoiceRecord, LoginRedirect, SelectionSet, SessionError, SessionGuard,
    SubmissionReport, SubmitError,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::api::{HttpSalesApi, SalesApi};
use crate::repository::InvoiceRepository;
use crate::submitter::ApprovalSubmitter;

/// Asked once per cycle, before any request is sent.
pub trait ConfirmationPrompt: Send + Sync {
    fn confirm(&self, summary: &ConfirmationSummary, message: &str) -> bool;
}

/// Confirms every cycle without asking. For non-interactive callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl ConfirmationPrompt for AssumeYes {
    fn confirm(&self, _summary: &ConfirmationSummary, _message: &str) -> bool {
        true
    }
}

#[derive(Debug)]
pub enum SubmissionCycle {
    /// The user declined; nothing was sent and the selection is unchanged.
    Cancelled { summary: ConfirmationSummary },
    /// Every selected invoice was attempted. `refreshed` is the size of the
    /// re-fetched listing, or why the re-fetch failed.
    Completed { report: SubmissionReport, refreshed: Result<usize, FetchError> },
}

pub struct InvoiceDesk {
    guard: SessionGuard,
    repository: InvoiceRepository,
    submitter: ApprovalSubmitter,
    currency: String,
    invoices: Vec<InvoiceRecord>,
    selection: SelectionSet,
    last_error: Option<String>,
}

impl InvoiceDesk {
    pub fn new(api: Arc<dyn SalesApi>, guard: SessionGuard) -> Self {
        Self {
            repository: InvoiceRepository::new(api.clone(), guard.clone()),
            submitter: ApprovalSubmitter::new(api, guard.clone()),
            guard,
            currency: "LKR".to_string(),
            invoices: Vec::new(),
            selection: SelectionSet::new(),
            last_error: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApplicationError> {
        let api = HttpSalesApi::new(&config.api)
            .map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let session = Arc::new(FileSession::new(config.session.credentials_path.clone()));
        let guard = SessionGuard::new(session, config.session.login_url.clone())
            .with_default_user_type(config.session.default_user_type.clone());

        Ok(Self::new(Arc::new(api), guard).with_currency(config.display.currency.clone()))
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Checks for stored credentials, as on page load.
    pub fn activate(&self) -> Result<ActiveSession, SessionError> {
        self.guard.activate()
    }

    pub fn invoices(&self) -> &[InvoiceRecord] {
        &self.invoices
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn pending_invoices(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.invoices.iter().filter(|record| record.status() == ApprovalStatus::Pending)
    }

    /// Replaces the held listing with a fresh fetch. On failure the listing is
    /// emptied rather than left stale.
    pub async fn refresh(&mut self) -> Result<&[InvoiceRecord], FetchError> {
        match self.repository.fetch_invoices().await {
            Ok(listing) => {
                self.invoices = listing.into_records();
                self.last_error = None;

                let pruned = self.selection.prune(&self.invoices);
                if pruned > 0 {
                    debug!(pruned, "dropped selected invoices missing from the new listing");
                }
                Ok(&self.invoices)
            }
            Err(error) => {
                self.invoices.clear();
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub fn toggle(&mut self, id: InvoiceId) -> bool {
        self.selection.toggle(id)
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.invoices);
    }

    pub fn clear_all(&mut self) {
        self.selection.clear_all();
    }

    pub fn selected_total(&self) -> Decimal {
        self.selection.selected_total(&self.invoices)
    }

    pub fn confirmation_summary(&self) -> ConfirmationSummary {
        self.selection.summary(&self.invoices)
    }

    pub async fn submit_selected(
        &mut self,
        prompt: &dyn ConfirmationPrompt,
    ) -> Result<SubmissionCycle, SubmitError> {
        if self.selection.is_empty() {
            return Err(SubmitError::EmptySelection);
        }

        let summary = self.confirmation_summary();
        let message = summary.message(&self.currency);
        if !prompt.confirm(&summary, &message) {
            info!(event_name = "approval.cycle.cancelled", selected = summary.count, "user declined");
            return Ok(SubmissionCycle::Cancelled { summary });
        }

        let report = self.submitter.submit(&self.selection, &self.invoices).await?;
        self.selection.clear_all();

        let refreshed = self.refresh().await.map(|records| records.len());
        Ok(SubmissionCycle::Completed { report, refreshed })
    }

    /// Clears stored credentials and everything loaded under them.
    pub fn logout(&mut self) -> LoginRedirect {
        self.invoices.clear();
        self.selection.clear_all();
        self.last_error = None;
        self.guard.logout()
    }
}
