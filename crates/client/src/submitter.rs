use std::sync::Arc;

use chrono::Utc;
use invoicedesk_core::{
    InvoiceRecord, SelectionSet, SessionGuard, SubmissionOutcome, SubmissionPayload,
    SubmissionReport, SubmitError, FORBIDDEN_DETAIL,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiResponse, SalesApi};

/// Sends one approval request per selected invoice, strictly one at a time.
#[derive(Clone)]
pub struct ApprovalSubmitter {
    api: Arc<dyn SalesApi>,
    guard: SessionGuard,
}

impl ApprovalSubmitter {
    pub fn new(api: Arc<dyn SalesApi>, guard: SessionGuard) -> Self {
        Self { api, guard }
    }

    /// Attempts every selected invoice found in `records`, in selection order.
    ///
    /// A failed item never stops the batch. Identifiers with no matching
    /// record are skipped without an outcome. If the server answered 401 or 403
    /// for any item, the stored session is invalidated once the batch is done.
    pub async fn submit(
        &self,
        selected: &SelectionSet,
        records: &[InvoiceRecord],
    ) -> Result<SubmissionReport, SubmitError> {
        if selected.is_empty() {
            return Err(SubmitError::EmptySelection);
        }

        let session = self.guard.activate()?;
        let mut report = SubmissionReport::new(Uuid::new_v4().to_string());
        let mut session_rejected = false;

        info!(
            event_name = "approval.cycle.started",
            correlation_id = %report.correlation_id,
            selected = selected.len(),
            "submitting invoices for approval"
        );

        for invoice_id in selected.iter() {
            let Some(record) = records.iter().find(|record| record.invoice_id() == invoice_id)
            else {
                debug!(
                    correlation_id = %report.correlation_id,
                    invoice_id = invoice_id.0,
                    "selected invoice is no longer listed; skipping"
                );
                continue;
            };

            let payload = SubmissionPayload::from_record(record, Utc::now());
            let outcome = match self.api.create_sale(&session.token, &payload).await {
                Ok(response) => {
                    session_rejected |= matches!(response.status, 401 | 403);
                    classify(record, response)
                }
                Err(error) => SubmissionOutcome::failed(record, error.to_string()),
            };

            if outcome.success {
                info!(
                    event_name = "approval.item.submitted",
                    correlation_id = %report.correlation_id,
                    invoice_id = invoice_id.0,
                    label = %outcome.label,
                    "invoice submitted for approval"
                );
            } else {
                warn!(
                    event_name = "approval.item.failed",
                    correlation_id = %report.correlation_id,
                    invoice_id = invoice_id.0,
                    label = %outcome.label,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "invoice approval request failed"
                );
            }
            report.outcomes.push(outcome);
        }

        if session_rejected {
            warn!(
                event_name = "approval.cycle.session_rejected",
                correlation_id = %report.correlation_id,
                "server rejected the session during submission"
            );
            self.guard.invalidate();
        }

        info!(
            event_name = "approval.cycle.completed",
            correlation_id = %report.correlation_id,
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "approval cycle finished"
        );

        Ok(report)
    }
}

fn classify(record: &InvoiceRecord, response: ApiResponse) -> SubmissionOutcome {
    if response.is_success() {
        return SubmissionOutcome::succeeded(record);
    }
    if response.status == 403 {
        return SubmissionOutcome::failed(record, FORBIDDEN_DETAIL);
    }

    let detail = if response.body.trim().is_empty() {
        format!("HTTP {}", response.status)
    } else {
        response.body
    };
    SubmissionOutcome::failed(record, detail)
}
