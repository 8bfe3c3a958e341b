//! HTTP side of invoicedesk: the sales API transport, the invoice repository,
//! the sequential approval submitter and the desk workflow over them.

pub mod api;
pub mod desk;
pub mod repository;
pub mod submitter;

#[cfg(test)]
mod test_support;

pub use api::{ApiResponse, HttpSalesApi, SalesApi, TransportError};
pub use desk::{AssumeYes, ConfirmationPrompt, InvoiceDesk, SubmissionCycle};
pub use repository::InvoiceRepository;
pub use submitter::ApprovalSubmitter;
