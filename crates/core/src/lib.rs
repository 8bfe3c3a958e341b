//! Invoicedesk core: the invoice model, session handling, listing
//! normalization and selection tracking shared by the client and the CLI.

pub mod config;
pub mod domain;
pub mod errors;
pub mod listing;
pub mod selection;
pub mod session;

pub use domain::invoice::{ApprovalStatus, InvoiceId, InvoiceRecord};
pub use domain::submission::{
    format_amount, ConfirmationSummary, SubmissionOutcome, SubmissionPayload, SubmissionReport,
    FORBIDDEN_DETAIL,
};
pub use errors::{ApplicationError, FetchError, InterfaceError, SubmitError};
pub use listing::{normalize_listing, EmptyReason, ListingShape, NormalizedListing};
pub use selection::SelectionSet;
pub use session::{
    ActiveSession, Credentials, FileSession, LoginRedirect, MemorySession, SessionContext,
    SessionError, SessionGuard,
};
