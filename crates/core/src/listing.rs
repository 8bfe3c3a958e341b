//! Normalization of `GET /api/Sales` bodies.
//!
//! The endpoint answers either `{ "success": true, "data": [...] }` or a bare
//! array. Anything else is treated as "no invoices" rather than an error, but
//! the reason is kept so callers can log it.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::invoice::InvoiceRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingShape {
    Envelope,
    Bare,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    Null,
    UnsuccessfulEnvelope,
    UnexpectedShape,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null body",
            Self::UnsuccessfulEnvelope => "envelope without success flag or data array",
            Self::UnexpectedShape => "neither an envelope nor an array",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedListing {
    Records { records: Vec<InvoiceRecord>, shape: ListingShape, dropped: usize },
    Empty { reason: EmptyReason },
}

impl NormalizedListing {
    pub fn records(&self) -> &[InvoiceRecord] {
        match self {
            Self::Records { records, .. } => records,
            Self::Empty { .. } => &[],
        }
    }

    pub fn into_records(self) -> Vec<InvoiceRecord> {
        match self {
            Self::Records { records, .. } => records,
            Self::Empty { .. } => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

pub fn normalize_listing(body: Value) -> NormalizedListing {
    match body {
        Value::Null => NormalizedListing::Empty { reason: EmptyReason::Null },
        Value::Array(items) => decode_records(items, ListingShape::Bare),
        Value::Object(mut envelope) => {
            let success = envelope.get("success").is_some_and(is_truthy);
            match envelope.remove("data") {
                Some(Value::Array(items)) if success => decode_records(items, ListingShape::Envelope),
                _ => NormalizedListing::Empty { reason: EmptyReason::UnsuccessfulEnvelope },
            }
        }
        _ => NormalizedListing::Empty { reason: EmptyReason::UnexpectedShape },
    }
}

/// JSON truthiness: `false`, `null`, zero and `""` are the only falsy values.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|raw| raw != 0.0 && !raw.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn decode_records(items: Vec<Value>, shape: ListingShape) -> NormalizedListing {
    let total = items.len();
    let mut records = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<InvoiceRecord>(item) {
            Ok(record) => records.push(record),
            Err(error) => {
                debug!(index, error = %error, "dropping invoice entry that could not be decoded");
            }
        }
    }

    let dropped = total - records.len();
    if dropped > 0 {
        warn!(
            event_name = "invoices.listing.dropped_entries",
            dropped,
            total,
            "invoice listing contained entries without a usable identifier"
        );
    }

    NormalizedListing::Records { records, shape, dropped }
}
