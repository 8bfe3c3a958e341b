use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::invoice::{InvoiceId, InvoiceRecord};

pub const FORBIDDEN_DETAIL: &str = "Forbidden - you don't have permission";

/// Body of `POST /api/Sales`. Every field is populated, whatever the source
/// record left out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub f_reg_no: String,
    pub invoice_no: String,
    pub grade_no: i64,
    pub packing_code: String,
    pub packages: String,
    pub full_half: String,
    pub sample: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sample_qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_weight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_net_weight: Decimal,
    pub manufactured_on: String,
    pub lot_no: i64,
    pub category_code: i64,
    pub buyer_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub catelog_no: String,
    pub sale_date: String,
    pub packed_date: String,
    pub delivered: bool,
}

impl SubmissionPayload {
    /// Missing strings become empty, numbers zero, flags false, and dates
    /// `now` rendered as an RFC 3339 UTC timestamp with milliseconds.
    pub fn from_record(record: &InvoiceRecord, now: DateTime<Utc>) -> Self {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let date = |value: &Option<String>| match value.as_deref() {
            Some(raw) if !raw.is_empty() => raw.to_string(),
            _ => timestamp.clone(),
        };

        Self {
            f_reg_no: text(&record.f_reg_no),
            invoice_no: text(&record.invoice_no),
            grade_no: record.grade_no.unwrap_or(0),
            packing_code: text(&record.packing_code),
            packages: text(&record.packages),
            full_half: text(&record.full_half),
            sample: text(&record.sample),
            sample_qty: record.sample_qty.unwrap_or(Decimal::ZERO),
            net_weight: record.net_weight.unwrap_or(Decimal::ZERO),
            net_qty: record.net_qty.unwrap_or(Decimal::ZERO),
            total_net_weight: record.total_net_weight.unwrap_or(Decimal::ZERO),
            manufactured_on: date(&record.manufactured_on),
            lot_no: record.lot_no.unwrap_or(0),
            category_code: record.category_code.unwrap_or(0),
            buyer_code: text(&record.buyer_code),
            price: record.price.unwrap_or(Decimal::ZERO),
            quantity: record.quantity.unwrap_or(Decimal::ZERO),
            catelog_no: text(&record.catelog_no),
            sale_date: date(&record.sale_date),
            packed_date: date(&record.packed_date),
            delivered: record.delivered.unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub invoice_id: InvoiceId,
    pub label: String,
    pub success: bool,
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn succeeded(record: &InvoiceRecord) -> Self {
        Self {
            invoice_id: record.invoice_id(),
            label: record.display_label(),
            success: true,
            error: None,
        }
    }

    pub fn failed(record: &InvoiceRecord, error: impl Into<String>) -> Self {
        Self {
            invoice_id: record.invoice_id(),
            label: record.display_label(),
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn render(&self) -> String {
        match (&self.success, &self.error) {
            (true, _) => format!("ok {}", self.label),
            (false, Some(error)) => format!("fail {}: {error}", self.label),
            (false, None) => format!("fail {}", self.label),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub correlation_id: String,
    pub outcomes: Vec<SubmissionOutcome>,
}

impl SubmissionReport {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), outcomes: Vec::new() }
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.success).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn render(&self) -> String {
        self.outcomes.iter().map(SubmissionOutcome::render).collect::<Vec<_>>().join("\n")
    }
}

/// What the user is asked to confirm before a submission cycle starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationSummary {
    pub count: usize,
    pub total: Decimal,
}

impl ConfirmationSummary {
    pub fn message(&self, currency: &str) -> String {
        let noun = if self.count == 1 { "invoice" } else { "invoices" };
        format!(
            "REQUEST APPROVAL\n\nSelected: {} {noun}\nTotal: {currency} {}\n\n\
             This will submit invoices for admin approval.\n\
             Status will change to \"Pending\".\n\nContinue?",
            self.count,
            format_amount(self.total)
        )
    }
}

/// Renders `amount` with two decimals and comma thousands separators.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let raw = format!("{rounded:.2}");
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}.{fraction}")
}
