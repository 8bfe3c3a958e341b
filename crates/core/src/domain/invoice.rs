use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lenient;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub i64);

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Pending,
    Rejected,
    Unknown,
}

impl ApprovalStatus {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("approved") => Self::Approved,
            Some("pending") => Self::Pending,
            Some("rejected") => Self::Rejected,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::Pending => "Pending",
            Self::Rejected => "Rejected",
            Self::Unknown => "N/A",
        }
    }
}

/// One sale line as returned by `GET /api/Sales`.
///
/// Every attribute except the identifier is optional on the wire and decoded
/// leniently: a malformed value becomes `None` instead of failing the record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    #[serde(deserialize_with = "lenient::required_integer")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub f_reg_no: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub invoice_no: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub grade_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub packing_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub packages: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub full_half: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sample: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub sample_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub net_weight: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub net_qty: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_net_weight: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub manufactured_on: Option<String>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub lot_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub category_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub buyer_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub catelog_no: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sale_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub packed_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub delivered: Option<bool>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub approval_status: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub approval_status_string: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub buyer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category_description: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub grade_description: Option<String>,
}

impl InvoiceRecord {
    pub fn invoice_id(&self) -> InvoiceId {
        InvoiceId(self.id)
    }

    /// `price * quantity`, with absent values counted as zero.
    pub fn line_total(&self) -> Decimal {
        let price = self.price.unwrap_or(Decimal::ZERO);
        let quantity = self.quantity.unwrap_or(Decimal::ZERO);
        price.saturating_mul(quantity)
    }

    pub fn status(&self) -> ApprovalStatus {
        ApprovalStatus::from_label(self.approval_status_string.as_deref())
    }

    pub fn display_label(&self) -> String {
        match self.invoice_no.as_deref() {
            Some(invoice_no) if !invoice_no.is_empty() => invoice_no.to_string(),
            _ => format!("ID-{}", self.id),
        }
    }
}
