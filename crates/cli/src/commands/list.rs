use invoicedesk_core::config::LoadOptions;
use invoicedesk_core::{format_amount, ApprovalStatus, InvoiceRecord};
use serde::Serialize;

use crate::commands::{build_desk, build_runtime, load_config, serialize_report, CommandResult};

const COMMAND: &str = "list";

#[derive(Debug, Serialize)]
struct ListReport {
    command: &'static str,
    status: &'static str,
    user_type: String,
    currency: String,
    total: usize,
    pending: usize,
    invoices: Vec<InvoiceRow>,
}

#[derive(Debug, Serialize)]
struct InvoiceRow {
    id: i64,
    label: String,
    buyer: String,
    amount: String,
    status: &'static str,
}

impl InvoiceRow {
    fn from_record(record: &InvoiceRecord) -> Self {
        Self {
            id: record.id,
            label: record.display_label(),
            buyer: record.buyer_name.clone().unwrap_or_else(|| "N/A".to_string()),
            amount: format_amount(record.line_total()),
            status: record.status().as_str(),
        }
    }
}

pub fn run(options: &LoadOptions, pending_only: bool, json_output: bool) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let mut desk = match build_desk(COMMAND, &config) {
        Ok(desk) => desk,
        Err(result) => return result,
    };

    let session = match desk.activate() {
        Ok(session) => session,
        Err(error) => return CommandResult::from_application(COMMAND, error),
    };
    if let Err(error) = runtime.block_on(desk.refresh()) {
        return CommandResult::from_application(COMMAND, error);
    }

    let pending = desk.pending_invoices().count();
    let invoices: Vec<_> = desk
        .invoices()
        .iter()
        .filter(|record| !pending_only || record.status() == ApprovalStatus::Pending)
        .map(InvoiceRow::from_record)
        .collect();

    let report = ListReport {
        command: COMMAND,
        status: "ok",
        user_type: session.user_type,
        currency: desk.currency().to_string(),
        total: desk.invoices().len(),
        pending,
        invoices,
    };

    if json_output {
        return CommandResult::text(0, serialize_report(COMMAND, &report));
    }
    CommandResult::text(0, render_human(&report))
}

fn render_human(report: &ListReport) -> String {
    let mut lines = vec![format!("Welcome, {}", report.user_type)];

    if report.invoices.is_empty() {
        lines.push("No invoices found".to_string());
    } else {
        lines.push(format!(
            "{:>8}  {:<16}  {:<20}  {:>16}  {}",
            "ID",
            "INVOICE",
            "BUYER",
            format!("AMOUNT ({})", report.currency),
            "STATUS"
        ));
        for row in &report.invoices {
            lines.push(format!(
                "{:>8}  {:<16}  {:<20}  {:>16}  {}",
                row.id, row.label, row.buyer, row.amount, row.status
            ));
        }
    }

    lines.push(format!("invoices: {} (pending: {})", report.total, report.pending));
    lines.join("\n")
}
