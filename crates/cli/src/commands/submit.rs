use std::io::{self, BufRead, Write};

use invoicedesk_client::{AssumeYes, ConfirmationPrompt, SubmissionCycle};
use invoicedesk_core::config::LoadOptions;
use invoicedesk_core::{ConfirmationSummary, InvoiceId, SubmissionOutcome, SubmitError};
use serde::Serialize;

use crate::commands::{
    build_desk, build_runtime, load_config, serialize_report, CommandResult, EXIT_BAD_REQUEST,
    EXIT_PARTIAL_FAILURE,
};

const COMMAND: &str = "submit";

#[derive(Clone, Debug, Default)]
pub struct SubmitArgs {
    pub ids: Vec<i64>,
    pub all: bool,
    pub assume_yes: bool,
    pub json: bool,
}

/// Shows the confirmation text on stderr and reads a y/N answer from stdin.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn confirm(&self, _summary: &ConfirmationSummary, message: &str) -> bool {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "{message} [y/N] ").and_then(|()| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Serialize)]
struct SubmitReport {
    command: &'static str,
    status: &'static str,
    correlation_id: String,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    outcomes: Vec<SubmissionOutcome>,
    not_listed: Vec<i64>,
    refreshed: Option<usize>,
    refresh_error: Option<String>,
}

pub fn run(options: &LoadOptions, args: &SubmitArgs) -> CommandResult {
    let prompt: &dyn ConfirmationPrompt = if args.assume_yes { &AssumeYes } else { &StdinPrompt };
    run_with_prompt(options, args, prompt)
}

pub fn run_with_prompt(
    options: &LoadOptions,
    args: &SubmitArgs,
    prompt: &dyn ConfirmationPrompt,
) -> CommandResult {
    if args.ids.is_empty() && !args.all {
        return CommandResult::failure(
            COMMAND,
            "bad_request",
            "pass at least one --id <ID> or --all",
            EXIT_BAD_REQUEST,
        );
    }

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

    if let Err(error) = desk.activate() {
        return CommandResult::from_application(COMMAND, error);
    }
    if let Err(error) = runtime.block_on(desk.refresh()) {
        return CommandResult::from_application(COMMAND, error);
    }

    let mut not_listed = Vec::new();
    if args.all {
        desk.select_all();
    } else {
        for id in args.ids.iter().copied().map(InvoiceId) {
            if !desk.invoices().iter().any(|record| record.invoice_id() == id) {
                not_listed.push(id.0);
            } else if !desk.selection().contains(id) {
                desk.toggle(id);
            }
        }
    }

    if desk.selection().is_empty() {
        if !not_listed.is_empty() {
            let ids = not_listed.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
            return CommandResult::failure(
                COMMAND,
                "bad_request",
                format!("no requested invoice is in the current listing: {ids}"),
                EXIT_BAD_REQUEST,
            );
        }
        return CommandResult::from_application(COMMAND, SubmitError::EmptySelection);
    }

    let cycle = match runtime.block_on(desk.submit_selected(prompt)) {
        Ok(cycle) => cycle,
        Err(error) => return CommandResult::from_application(COMMAND, error),
    };

    let (report, refreshed) = match cycle {
        SubmissionCycle::Cancelled { summary } => {
            return CommandResult::success(
                COMMAND,
                format!("approval request cancelled; {} invoice(s) left unsent", summary.count),
            );
        }
        SubmissionCycle::Completed { report, refreshed } => (report, refreshed),
    };

    let exit_code = if report.failed() > 0 { EXIT_PARTIAL_FAILURE } else { 0 };
    let summary = SubmitReport {
        command: COMMAND,
        status: if exit_code == 0 { "ok" } else { "partial_failure" },
        correlation_id: report.correlation_id.clone(),
        attempted: report.attempted(),
        succeeded: report.succeeded(),
        failed: report.failed(),
        not_listed,
        refreshed: refreshed.as_ref().ok().copied(),
        refresh_error: refreshed.as_ref().err().map(ToString::to_string),
        outcomes: report.outcomes,
    };

    if args.json {
        return CommandResult::text(exit_code, serialize_report(COMMAND, &summary));
    }
    CommandResult::text(exit_code, render_human(&summary))
}

fn render_human(report: &SubmitReport) -> String {
    let mut lines: Vec<String> = report.outcomes.iter().map(SubmissionOutcome::render).collect();
    lines.push(format!(
        "submitted {} of {} invoice(s) for approval ({} failed)",
        report.succeeded, report.attempted, report.failed
    ));

    if !report.not_listed.is_empty() {
        let ids = report.not_listed.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
        lines.push(format!("not in the current listing: {ids}"));
    }

    match (&report.refreshed, &report.refresh_error) {
        (Some(count), _) => lines.push(format!("refreshed listing: {count} invoice(s)")),
        (None, Some(error)) => lines.push(format!("refresh failed: {error}")),
        (None, None) => {}
    }

    lines.join("\n")
}
