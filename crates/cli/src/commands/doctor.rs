use invoicedesk_client::InvoiceDesk;
use invoicedesk_core::config::{AppConfig, LoadOptions};
use invoicedesk_core::{FetchError, FileSession, SessionContext};
use serde::Serialize;

use crate::commands::{serialize_report, CommandResult, EXIT_UNAVAILABLE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_UNAVAILABLE };

    if json_output {
        return CommandResult::text(exit_code, serialize_report("doctor", &report));
    }
    CommandResult::text(exit_code, render_human(&report))
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });

            let credentials = check_credentials(&config);
            let has_credentials = credentials.status == CheckStatus::Pass;
            checks.push(credentials);

            if has_credentials {
                checks.push(check_api_reachability(&config));
            } else {
                checks.push(DoctorCheck::skipped("api_reachability", "no credentials are stored"));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck::skipped("credentials_present", "configuration did not load"));
            checks.push(DoctorCheck::skipped("api_reachability", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credentials(config: &AppConfig) -> DoctorCheck {
    let session = FileSession::new(config.session.credentials_path.clone());
    if session.token().is_some() {
        let user_type =
            session.user_type().unwrap_or_else(|| config.session.default_user_type.clone());
        return DoctorCheck {
            name: "credentials_present",
            status: CheckStatus::Pass,
            details: format!("token stored for {user_type} at `{}`", session.path().display()),
        };
    }

    DoctorCheck {
        name: "credentials_present",
        status: CheckStatus::Fail,
        details: format!(
            "no token at `{}`; log in at {}",
            session.path().display(),
            config.session.login_url
        ),
    }
}

fn check_api_reachability(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "api_reachability";

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: NAME,
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let mut desk = match InvoiceDesk::from_config(config) {
        Ok(desk) => desk,
        Err(error) => {
            return DoctorCheck { name: NAME, status: CheckStatus::Fail, details: error.to_string() };
        }
    };

    let sales_url = config.api.sales_url();
    match runtime.block_on(desk.refresh()) {
        Ok(records) => DoctorCheck {
            name: NAME,
            status: CheckStatus::Pass,
            details: format!("`{sales_url}` listed {} invoice(s)", records.len()),
        },
        Err(error @ FetchError::Session(_)) => DoctorCheck {
            name: NAME,
            status: CheckStatus::Fail,
            details: format!("`{sales_url}` rejected the stored token: {error}"),
        },
        Err(error) => DoctorCheck {
            name: NAME,
            status: CheckStatus::Fail,
            details: format!("`{sales_url}` is not usable: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
