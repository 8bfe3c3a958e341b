use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::thread;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use invoicedesk_cli::commands::submit::{self, SubmitArgs};
use invoicedesk_cli::commands::{config, doctor, list, session};
use invoicedesk_client::ConfirmationPrompt;
use invoicedesk_core::config::{ConfigOverrides, LoadOptions};
use invoicedesk_core::ConfirmationSummary;
use serde_json::{json, Value};
use tempfile::TempDir;

const TOKEN: &str = "good-token-value";

#[test]
fn whoami_requires_login_without_credentials() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = session::whoami(&options(None, dir.path()));
        assert_eq!(result.exit_code, 4, "expected session failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "whoami");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "session_expired");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("http://localhost:3000/login"));
    });
}

#[test]
fn login_whoami_logout_round_trip() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let options = options(None, dir.path());

        let login = session::login(&options, TOKEN, Some("Broker".to_string()));
        assert_eq!(login.exit_code, 0, "login output: {}", login.output);
        assert!(dir.path().join("session.toml").exists());

        let whoami = session::whoami(&options);
        assert_eq!(whoami.exit_code, 0);
        assert_eq!(parse_payload(&whoami.output)["message"], "active session for Broker");

        let logout = session::logout(&options);
        assert_eq!(logout.exit_code, 0);
        assert!(!dir.path().join("session.toml").exists());

        assert_eq!(session::whoami(&options).exit_code, 4);
    });
}

#[test]
fn login_without_user_type_uses_configured_default() {
    with_env(&[("INVOICEDESK_SESSION_DEFAULT_USER_TYPE", "Agent")], || {
        let dir = TempDir::new().expect("temp dir");
        let options = options(None, dir.path());

        assert_eq!(session::login(&options, TOKEN, None).exit_code, 0);
        let whoami = session::whoami(&options);
        assert_eq!(parse_payload(&whoami.output)["message"], "active session for Agent");
    });
}

#[test]
fn login_rejects_blank_token() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = session::login(&options(None, dir.path()), "   ", None);

        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "bad_request");
        assert!(!dir.path().join("session.toml").exists());
    });
}

#[test]
fn list_returns_config_failure_for_unsupported_base_url() {
    with_env(&[("INVOICEDESK_API_BASE_URL", "ftp://sales.example")], || {
        let dir = TempDir::new().expect("temp dir");
        let options = LoadOptions {
            overrides: ConfigOverrides {
                credentials_path: Some(dir.path().join("session.toml")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };

        let result = list::run(&options, false, false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "list");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn list_without_credentials_makes_no_request() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");

        let result = list::run(&options(Some(addr), dir.path()), false, true);

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "session_expired");
        assert_eq!(api.list_calls(), 0);
    });
}

#[test]
fn list_json_renders_listing_with_pending_count() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let options = logged_in(addr, &dir, TOKEN);

        let result = list::run(&options, false, true);
        assert_eq!(result.exit_code, 0, "list output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "list");
        assert_eq!(payload["user_type"], "Buyer");
        assert_eq!(payload["total"], 3);
        assert_eq!(payload["pending"], 1);
        assert_eq!(payload["invoices"][0]["label"], "INV-7");
        assert_eq!(payload["invoices"][0]["amount"], "1,200.00");
        assert_eq!(payload["invoices"][0]["status"], "Approved");
        assert_eq!(payload["invoices"][2]["label"], "ID-9");
        assert_eq!(payload["invoices"][2]["status"], "N/A");

        let pending = parse_payload(&list::run(&options, true, true).output);
        let labels: Vec<_> = pending["invoices"]
            .as_array()
            .expect("invoices array")
            .iter()
            .map(|row| row["label"].clone())
            .collect();
        assert_eq!(labels, vec![json!("INV-8")]);
        assert_eq!(pending["total"], 3);
    });
}

#[test]
fn list_human_output_greets_the_user() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");

        let result = list::run(&logged_in(addr, &dir, TOKEN), false, false);

        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("Welcome, Buyer"));
        assert!(result.output.contains("INV-8"));
        assert!(result.output.ends_with("invoices: 3 (pending: 1)"));
    });
}

#[test]
fn rejected_token_clears_credentials() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let options = logged_in(addr, &dir, "stale-token-value");

        let result = list::run(&options, false, true);

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "session_expired");
        assert!(!dir.path().join("session.toml").exists());
    });
}

#[test]
fn submit_all_reports_partial_failure_and_refreshes() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let options = logged_in(addr, &dir, TOKEN);
        let args = SubmitArgs { all: true, assume_yes: true, json: true, ..SubmitArgs::default() };

        let result = submit::run(&options, &args);
        assert_eq!(result.exit_code, 7, "submit output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "partial_failure");
        assert_eq!(payload["attempted"], 3);
        assert_eq!(payload["succeeded"], 2);
        assert_eq!(payload["failed"], 1);
        assert_eq!(payload["outcomes"][1]["label"], "INV-8");
        assert_eq!(payload["outcomes"][1]["error"], "lot already under review");
        assert_eq!(payload["refreshed"], 3);

        let posted = api.posted();
        let invoice_numbers: Vec<_> = posted.iter().map(|body| body["invoiceNo"].clone()).collect();
        assert_eq!(invoice_numbers, vec![json!("INV-7"), json!("INV-8"), json!("")]);
        assert_eq!(posted[0]["price"], json!(600.0));
        assert_eq!(api.list_calls(), 2);
    });
}

#[test]
fn submit_selected_ids_in_given_order() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let options = logged_in(addr, &dir, TOKEN);
        let args =
            SubmitArgs { ids: vec![9, 7, 9], assume_yes: true, ..SubmitArgs::default() };

        let result = submit::run(&options, &args);

        assert_eq!(result.exit_code, 0, "submit output: {}", result.output);
        assert!(result.output.starts_with("ok ID-9\nok INV-7"));
        assert!(result.output.contains("submitted 2 of 2 invoice(s) for approval (0 failed)"));
        assert_eq!(api.posted().len(), 2);
    });
}

#[test]
fn submit_unlisted_id_is_a_bad_request() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let args = SubmitArgs { ids: vec![404], assume_yes: true, ..SubmitArgs::default() };

        let result = submit::run(&logged_in(addr, &dir, TOKEN), &args);

        assert_eq!(result.exit_code, 6);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert!(payload["message"].as_str().unwrap_or("").contains("404"));
        assert!(api.posted().is_empty());
    });
}

#[test]
fn submit_without_selection_flags_is_a_bad_request() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = submit::run(&options(None, dir.path()), &SubmitArgs::default());

        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "bad_request");
    });
}

#[test]
fn declined_confirmation_sends_nothing() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");
        let prompt = Decline::default();
        let args = SubmitArgs { ids: vec![7, 8], ..SubmitArgs::default() };

        let result = submit::run_with_prompt(&logged_in(addr, &dir, TOKEN), &args, &prompt);

        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"].as_str().unwrap_or("").contains("cancelled"));
        assert!(api.posted().is_empty());

        let seen = prompt.seen.lock().expect("prompt lock");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("Selected: 2 invoices"));
        assert!(seen[0].contains("Total: LKR 1,210.00"));
    });
}

#[test]
fn doctor_skips_api_check_without_credentials() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = doctor::run(&options(None, dir.path()), true);

        assert_eq!(result.exit_code, 5);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "pass");
        assert_eq!(payload["checks"][1]["name"], "credentials_present");
        assert_eq!(payload["checks"][1]["status"], "fail");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_passes_against_a_reachable_api() {
    with_env(&[], || {
        let api = FakeSalesApi::default();
        let addr = api.spawn();
        let dir = TempDir::new().expect("temp dir");

        let result = doctor::run(&logged_in(addr, &dir, TOKEN), false);

        assert_eq!(result.exit_code, 0, "doctor output: {}", result.output);
        assert!(result.output.starts_with("doctor: all readiness checks passed"));
        assert!(result.output.contains("- [ok] api_reachability:"));
    });
}

#[test]
fn config_reports_sources_and_redacts_token() {
    with_env(&[("INVOICEDESK_DISPLAY_CURRENCY", "USD")], || {
        let dir = TempDir::new().expect("temp dir");
        let options = options(None, dir.path());
        assert_eq!(session::login(&options, TOKEN, None).exit_code, 0);

        let result = config::run(&options);

        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .contains("- display.currency = USD (source: env (INVOICEDESK_DISPLAY_CURRENCY))"));
        assert!(result.output.contains("- api.sales_path = /api/Sales (source: default)"));
        assert!(result.output.contains("(source: flag)"));
        assert!(result.output.contains("session.auth_token = good***"));
        assert!(!result.output.contains(TOKEN));
    });
}

#[derive(Default)]
struct Decline {
    seen: Mutex<Vec<String>>,
}

impl ConfirmationPrompt for Decline {
    fn confirm(&self, _summary: &ConfirmationSummary, message: &str) -> bool {
        self.seen.lock().expect("prompt lock").push(message.to_string());
        false
    }
}

#[derive(Clone, Default)]
struct FakeSalesApi {
    list_calls: Arc<Mutex<usize>>,
    posted: Arc<Mutex<Vec<Value>>>,
}

impl FakeSalesApi {
    fn list_calls(&self) -> usize {
        *self.list_calls.lock().expect("fake api lock")
    }

    fn posted(&self) -> Vec<Value> {
        self.posted.lock().expect("fake api lock").clone()
    }

    /// Serves on its own thread so commands can drive their own runtimes.
    fn spawn(&self) -> SocketAddr {
        let app = Router::new()
            .route("/api/Sales", get(list_sales).post(create_sale))
            .with_state(self.clone());
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("server runtime should build");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("loopback listener should bind");
                sender
                    .send(listener.local_addr().expect("listener should have an address"))
                    .expect("address should be delivered");
                let _ = axum::serve(listener, app).await;
            });
        });

        receiver.recv().expect("server should report its address")
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {TOKEN}");
    headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

async fn list_sales(State(api): State<FakeSalesApi>, headers: HeaderMap) -> (StatusCode, String) {
    *api.list_calls.lock().expect("fake api lock") += 1;
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }

    let listing = json!({
        "success": true,
        "data": [
            { "id": 7, "invoiceNo": "INV-7", "buyerName": "Harbor Traders", "price": 600, "quantity": 2, "approvalStatusString": "Approved" },
            { "id": 8, "invoiceNo": "INV-8", "price": "10", "quantity": 1, "approvalStatusString": "pending" },
            { "id": 9, "price": null, "quantity": 5 }
        ]
    });
    (StatusCode::OK, listing.to_string())
}

async fn create_sale(
    State(api): State<FakeSalesApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }

    let rejected = body["invoiceNo"] == "INV-8";
    api.posted.lock().expect("fake api lock").push(body);
    if rejected {
        return (StatusCode::UNPROCESSABLE_ENTITY, "lot already under review".to_string());
    }
    (StatusCode::CREATED, String::new())
}

fn options(addr: Option<SocketAddr>, dir: &Path) -> LoadOptions {
    LoadOptions {
        overrides: ConfigOverrides {
            api_base_url: addr.map(|addr| format!("http://{addr}")),
            credentials_path: Some(dir.join("session.toml")),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }
}

fn logged_in(addr: SocketAddr, dir: &TempDir, token: &str) -> LoadOptions {
    let options = options(Some(addr), dir.path());
    let login = session::login(&options, token, None);
    assert_eq!(login.exit_code, 0, "login output: {}", login.output);
    options
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "INVOICEDESK_API_BASE_URL",
        "INVOICEDESK_API_SALES_PATH",
        "INVOICEDESK_API_TIMEOUT_SECS",
        "INVOICEDESK_SESSION_CREDENTIALS_PATH",
        "INVOICEDESK_SESSION_LOGIN_URL",
        "INVOICEDESK_SESSION_DEFAULT_USER_TYPE",
        "INVOICEDESK_DISPLAY_CURRENCY",
        "INVOICEDESK_LOGGING_LEVEL",
        "INVOICEDESK_LOGGING_FORMAT",
        "INVOICEDESK_LOG_LEVEL",
        "INVOICEDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
