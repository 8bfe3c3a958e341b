use std::process::ExitCode;

fn main() -> ExitCode {
    invoicedesk_cli::run()
}
