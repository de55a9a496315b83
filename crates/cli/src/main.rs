use std::process::ExitCode;

fn main() -> ExitCode {
    repairdesk_cli::run()
}
