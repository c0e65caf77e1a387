use std::process::ExitCode;

fn main() -> ExitCode {
    mealdesk_cli::run()
}
