use std::process::ExitCode;

fn main() -> ExitCode {
    loadline_cli::run()
}
