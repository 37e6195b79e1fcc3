use std::process::ExitCode;

fn main() -> ExitCode {
    quotewise_cli::run()
}
