use std::process::ExitCode;

fn main() -> ExitCode {
    tembea_cli::run()
}
