use std::process::ExitCode;

fn main() -> ExitCode {
    envmap_cli::run()
}
