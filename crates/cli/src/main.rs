use std::process::ExitCode;

fn main() -> ExitCode {
    woundrx_cli::run()
}
