#![deny(unsafe_code)]

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    ezbak_cli::exit_code_from(ezbak_cli::run(env::args_os()))
}
