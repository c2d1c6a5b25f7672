use std::process;

use porthole::{run_with_args, ExitStatus};

fn main() {
    pretty_env_logger::init();

    let status = match run_with_args(std::env::args_os()) {
        Ok(status) => status,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitStatus::Error
        }
    };
    process::exit(status.code());
}
