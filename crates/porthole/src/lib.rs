mod ops;

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    generate: ops::generate::Args,
}

/// Exit condition of a porthole run.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error,
    /// A termination request cut the run short before any output was
    /// written.
    TerminatedEarly,
}

impl ExitStatus {
    /// The exit code the process reports for this status.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
            ExitStatus::TerminatedEarly => 130,
        }
    }
}

pub fn run_with_args<T, I>(args: I) -> Result<ExitStatus, anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(error) => return handle_parse_error(&error),
    };

    if args.generate.is_empty() {
        Args::command().print_help()?;
        return Ok(ExitStatus::Success);
    }

    ops::generate::generate(args.generate)
}

/// Help and version requests surface through the error path of
/// `try_parse_from` but are successful runs; everything else is a real
/// argument error.
fn handle_parse_error(error: &clap::Error) -> Result<ExitStatus, anyhow::Error> {
    error.print()?;
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Ok(ExitStatus::Success),
        _ => Ok(ExitStatus::Error),
    }
}
