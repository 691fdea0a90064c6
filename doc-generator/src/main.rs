use std::process::ExitCode;

use clap::Parser;
use protoc_gen_doc::cli::{Arguments, ExitStatus};

fn main() -> ExitCode {
    protoc_gen_doc::logging::init();
    let args = Arguments::parse();

    match protoc_gen_doc::cli::run(args) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitStatus::Failure.into()
        }
    }
}
