use clap::Parser;
use strategen::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
