mod args;
mod output;

use anyhow::{Context, Result};
use mailprobe::{Verifier, open_source, run_batch};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use args::Cli;
use output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_tracing(&cli);

    if !cli.has_input() {
        output::print_usage();
        std::process::exit(1);
    }

    let printer = Printer::new(&cli)?;

    // Opened up front so a bad path aborts before anything is verified.
    let lines = cli
        .file()
        .map(|path| open_source(path).context("cannot read the address file"))
        .transpose()?;

    let verifier = Verifier::from_system_conf(cli.verify_options())
        .context("cannot initialise the system DNS resolver")?;

    if let Some(email) = cli.email() {
        printer.emit(&verifier.verify(email))?;
    }

    if let Some(lines) = lines {
        for result in run_batch(&verifier, lines) {
            match result {
                Ok(verification) => printer.emit(&verification)?,
                Err(err) => output::report_source_error(&err),
            }
        }
    }

    debug!("run finished");
    Ok(())
}

fn init_tracing(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
