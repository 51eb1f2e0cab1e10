use anyhow::{Result, bail};
use colored::{ColoredString, Colorize};
use mailprobe::{BatchError, Severity, StatusLine, Verification, status_lines};

use crate::args::{Cli, Format};

pub struct Printer {
    format: Format,
    transcript: bool,
}

impl Printer {
    /// Fails early when the requested format was compiled out.
    pub fn new(cli: &Cli) -> Result<Self> {
        if cli.format == Format::Ndjson && !cfg!(feature = "with-serde") {
            bail!("--format ndjson requires the 'with-serde' feature");
        }
        Ok(Self {
            format: cli.format,
            transcript: cli.transcript,
        })
    }

    pub fn emit(&self, verification: &Verification) -> Result<()> {
        match self.format {
            Format::Human => {
                for line in status_lines(verification) {
                    println!("{}", paint(&line));
                }
                if self.transcript {
                    for line in &verification.transcript {
                        println!("    {}", line.as_str().dimmed());
                    }
                }
                println!();
            }
            Format::Ndjson => emit_json(verification)?,
        }
        Ok(())
    }
}

#[cfg(feature = "with-serde")]
fn emit_json(verification: &Verification) -> Result<()> {
    println!("{}", serde_json::to_string(verification)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn emit_json(_: &Verification) -> Result<()> {
    bail!("--format ndjson requires the 'with-serde' feature")
}

pub fn paint(line: &StatusLine) -> ColoredString {
    let text = line.to_string();
    let text = text.as_str();
    match line.severity {
        Severity::Success => text.green(),
        Severity::Info => text.cyan(),
        Severity::Warning => text.yellow(),
        Severity::Failure => text.red(),
    }
}

/// The batch ends after this; addresses already verified stay reported.
pub fn report_source_error(err: &BatchError) {
    eprintln!("{}", format!("{} {err}", Severity::Failure.tag()).red());
}

pub fn print_usage() {
    println!("{}", "Usage:".yellow());
    println!("{}", "  mailprobe -email test@example.com".cyan());
    println!("{}", "  mailprobe -file emails.txt".cyan());
    println!("{}", "  mailprobe --help for every option".cyan());
}
