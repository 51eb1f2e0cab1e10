use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::{ArgAction, Parser, ValueEnum};
use mailprobe::probe::DEFAULT_MAIL_FROM;
use mailprobe::{ProbeOptions, VerifyOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    /// one JSON object per address (feature `with-serde`)
    Ndjson,
}

#[derive(Debug, Parser)]
#[command(
    name = "mailprobe",
    version,
    about = "Checks whether e-mail addresses are deliverable without sending mail"
)]
pub struct Cli {
    /// address to verify
    #[arg(long, value_name = "ADDRESS")]
    pub email: Option<String>,

    /// file with one address per line
    #[arg(long, value_name = "PATH", value_parser = OsStringValueParser::new().map(PathBuf::from))]
    pub file: Option<PathBuf>,

    /// connect / command timeout in milliseconds
    #[arg(long, env = "MAILPROBE_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// SMTP port on the mail exchanger
    #[arg(long, env = "MAILPROBE_PORT", default_value_t = 25)]
    pub port: u16,

    /// name announced in EHLO/HELO
    #[arg(long, env = "MAILPROBE_HELO", default_value = "localhost")]
    pub helo: String,

    /// envelope sender used for MAIL FROM
    #[arg(long, env = "MAILPROBE_FROM", default_value = DEFAULT_MAIL_FROM)]
    pub from: String,

    /// print the SMTP transcript under each result
    #[arg(long)]
    pub transcript: bool,

    /// disable ANSI colors
    #[arg(long)]
    pub no_color: bool,

    /// -v for info logs, -vv for debug (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, value_enum, default_value_t = Format::Human)]
    pub format: Format,
}

impl Cli {
    /// Parses the process arguments, accepting `-email`/`-file` as well.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_legacy_flags(std::env::args_os()))
    }

    /// Empty flag values count as absent.
    pub fn has_input(&self) -> bool {
        self.email().is_some() || self.file().is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|email| !email.is_empty())
    }

    pub fn file(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            probe: ProbeOptions {
                port: self.port,
                helo_domain: self.helo.clone(),
                mail_from: self.from.clone(),
                timeout: Duration::from_millis(self.timeout_ms),
                ..ProbeOptions::default()
            },
            ..VerifyOptions::default()
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Rewrites single-dash long flags (`-email x`, `-file=x`) to their
/// double-dash form so clap accepts them.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let is_legacy = ["-email", "-file"].iter().any(|flag| {
                text == *flag || text.strip_prefix(flag).is_some_and(|rest| rest.starts_with('='))
            });
            if is_legacy {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}
