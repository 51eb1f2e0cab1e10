//! SMTP recipient probing.
//!
//! The public entry point is [`probe_recipient`], which drives a minimal SMTP
//! dialogue against one mail exchanger and classifies the server's answer to
//! `RCPT TO` into a [`Verdict`](crate::Verdict), carried by a [`ProbeReport`].

mod error;
mod options;
mod sequencer;
mod session;
mod types;

pub use error::ProbeError;
pub use options::{DEFAULT_MAIL_FROM, ProbeOptions};
pub use sequencer::probe_recipient;
pub use session::SmtpReply;
pub use types::ProbeReport;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;
