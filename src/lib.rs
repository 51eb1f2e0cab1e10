#![forbid(unsafe_code)]
//! mailprobe: checks whether an e-mail address is deliverable without
//! sending mail: syntax, MX lookup, then an SMTP dialogue that stops after
//! `RCPT TO`.

pub mod batch;
pub mod mx;
pub mod probe;
pub mod report;
pub mod validator;
pub mod verify;

mod verdict;

pub use batch::{Batch, BatchError, LossyLines, open_source, run_batch};
pub use mx::{Error as MxError, LookupMx, MxRecord, resolve_mx};
pub use probe::{ProbeOptions, ProbeReport, SmtpReply, probe_recipient};
pub use report::{Severity, StatusLine, status_lines};
pub use validator::{
    ValidationMode, ValidationReport, is_valid_address, split_address, validate_email,
};
pub use verdict::Verdict;
pub use verify::{Verification, Verifier, Verify, VerifyOptions};
