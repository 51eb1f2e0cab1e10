//! Human-readable rendering of a [`Verification`].
//!
//! Nothing here writes to the console; the binary decides how (and whether)
//! to color the lines.

use std::fmt;

use crate::Verdict;
use crate::verify::Verification;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Failure,
}

impl Severity {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Success => "[OK]",
            Self::Info => "[INFO]",
            Self::Warning => "[WARN]",
            Self::Failure => "[FAIL]",
        }
    }
}

impl From<Verdict> for Severity {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::RecipientAccepted => Self::Success,
            Verdict::SyntaxInvalid | Verdict::DomainUnresolvable | Verdict::RecipientRejected => {
                Self::Failure
            }
            Verdict::ConnectionFailed
            | Verdict::ProtocolNegotiationFailed
            | Verdict::SenderRejected => Self::Warning,
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub severity: Severity,
    pub text: String,
}

impl StatusLine {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.tag(), self.text)
    }
}

/// Stage-by-stage lines for one verification, ending with the verdict line.
pub fn status_lines(v: &Verification) -> Vec<StatusLine> {
    let detail = v.detail.as_deref().unwrap_or("no further detail");
    let verdict_text = match v.verdict {
        Verdict::SyntaxInvalid => {
            return vec![StatusLine::new(
                Severity::Failure,
                format!("invalid email format: {} ({detail})", v.address),
            )];
        }
        Verdict::DomainUnresolvable => {
            let domain = v.domain.as_deref().unwrap_or(&v.address);
            return vec![StatusLine::new(
                Severity::Failure,
                format!("no valid mail server found for domain: {domain} ({detail})"),
            )];
        }
        Verdict::ConnectionFailed => format!("failed to connect to mail server: {detail}"),
        Verdict::ProtocolNegotiationFailed => format!("failed to start TLS: {detail}"),
        Verdict::SenderRejected => format!("MAIL FROM command failed: {detail}"),
        Verdict::RecipientRejected => format!("email does not exist: {detail}"),
        Verdict::RecipientAccepted => format!("email exists: {}", v.address),
    };

    vec![
        StatusLine::new(
            Severity::Success,
            format!("valid email format and domain exists: {}", v.address),
        ),
        StatusLine::new(
            Severity::Info,
            format!(
                "checking SMTP server: {}",
                v.mx_host.as_deref().unwrap_or("unknown")
            ),
        ),
        StatusLine::new(Severity::from(v.verdict), verdict_text),
    ]
}
