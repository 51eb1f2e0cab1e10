use crate::Verdict;
use crate::probe::{ProbeReport, SmtpReply};

/// Configuration for a [`Verifier`](super::Verifier).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub probe: crate::probe::ProbeOptions,
    pub dns_timeout: std::time::Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            probe: crate::probe::ProbeOptions::default(),
            dns_timeout: crate::mx::DEFAULT_DNS_TIMEOUT,
        }
    }
}

/// Outcome of verifying one address: the verdict plus what was learned on
/// the way to it.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub address: String,
    /// ASCII form of the domain, once the syntax check passed.
    pub domain: Option<String>,
    /// The exchanger that was probed.
    pub mx_host: Option<String>,
    pub verdict: Verdict,
    pub detail: Option<String>,
    pub reply: Option<SmtpReply>,
    pub encrypted: bool,
    pub transcript: Vec<String>,
}

impl Verification {
    pub(crate) fn syntax_invalid(address: &str, reasons: &[String]) -> Self {
        Self {
            address: address.to_string(),
            domain: None,
            mx_host: None,
            verdict: Verdict::SyntaxInvalid,
            detail: Some(reasons.join("; ")),
            reply: None,
            encrypted: false,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn domain_unresolvable(address: &str, domain: &str, detail: String) -> Self {
        Self {
            address: address.to_string(),
            domain: Some(domain.to_string()),
            mx_host: None,
            verdict: Verdict::DomainUnresolvable,
            detail: Some(detail),
            reply: None,
            encrypted: false,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn from_probe(address: &str, domain: &str, probe: ProbeReport) -> Self {
        Self {
            address: address.to_string(),
            domain: Some(domain.to_string()),
            mx_host: Some(probe.host),
            verdict: probe.verdict,
            detail: probe.detail,
            reply: probe.reply,
            encrypted: probe.encrypted,
            transcript: probe.transcript,
        }
    }
}
