use crate::Verdict;

use super::SmtpReply;

/// Everything observed during one probe against one mail exchanger.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub host: String,
    pub verdict: Verdict,
    /// The server reply that decided the verdict, when there was one.
    pub reply: Option<SmtpReply>,
    /// Human-readable cause for anything other than an accepted recipient.
    pub detail: Option<String>,
    /// Whether the dialogue ran over TLS when it ended.
    pub encrypted: bool,
    pub transcript: Vec<String>,
}
