use std::fmt;

/// Terminal outcome of one verification. Exactly one per address per run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The address failed the syntax check; no network call was made.
    SyntaxInvalid,
    /// The MX lookup failed or returned no usable exchanger.
    DomainUnresolvable,
    /// TCP connect, greeting or EHLO/HELO failed or timed out.
    ConnectionFailed,
    /// STARTTLS was advertised but the upgrade did not complete.
    ProtocolNegotiationFailed,
    /// The server refused the synthetic `MAIL FROM`.
    SenderRejected,
    /// The server refused `RCPT TO` for the candidate.
    RecipientRejected,
    /// The server accepted `RCPT TO` for the candidate.
    RecipientAccepted,
}

impl Verdict {
    pub const ALL: [Verdict; 7] = [
        Self::SyntaxInvalid,
        Self::DomainUnresolvable,
        Self::ConnectionFailed,
        Self::ProtocolNegotiationFailed,
        Self::SenderRejected,
        Self::RecipientRejected,
        Self::RecipientAccepted,
    ];

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::RecipientAccepted)
    }

    /// `true` once the SMTP server itself was reached and answered the
    /// envelope, i.e. the verdict says something about the mailbox.
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::RecipientAccepted | Self::RecipientRejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxInvalid => "syntax-invalid",
            Self::DomainUnresolvable => "domain-unresolvable",
            Self::ConnectionFailed => "connection-failed",
            Self::ProtocolNegotiationFailed => "protocol-negotiation-failed",
            Self::SenderRejected => "sender-rejected",
            Self::RecipientRejected => "recipient-rejected",
            Self::RecipientAccepted => "recipient-accepted",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
