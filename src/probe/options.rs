use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Envelope sender used for `MAIL FROM`. Deliberately not deliverable so
/// the operator's identity never reaches the probed server.
pub const DEFAULT_MAIL_FROM: &str = "verify@example.com";

/// Configuration knobs for [`probe_recipient`](super::probe_recipient).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub helo_domain: String,
    pub mail_from: String,
    /// Bound on the TCP connect and on every individual read or write.
    pub timeout: Duration,
    /// Bound on the whole dialogue; `None` disables it.
    pub session_timeout: Option<Duration>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: "localhost".to_string(),
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            timeout: Duration::from_secs(5),
            session_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl ProbeOptions {
    /// Per-operation timeout. A zero duration would disable the socket
    /// timeouts altogether, so it is clamped to one millisecond.
    pub fn timeout(&self) -> Duration {
        self.timeout.max(Duration::from_millis(1))
    }

    pub fn helo_name(&self) -> &str {
        non_blank(&self.helo_domain).unwrap_or("localhost")
    }

    pub fn envelope_sender(&self) -> &str {
        non_blank(&self.mail_from).unwrap_or(DEFAULT_MAIL_FROM)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
