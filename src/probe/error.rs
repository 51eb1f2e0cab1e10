use thiserror::Error;

/// Failures inside one SMTP dialogue. The sequencer turns these into a
/// [`Verdict`](crate::Verdict) plus a human-readable detail; they never
/// escape [`probe_recipient`](super::probe_recipient).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no socket address for {host}")]
    NoAddresses { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("timed out waiting for the server")]
    Timeout,
    #[error("TLS setup failed: {source}")]
    TlsSetup {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ProbeError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Blocking sockets report an expired read/write timeout as
    /// `WouldBlock` on Unix and `TimedOut` on Windows.
    pub(crate) fn io(source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io { source },
        }
    }
}
