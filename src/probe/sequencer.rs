use std::time::Instant;

use native_tls::TlsConnector;
use tracing::{debug, info};

use crate::Verdict;

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::session::{SmtpReply, SmtpSession};
use super::types::ProbeReport;

/// Asks `target_host` whether it would accept mail for `recipient`, without
/// ever reaching `DATA`.
///
/// The dialogue is a single pass: connect, greeting, `EHLO` (falling back to
/// `HELO`), `STARTTLS` when advertised, `MAIL FROM` with the synthetic sender,
/// then `RCPT TO`. The returned verdict is one of `ConnectionFailed`,
/// `ProtocolNegotiationFailed`, `SenderRejected`, `RecipientRejected` or
/// `RecipientAccepted`. The connection is closed before this returns,
/// whatever the outcome.
pub fn probe_recipient(recipient: &str, target_host: &str, options: &ProbeOptions) -> ProbeReport {
    let deadline = options
        .session_timeout
        .map(|limit| Instant::now() + limit);

    let mut session =
        match SmtpSession::connect(target_host, options.port, options.timeout(), deadline) {
            Ok(session) => session,
            Err(err) => {
                let halt = Halt::from_error(Verdict::ConnectionFailed, &err);
                return finish(target_host, halt, false, Vec::new());
            }
        };

    let outcome = converse(&mut session, recipient, target_host, options);
    let encrypted = session.is_encrypted();
    let halt = match outcome {
        Ok(halt) | Err(halt) => halt,
    };
    // QUIT only to a server that is still answering; after a timeout it
    // would just cost another one.
    let graceful = halt.reply.is_some()
        && matches!(
            halt.verdict,
            Verdict::SenderRejected | Verdict::RecipientRejected | Verdict::RecipientAccepted
        );
    let transcript = session.close(graceful);
    finish(target_host, halt, encrypted, transcript)
}

/// Where the dialogue stopped and why.
struct Halt {
    verdict: Verdict,
    reply: Option<SmtpReply>,
    detail: Option<String>,
}

impl Halt {
    fn from_error(verdict: Verdict, err: &ProbeError) -> Self {
        Self {
            verdict,
            reply: None,
            detail: Some(err.to_string()),
        }
    }

    fn from_reply(verdict: Verdict, context: &str, reply: SmtpReply) -> Self {
        Self {
            verdict,
            detail: Some(format!("{context}: {reply}")),
            reply: Some(reply),
        }
    }
}

trait OrHalt<T> {
    fn or_halt(self, verdict: Verdict) -> Result<T, Halt>;
}

impl<T> OrHalt<T> for Result<T, ProbeError> {
    fn or_halt(self, verdict: Verdict) -> Result<T, Halt> {
        self.map_err(|err| Halt::from_error(verdict, &err))
    }
}

/// Requires a 2xx reply, otherwise stops with `verdict`.
fn expect_positive(reply: SmtpReply, verdict: Verdict, context: &str) -> Result<SmtpReply, Halt> {
    if reply.is_positive_completion() {
        Ok(reply)
    } else {
        Err(Halt::from_reply(verdict, context, reply))
    }
}

fn converse(
    session: &mut SmtpSession,
    recipient: &str,
    host: &str,
    options: &ProbeOptions,
) -> Result<Halt, Halt> {
    let greeting = session.read_reply().or_halt(Verdict::ConnectionFailed)?;
    expect_positive(greeting, Verdict::ConnectionFailed, "greeting refused")?;

    let helo = options.helo_name();
    let ehlo_cmd = format!("EHLO {helo}");
    let ehlo = session
        .command(&ehlo_cmd)
        .or_halt(Verdict::ConnectionFailed)?;
    let starttls_offered = if ehlo.is_positive_completion() {
        ehlo.has_capability("STARTTLS")
    } else {
        debug!(host, code = ehlo.code, "EHLO refused, falling back to HELO");
        let reply = session
            .command(&format!("HELO {helo}"))
            .or_halt(Verdict::ConnectionFailed)?;
        expect_positive(reply, Verdict::ConnectionFailed, "HELO refused")?;
        false
    };

    if starttls_offered {
        let connector = permissive_connector().or_halt(Verdict::ProtocolNegotiationFailed)?;
        let reply = session
            .starttls(host, &connector)
            .or_halt(Verdict::ProtocolNegotiationFailed)?;
        expect_positive(
            reply,
            Verdict::ProtocolNegotiationFailed,
            "STARTTLS refused",
        )?;
        let reply = session
            .command(&ehlo_cmd)
            .or_halt(Verdict::ProtocolNegotiationFailed)?;
        expect_positive(
            reply,
            Verdict::ProtocolNegotiationFailed,
            "EHLO refused after STARTTLS",
        )?;
    }

    let mail_from = format!("MAIL FROM:<{}>", options.envelope_sender());
    let reply = session
        .command(&mail_from)
        .or_halt(Verdict::SenderRejected)?;
    expect_positive(reply, Verdict::SenderRejected, "MAIL FROM refused")?;

    let rcpt_to = format!("RCPT TO:<{recipient}>");
    let reply = session
        .command(&rcpt_to)
        .or_halt(Verdict::RecipientRejected)?;
    let reply = expect_positive(reply, Verdict::RecipientRejected, "RCPT TO refused")?;

    Ok(Halt {
        verdict: Verdict::RecipientAccepted,
        reply: Some(reply),
        detail: None,
    })
}

/// TLS for a liveness probe: the host name is sent for SNI, but neither the
/// chain nor the name is verified, so self-signed and mis-named relays still
/// answer.
fn permissive_connector() -> Result<TlsConnector, ProbeError> {
    TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|err| ProbeError::TlsSetup { source: err })
}

fn finish(host: &str, halt: Halt, encrypted: bool, transcript: Vec<String>) -> ProbeReport {
    info!(
        host,
        verdict = %halt.verdict,
        detail = halt.detail.as_deref().unwrap_or(""),
        "probe finished"
    );
    ProbeReport {
        host: host.to_string(),
        verdict: halt.verdict,
        reply: halt.reply,
        detail: halt.detail,
        encrypted,
        transcript,
    }
}
