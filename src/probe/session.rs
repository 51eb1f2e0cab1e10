use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use native_tls::{HandshakeError, TlsConnector, TlsStream};
use tracing::debug;

use super::error::ProbeError;

const MAX_LINE_LEN: usize = 4096;
const MAX_REPLY_LINES: usize = 128;

/// One (possibly multi-line) SMTP reply.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// Looks `cap` up among the EHLO keywords. The first line carries the
    /// server's greeting name, not an extension.
    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }

    pub fn message(&self) -> String {
        self.lines.join(" ")
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.message())
        }
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

#[derive(Debug)]
pub(crate) struct SmtpStream {
    state: StreamState,
    buffer: Vec<u8>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl SmtpStream {
    fn connect(
        addr: &SocketAddr,
        connect_budget: Duration,
        timeout: Duration,
        deadline: Option<Instant>,
    ) -> Result<Self, ProbeError> {
        let stream = TcpStream::connect_timeout(addr, connect_budget).map_err(|err| {
            match err.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProbeError::Timeout,
                _ => ProbeError::Connect {
                    host: addr.to_string(),
                    source: err,
                },
            }
        })?;
        stream.set_nodelay(true).map_err(ProbeError::io)?;
        Ok(Self {
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
            timeout,
            deadline,
        })
    }

    fn is_tls(&self) -> bool {
        matches!(self.state, StreamState::Tls(_))
    }

    fn tcp(&self) -> Result<&TcpStream, ProbeError> {
        match &self.state {
            StreamState::Plain(stream) => Ok(stream),
            StreamState::Tls(stream) => Ok(stream.get_ref()),
            StreamState::Closed => Err(ProbeError::protocol("connection already closed")),
        }
    }

    /// Applies the tighter of the per-operation timeout and what is left of
    /// the session deadline to the underlying socket.
    fn arm_timeouts(&self) -> Result<(), ProbeError> {
        let budget = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(ProbeError::Timeout);
                }
                remaining.min(self.timeout)
            }
            None => self.timeout,
        };
        let tcp = self.tcp()?;
        tcp.set_read_timeout(Some(budget)).map_err(ProbeError::io)?;
        tcp.set_write_timeout(Some(budget)).map_err(ProbeError::io)
    }

    fn upgrade_tls(&mut self, domain: &str, connector: &TlsConnector) -> Result<(), ProbeError> {
        if !self.buffer.is_empty() {
            return Err(ProbeError::protocol(
                "server sent data before the TLS handshake",
            ));
        }
        self.arm_timeouts()?;
        let plain = match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Err(ProbeError::protocol("session is already encrypted"));
            }
            StreamState::Closed => {
                return Err(ProbeError::protocol("connection already closed"));
            }
        };
        let tls = complete_handshake(connector, domain, plain)?;
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    fn send_line(&mut self, line: &str) -> Result<(), ProbeError> {
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.arm_timeouts()?;
        match &mut self.state {
            StreamState::Plain(stream) => {
                stream.write_all(&data).map_err(ProbeError::io)?;
                stream.flush().map_err(ProbeError::io)
            }
            StreamState::Tls(stream) => {
                stream.write_all(&data).map_err(ProbeError::io)?;
                stream.flush().map_err(ProbeError::io)
            }
            StreamState::Closed => Err(ProbeError::protocol("connection already closed")),
        }
    }

    fn read_reply(&mut self) -> Result<SmtpReply, ProbeError> {
        let (code, mut more, first) = parse_reply_line(&self.read_line()?)?;
        let mut reply = SmtpReply {
            code,
            lines: vec![first],
        };
        while more {
            if reply.lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::protocol("reply has too many lines"));
            }
            let (next_code, continued, text) = parse_reply_line(&self.read_line()?)?;
            if next_code != reply.code {
                return Err(ProbeError::protocol(format!(
                    "reply code changed from {} to {next_code} mid-reply",
                    reply.code
                )));
            }
            reply.lines.push(text);
            more = continued;
        }
        Ok(reply)
    }

    fn read_line(&mut self) -> Result<String, ProbeError> {
        loop {
            if let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
                if end > MAX_LINE_LEN {
                    return Err(ProbeError::protocol("reply line too long"));
                }
                let raw: Vec<u8> = self.buffer.drain(..=end).collect();
                let line = raw
                    .strip_suffix(b"\r\n")
                    .or_else(|| raw.strip_suffix(b"\n"))
                    .unwrap_or(&raw[..]);
                return Ok(String::from_utf8_lossy(line).into_owned());
            }
            if self.buffer.len() > MAX_LINE_LEN {
                return Err(ProbeError::protocol("reply line too long"));
            }

            self.arm_timeouts()?;
            let mut chunk = [0u8; 1024];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut chunk),
                StreamState::Tls(stream) => stream.read(&mut chunk),
                StreamState::Closed => {
                    return Err(ProbeError::protocol("connection already closed"));
                }
            }
            .map_err(ProbeError::io)?;
            if read == 0 {
                return Err(ProbeError::Io {
                    source: io::ErrorKind::UnexpectedEof.into(),
                });
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    /// Closes the transport. Safe to call more than once.
    fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Plain(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            StreamState::Tls(mut stream) => {
                let _ = stream.shutdown();
                let _ = stream.get_ref().shutdown(Shutdown::Both);
            }
            StreamState::Closed => {}
        }
    }
}

/// Sockets are blocking, so `WouldBlock` here only means a read timeout
/// fired in the middle of the handshake.
fn complete_handshake(
    connector: &TlsConnector,
    domain: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, ProbeError> {
    match connector.connect(domain, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(ProbeError::Tls { source: err }),
        Err(HandshakeError::WouldBlock(_)) => Err(ProbeError::Timeout),
    }
}

/// When the dial must be done: `timeout` from `now`, or the session
/// deadline if that comes first.
fn connect_deadline(now: Instant, timeout: Duration, session: Option<Instant>) -> Instant {
    let own = now + timeout;
    session.map_or(own, |session| session.min(own))
}

/// Splits `250-text` / `250 text` into code, continuation flag and text.
fn parse_reply_line(line: &str) -> Result<(u16, bool, String), ProbeError> {
    let code = line
        .get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| ProbeError::protocol(format!("malformed reply line: {line:?}")))?;
    let continued = line.as_bytes().get(3) == Some(&b'-');
    let text = line.get(4..).unwrap_or_default().to_string();
    Ok((code, continued, text))
}

/// Exclusive owner of one SMTP connection. Dropping the session shuts the
/// socket down, so every exit path of a probe releases the connection
/// exactly once.
pub(crate) struct SmtpSession {
    host: String,
    stream: SmtpStream,
    transcript: Vec<String>,
}

impl SmtpSession {
    pub(crate) fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        deadline: Option<Instant>,
    ) -> Result<Self, ProbeError> {
        let addresses: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|err| ProbeError::Resolve {
                host: host.to_string(),
                source: err,
            })?
            .collect();

        // One budget for the whole dial, shared by every resolved address.
        let connect_by = connect_deadline(Instant::now(), timeout, deadline);
        let mut last_err = None;
        for addr in &addresses {
            let remaining = connect_by.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                last_err = Some(ProbeError::Timeout);
                break;
            }
            match SmtpStream::connect(addr, remaining, timeout, deadline) {
                Ok(stream) => {
                    debug!(host, %addr, "connected");
                    return Ok(Self {
                        host: host.to_string(),
                        stream,
                        transcript: Vec::new(),
                    });
                }
                Err(err) => {
                    debug!(host, %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ProbeError::NoAddresses {
            host: host.to_string(),
        }))
    }

    pub(crate) fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    fn record(&mut self, direction: &str, message: &str) {
        debug!(host = %self.host, "{direction}: {message}");
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        if reply.lines.is_empty() {
            self.record("S", &format!("{}", reply.code));
        } else {
            for line in &reply.lines {
                self.record("S", &format!("{} {}", reply.code, line));
            }
        }
    }

    pub(crate) fn read_reply(&mut self) -> Result<SmtpReply, ProbeError> {
        let reply = self.stream.read_reply()?;
        self.record_reply(&reply);
        Ok(reply)
    }

    /// Sends one command line and waits for its reply. Lines carrying CR or
    /// LF are refused before anything reaches the wire.
    pub(crate) fn command(&mut self, command: &str) -> Result<SmtpReply, ProbeError> {
        if command.contains(['\r', '\n']) {
            return Err(ProbeError::protocol("command contains CR or LF"));
        }
        self.record("C", command);
        self.stream.send_line(command)?;
        self.read_reply()
    }

    /// Issues `STARTTLS` and, when the server agrees, performs the
    /// handshake. A refusal is returned as the server's reply.
    pub(crate) fn starttls(
        &mut self,
        domain: &str,
        connector: &TlsConnector,
    ) -> Result<SmtpReply, ProbeError> {
        let reply = self.command("STARTTLS")?;
        if !reply.is_positive_completion() {
            return Ok(reply);
        }
        self.stream.upgrade_tls(domain, connector)?;
        self.record("*", "TLS established");
        Ok(reply)
    }

    /// Ends the session and hands back the transcript. With `graceful` a
    /// best-effort `QUIT` precedes the socket shutdown.
    pub(crate) fn close(mut self, graceful: bool) -> Vec<String> {
        if graceful {
            if let Err(err) = self.command("QUIT") {
                debug!(host = %self.host, error = %err, "QUIT failed");
            }
        }
        self.stream.shutdown();
        std::mem::take(&mut self.transcript)
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        self.stream.shutdown();
    }
}
