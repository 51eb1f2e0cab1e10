//! Scripted loopback SMTP server for tests.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use native_tls::{Identity, TlsAcceptor, TlsStream};

const CERT: &[u8] = include_bytes!("testdata/localhost.crt");
const KEY: &[u8] = include_bytes!("testdata/localhost.key");

pub(crate) const GREETING: &str = "220 mock.smtp.test ESMTP\r\n";
pub(crate) const EHLO_PLAIN: &str = "250-mock.smtp.test\r\n250 8BITMIME\r\n";
pub(crate) const EHLO_STARTTLS: &str =
    "250-mock.smtp.test\r\n250-SIZE 10240000\r\n250-STARTTLS\r\n250 8BITMIME\r\n";

#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// Expect a command starting with the prefix, answer with the reply.
    Reply(&'static str, &'static str),
    /// Expect `STARTTLS`, answer 220 and run the server side of TLS.
    StartTls,
    /// Expect `STARTTLS`, answer 220, then send plaintext instead of TLS.
    BrokenTls,
    /// Expect `STARTTLS`, answer 220 with extra bytes in the same write.
    StartTlsInjected(&'static str),
    /// Expect a command starting with the prefix and never answer it;
    /// later commands are still logged.
    Stall(&'static str),
}

/// What one client connection looked like from the server side.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    pub commands: Vec<String>,
    pub closed_by_client: bool,
}

pub(crate) struct MockServer {
    pub port: u16,
    handle: thread::JoinHandle<Vec<SessionLog>>,
}

impl MockServer {
    pub(crate) fn start(greeting: Option<&'static str>, script: Vec<Step>) -> Self {
        Self::start_sessions(greeting, script, 1)
    }

    /// Serves `sessions` consecutive connections, each with the same script.
    pub(crate) fn start_sessions(
        greeting: Option<&'static str>,
        script: Vec<Step>,
        sessions: usize,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            let mut logs = Vec::new();
            for _ in 0..sessions {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                logs.push(serve(stream, greeting, &script));
            }
            logs
        });
        ready_rx.recv().expect("server ready");
        Self { port, handle }
    }

    pub(crate) fn finish(self) -> Vec<SessionLog> {
        self.handle.join().expect("mock server thread")
    }
}

enum Conn {
    Plain(BufReader<TcpStream>),
    Tls(BufReader<TlsStream<TcpStream>>),
}

impl Conn {
    fn read_command(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        let read = match self {
            Self::Plain(reader) => reader.read_until(b'\n', &mut raw)?,
            Self::Tls(reader) => reader.read_until(b'\n', &mut raw)?,
        };
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&raw).trim_end().to_string()))
    }

    fn send(&mut self, data: &str) -> io::Result<()> {
        match self {
            Self::Plain(reader) => {
                reader.get_mut().write_all(data.as_bytes())?;
                reader.get_mut().flush()
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data.as_bytes())?;
                reader.get_mut().flush()
            }
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(reader) => io::copy(reader, &mut io::sink()).map(|_| ()),
            Self::Tls(reader) => io::copy(reader, &mut io::sink()).map(|_| ()),
        }
    }

    fn upgrade(self) -> io::Result<Conn> {
        match self {
            Self::Plain(reader) => {
                let identity = Identity::from_pkcs8(CERT, KEY)
                    .map_err(|err| io::Error::other(err.to_string()))?;
                let acceptor =
                    TlsAcceptor::new(identity).map_err(|err| io::Error::other(err.to_string()))?;
                let tls = acceptor
                    .accept(reader.into_inner())
                    .map_err(|err| io::Error::other(err.to_string()))?;
                Ok(Self::Tls(BufReader::new(tls)))
            }
            tls => Ok(tls),
        }
    }
}

fn serve(stream: TcpStream, greeting: Option<&str>, script: &[Step]) -> SessionLog {
    let mut log = SessionLog::default();
    if let Err(err) = run_script(stream, greeting, script, &mut log) {
        // A reset or abrupt EOF still means the client let go of the socket.
        log.closed_by_client = !matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        );
    }
    log
}

fn run_script(
    stream: TcpStream,
    greeting: Option<&str>,
    script: &[Step],
    log: &mut SessionLog,
) -> io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut conn = Conn::Plain(BufReader::new(stream));
    let Some(greeting) = greeting else {
        conn.drain()?;
        log.closed_by_client = true;
        return Ok(());
    };
    conn.send(greeting)?;

    for step in script {
        let Some(line) = conn.read_command()? else {
            log.closed_by_client = true;
            return Ok(());
        };
        log.commands.push(line.clone());
        match *step {
            Step::Reply(expected, response) => {
                assert!(
                    line.starts_with(expected),
                    "expected command starting with '{expected}', got '{line}'"
                );
                conn.send(response)?;
            }
            Step::StartTls => {
                assert!(line.starts_with("STARTTLS"), "expected STARTTLS, got '{line}'");
                conn.send("220 2.0.0 Ready to start TLS\r\n")?;
                conn = conn.upgrade()?;
            }
            Step::BrokenTls => {
                assert!(line.starts_with("STARTTLS"), "expected STARTTLS, got '{line}'");
                conn.send("220 2.0.0 Ready to start TLS\r\n")?;
                conn.send("this is not a TLS record\r\n")?;
                conn.drain()?;
                log.closed_by_client = true;
                return Ok(());
            }
            Step::StartTlsInjected(extra) => {
                assert!(line.starts_with("STARTTLS"), "expected STARTTLS, got '{line}'");
                conn.send(&format!("220 2.0.0 Ready to start TLS\r\n{extra}"))?;
                conn.drain()?;
                log.closed_by_client = true;
                return Ok(());
            }
            Step::Stall(expected) => {
                assert!(
                    line.starts_with(expected),
                    "expected command starting with '{expected}', got '{line}'"
                );
                while let Some(line) = conn.read_command()? {
                    log.commands.push(line);
                }
                log.closed_by_client = true;
                return Ok(());
            }
        }
    }

    loop {
        let Some(line) = conn.read_command()? else {
            log.closed_by_client = true;
            return Ok(());
        };
        log.commands.push(line.clone());
        let response = if line.starts_with("QUIT") {
            "221 2.0.0 Bye\r\n"
        } else {
            "502 5.5.1 Unexpected command\r\n"
        };
        conn.send(response)?;
    }
}

/// Leaks `text` so it can be used as a scripted reply.
pub(crate) fn leak(text: String) -> &'static str {
    Box::leak(text.into_boxed_str())
}

/// A port on loopback with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}
