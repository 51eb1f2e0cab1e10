use std::time::{Duration, Instant};

use super::mock::{EHLO_PLAIN, EHLO_STARTTLS, GREETING, MockServer, Step, closed_port, leak};
use super::{ProbeOptions, probe_recipient};
use crate::Verdict;

fn options_for(port: u16) -> ProbeOptions {
    ProbeOptions {
        port,
        timeout: Duration::from_secs(5),
        ..ProbeOptions::default()
    }
}

#[test]
fn accepts_recipient_over_starttls() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO localhost", EHLO_STARTTLS),
            Step::StartTls,
            Step::Reply("EHLO localhost", EHLO_PLAIN),
            Step::Reply("MAIL FROM:<verify@example.com>", "250 2.1.0 Ok\r\n"),
            Step::Reply("RCPT TO:<user@testdomain.test>", "250 2.1.5 Ok\r\n"),
        ],
    );

    let report = probe_recipient("user@testdomain.test", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::RecipientAccepted, "{report:?}");
    assert!(report.encrypted);
    assert_eq!(report.reply.as_ref().map(|r| r.code), Some(250));
    assert!(report.detail.is_none());

    let logs = server.finish();
    assert_eq!(logs.len(), 1);
    let session = &logs[0];
    assert!(session.closed_by_client);
    assert_eq!(session.commands.last().map(String::as_str), Some("QUIT"));
    assert!(!session.commands.iter().any(|c| c.starts_with("DATA")));
}

#[test]
fn rejected_recipient_in_plaintext() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_PLAIN),
            Step::Reply("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            Step::Reply("RCPT TO:", "550 5.1.1 User unknown\r\n"),
        ],
    );

    let report = probe_recipient("ghost@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::RecipientRejected);
    assert!(!report.encrypted);
    assert_eq!(report.reply.as_ref().map(|r| r.code), Some(550));
    let detail = report.detail.expect("detail");
    assert!(detail.contains("User unknown"), "{detail}");

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
    assert!(!logs[0].commands.iter().any(|c| c.starts_with("STARTTLS")));
}

#[test]
fn rejected_sender_stops_before_rcpt() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_PLAIN),
            Step::Reply("MAIL FROM:", "553 5.7.1 Sender address rejected\r\n"),
        ],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::SenderRejected);

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
    assert!(!logs[0].commands.iter().any(|c| c.starts_with("RCPT")));
}

#[test]
fn refused_starttls_is_a_negotiation_failure() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_STARTTLS),
            Step::Reply("STARTTLS", "454 4.7.0 TLS not available\r\n"),
        ],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ProtocolNegotiationFailed);
    assert_eq!(report.reply.as_ref().map(|r| r.code), Some(454));

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
    assert!(!logs[0].commands.iter().any(|c| c.starts_with("MAIL")));
}

#[test]
fn failed_tls_handshake_is_a_negotiation_failure() {
    let server = MockServer::start(
        Some(GREETING),
        vec![Step::Reply("EHLO", EHLO_STARTTLS), Step::BrokenTls],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ProtocolNegotiationFailed, "{report:?}");
    assert!(!report.encrypted);

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
}

#[test]
fn bad_greeting_is_a_connection_failure() {
    let server = MockServer::start(Some("554 5.3.2 No service\r\n"), Vec::new());

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert_eq!(report.reply.as_ref().map(|r| r.code), Some(554));

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
    assert!(logs[0].commands.is_empty());
}

#[test]
fn ehlo_refusal_falls_back_to_helo() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", "502 5.5.2 Command not recognized\r\n"),
            Step::Reply("HELO localhost", "250 mock.smtp.test\r\n"),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
        ],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::RecipientAccepted);
    assert!(!report.encrypted);
    server.finish();
}

#[test]
fn refused_connection_is_reported_quickly() {
    let port = closed_port();
    let started = Instant::now();
    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(port));
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert!(report.detail.is_some());
    assert!(report.transcript.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn silent_server_times_out_and_is_released() {
    let server = MockServer::start(None, Vec::new());
    let options = ProbeOptions {
        timeout: Duration::from_millis(300),
        ..options_for(server.port)
    };

    let started = Instant::now();
    let report = probe_recipient("user@example.com", "127.0.0.1", &options);
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert!(started.elapsed() < Duration::from_secs(5));

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
}

#[test]
fn session_deadline_caps_the_whole_dialogue() {
    let server = MockServer::start(Some(GREETING), vec![Step::Stall("EHLO")]);
    let options = ProbeOptions {
        timeout: Duration::from_secs(5),
        session_timeout: Some(Duration::from_millis(400)),
        ..options_for(server.port)
    };

    let started = Instant::now();
    let report = probe_recipient("user@example.com", "127.0.0.1", &options);
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert!(started.elapsed() < Duration::from_secs(3));

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
}

#[test]
fn recipient_with_line_break_is_never_sent() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_PLAIN),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
        ],
    );

    let report = probe_recipient(
        "user@example.com>\r\nDATA",
        "127.0.0.1",
        &options_for(server.port),
    );
    assert_eq!(report.verdict, Verdict::RecipientRejected);

    let logs = server.finish();
    assert!(!logs[0].commands.iter().any(|c| c.starts_with("RCPT") || c == "DATA"));
}

#[test]
fn transcript_records_both_directions() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_PLAIN),
            Step::Reply("MAIL FROM:", "250 Ok\r\n"),
            Step::Reply("RCPT TO:", "250 Ok\r\n"),
        ],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    server.finish();
    assert_eq!(
        report.transcript.first().map(String::as_str),
        Some("[127.0.0.1] S: 220 mock.smtp.test ESMTP")
    );
    assert!(
        report
            .transcript
            .iter()
            .any(|line| line == "[127.0.0.1] C: RCPT TO:<user@example.com>")
    );
    assert!(
        report
            .transcript
            .iter()
            .any(|line| line == "[127.0.0.1] S: 221 2.0.0 Bye")
    );
}

#[test]
fn oversized_reply_line_is_refused() {
    let greeting = leak(format!("220 {}\r\n", "x".repeat(8 * 1024)));
    let server = MockServer::start(Some(greeting), Vec::new());

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert!(report.detail.expect("detail").contains("too long"));
    server.finish();
}

#[test]
fn endless_multiline_reply_is_refused() {
    let mut ehlo = "250-mock.smtp.test\r\n".repeat(129);
    ehlo.push_str("250 8BITMIME\r\n");
    let server = MockServer::start(Some(GREETING), vec![Step::Reply("EHLO", leak(ehlo))]);

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ConnectionFailed);
    assert!(report.detail.expect("detail").contains("too many lines"));

    let logs = server.finish();
    assert!(!logs[0].commands.iter().any(|c| c.starts_with("MAIL")));
}

#[test]
fn bytes_before_tls_handshake_are_refused() {
    let server = MockServer::start(
        Some(GREETING),
        vec![
            Step::Reply("EHLO", EHLO_STARTTLS),
            Step::StartTlsInjected("250 2.1.5 injected\r\n"),
        ],
    );

    let report = probe_recipient("user@example.com", "127.0.0.1", &options_for(server.port));
    assert_eq!(report.verdict, Verdict::ProtocolNegotiationFailed);
    assert!(!report.encrypted);
    let detail = report.detail.expect("detail");
    assert!(detail.contains("before the TLS handshake"), "{detail}");
    server.finish();
}

#[test]
fn no_quit_after_a_timed_out_envelope_command() {
    let server = MockServer::start(
        Some(GREETING),
        vec![Step::Reply("EHLO", EHLO_PLAIN), Step::Stall("MAIL FROM:")],
    );
    let options = ProbeOptions {
        timeout: Duration::from_millis(300),
        ..options_for(server.port)
    };

    let report = probe_recipient("user@example.com", "127.0.0.1", &options);
    assert_eq!(report.verdict, Verdict::SenderRejected);
    assert!(report.reply.is_none());

    let logs = server.finish();
    assert!(logs[0].closed_by_client);
    assert!(!logs[0].commands.iter().any(|c| c == "QUIT"), "{:?}", logs[0].commands);
}
