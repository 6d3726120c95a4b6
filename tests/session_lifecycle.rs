//! Integration tests for the session lifecycle.
//!
//! Drives a real `Session` against the mock server: registration with SASL,
//! keepalive, reconnects, fatal authentication failures and QUIT.

mod common;

use cabal_proto::Command;
use cabalbot::error::SessionError;
use cabalbot::session::{AuthError, KeepaliveMonitor, Session, SessionState};
use common::fixtures::Recorded;
use common::server::SERVER_NAME;
use common::{MockServer, RecordingHandler, ServerConn, session_config};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_registers_with_sasl_and_joins() {
    let server = MockServer::bind().await.expect("bind mock server");
    let (handler, mut events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let task = session.spawn();

    let mut conn = server.accept().await.expect("bot did not connect");
    let lines = conn.register("CabalBot").await.expect("registration failed");
    assert_eq!(&lines[..2], ["JOIN #cabal", "JOIN #cvn-wp"]);

    assert!(timeout(WAIT, handle.wait_for(SessionState::Connected)).await.unwrap());
    match timeout(WAIT, events.recv()).await.unwrap() {
        Some(Recorded::Connected { nickname }) => assert_eq!(nickname, "CabalBot"),
        other => panic!("expected connect notification, got {:?}", other),
    }

    handle.disconnect("done");
    conn.expect("QUIT").await.unwrap();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_server_ping_gets_pong_and_messages_reach_handler() {
    let server = MockServer::bind().await.unwrap();
    let (handler, mut events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();

    conn.send_raw(&format!("PING :{SERVER_NAME}")).await.unwrap();
    let pong = conn.recv().await.expect("Failed to receive PONG");
    match &pong.command {
        Command::PONG(token, None) => assert_eq!(token, SERVER_NAME),
        other => panic!("Expected PONG, got: {:?}", other),
    }

    conn.send_raw(":Alice!alice@user/alice PRIVMSG #cabal :hello there")
        .await
        .unwrap();
    let message = loop {
        match timeout(WAIT, events.recv()).await.unwrap() {
            Some(Recorded::Message(message))
                if matches!(message.command, Command::PRIVMSG(..)) =>
            {
                break message;
            }
            Some(_) => continue,
            None => panic!("handler channel closed"),
        }
    };
    assert_eq!(message.source_nickname(), Some("Alice"));
    assert_eq!(
        message.command,
        Command::PRIVMSG("#cabal".to_string(), "hello there".to_string())
    );

    handle.disconnect("done");
}

#[tokio::test]
async fn test_non_utf8_line_keeps_connection_open() {
    let server = MockServer::bind().await.unwrap();
    let (handler, mut events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();

    conn.send_bytes(b":Bob!b@h PRIVMSG #cabal :caf\xe9").await.unwrap();
    conn.send_raw("PING :still-there").await.unwrap();
    assert_eq!(conn.recv_line().await.unwrap(), "PONG :still-there");

    let message = loop {
        match timeout(WAIT, events.recv()).await.unwrap() {
            Some(Recorded::Message(message))
                if matches!(message.command, Command::PRIVMSG(..)) =>
            {
                break message;
            }
            Some(_) => continue,
            None => panic!("handler channel closed"),
        }
    };
    assert_eq!(
        message.command,
        Command::PRIVMSG("#cabal".to_string(), "caf\u{FFFD}".to_string())
    );

    assert!(server.accept_timeout(Duration::from_millis(300)).await.is_err());
    assert_eq!(handle.state(), SessionState::Connected);
    handle.disconnect("done");
}

/// Round-trip a PING so everything sent before it has been handled.
async fn sync(conn: &mut ServerConn, token: &str) {
    conn.send_raw(&format!("PING :{token}")).await.unwrap();
    assert_eq!(conn.recv_line().await.unwrap(), format!("PONG :{token}"));
}

#[tokio::test]
async fn test_kick_from_home_channel_rejoins() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let channels = handler.channels();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();

    conn.send_raw(":Op!op@staff/op KICK #cabal CabalBot :out")
        .await
        .unwrap();
    assert_eq!(conn.recv_line().await.unwrap(), "JOIN #cabal");

    conn.send_raw(":Op!op@staff/op KICK #cvn-wp CabalBot :out")
        .await
        .unwrap();
    sync(&mut conn, "after-kick").await;
    assert_eq!(*channels.borrow(), ["#cabal"]);

    handle.disconnect("done");
}

#[tokio::test]
async fn test_home_channel_survives_part_and_join_failure() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let channels = handler.channels();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();
    sync(&mut conn, "joined").await;
    assert_eq!(*channels.borrow(), ["#cabal", "#cvn-wp"]);

    conn.send_raw(":CabalBot!CabalBot@cabal/bot PART #cabal :brb")
        .await
        .unwrap();
    conn.send_raw(&format!(
        ":{SERVER_NAME} 474 CabalBot #cabal :Cannot join channel (+b) - you are banned"
    ))
    .await
    .unwrap();
    sync(&mut conn, "home").await;
    assert_eq!(*channels.borrow(), ["#cabal", "#cvn-wp"]);

    conn.send_raw(":CabalBot!CabalBot@cabal/bot PART #cvn-wp :bye")
        .await
        .unwrap();
    sync(&mut conn, "parted").await;
    assert_eq!(*channels.borrow(), ["#cabal"]);

    conn.send_raw(":CabalBot!CabalBot@cabal/bot JOIN #wikimedia-ops")
        .await
        .unwrap();
    conn.send_raw(&format!(
        ":{SERVER_NAME} 474 CabalBot #wikimedia-ops :Cannot join channel (+b) - you are banned"
    ))
    .await
    .unwrap();
    sync(&mut conn, "banned").await;
    assert_eq!(*channels.borrow(), ["#cabal"]);

    handle.disconnect("done");
}

#[tokio::test]
async fn test_messages_queued_before_connect_are_sent_after_joins() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);

    handle.outbox().privmsg("#cabal", "queued early").unwrap();
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    let lines = conn.register("CabalBot").await.unwrap();
    let joins = lines.iter().position(|l| l == "JOIN #cvn-wp").unwrap();
    let queued = lines
        .iter()
        .position(|l| l == "PRIVMSG #cabal :queued early")
        .expect("queued message was not flushed");
    assert!(queued > joins);

    handle.disconnect("done");
}

#[tokio::test]
async fn test_unanswered_keepalive_triggers_reconnect() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let mut config = session_config(server.port(), true);
    config.keepalive = KeepaliveMonitor::new(Duration::from_millis(500), 2);
    let (session, handle) = Session::new(config, handler);
    let task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    let mut lines = conn.register("CabalBot").await.unwrap();
    // Never answer; after two missed probes the bot drops the link.
    lines.extend(conn.drain_until_closed().await);
    let probes: Vec<_> = lines.iter().filter(|l| l.starts_with("PING :cabal-")).collect();
    assert_eq!(probes.len(), 2, "unexpected traffic: {:?}", lines);

    let mut second = server.accept().await.expect("bot did not reconnect");
    second.register("CabalBot").await.unwrap();
    assert!(timeout(WAIT, handle.wait_for(SessionState::Connected)).await.unwrap());

    // A PONG keeps the new link alive across several intervals.
    for _ in 0..3 {
        let ping = second.expect("PING").await.unwrap();
        let token = ping.trim_start_matches("PING :");
        second
            .send_raw(&format!(":{SERVER_NAME} PONG {SERVER_NAME} :{token}"))
            .await
            .unwrap();
    }
    assert_eq!(handle.state(), SessionState::Connected);

    handle.disconnect("done");
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_reconnect_budget_is_bounded() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, _handle) = Session::new(session_config(server.port(), true), handler);
    let task = session.spawn();

    // One initial connection plus two retries, each dropped before
    // registration completes.
    for _ in 0..3 {
        let conn = server.accept().await.expect("expected a connection attempt");
        drop(conn);
    }

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    match result {
        Err(SessionError::RetriesExhausted { attempts }) => assert_eq!(attempts, 2),
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert!(
        server
            .accept_timeout(Duration::from_millis(300))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_sasl_failure_is_fatal() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.expect("USER ").await.unwrap();
    conn.send_raw(&format!(":{SERVER_NAME} CAP * LS :sasl"))
        .await
        .unwrap();
    conn.expect("CAP REQ").await.unwrap();
    conn.send_raw(&format!(":{SERVER_NAME} CAP * ACK :sasl"))
        .await
        .unwrap();
    conn.expect("AUTHENTICATE PLAIN").await.unwrap();
    conn.send_raw("AUTHENTICATE +").await.unwrap();
    conn.expect("AUTHENTICATE ").await.unwrap();
    conn.send_raw(&format!(
        ":{SERVER_NAME} 904 CabalBot :SASL authentication failed"
    ))
    .await
    .unwrap();

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    match result {
        Err(SessionError::Authentication(AuthError::SaslFailed { code, .. })) => {
            assert_eq!(code, 904)
        }
        other => panic!("expected SASL failure, got {:?}", other),
    }
    assert_eq!(handle.state(), SessionState::Disconnected);
    assert!(
        server
            .accept_timeout(Duration::from_millis(300))
            .await
            .is_err(),
        "authentication failures must not reconnect"
    );
}

#[tokio::test]
async fn test_server_without_sasl_is_fatal_when_credentials_are_set() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, _handle) = Session::new(session_config(server.port(), true), handler);
    let task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.expect("USER ").await.unwrap();
    conn.send_raw(&format!(":{SERVER_NAME} CAP * LS :multi-prefix"))
        .await
        .unwrap();

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(SessionError::Authentication(AuthError::SaslUnavailable))
    ));
}

#[tokio::test]
async fn test_registers_without_credentials() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), false), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    let lines = conn.register_plain("CabalBot").await.unwrap();
    assert!(lines.iter().any(|l| l == "JOIN #cabal"));
    assert!(timeout(WAIT, handle.wait_for(SessionState::Connected)).await.unwrap());

    handle.disconnect("done");
}

#[tokio::test]
async fn test_nickname_in_use_falls_back_then_ghosts() {
    let server = MockServer::bind().await.unwrap();
    let (handler, mut events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.expect("USER ").await.unwrap();
    conn.send_raw(&format!(
        ":{SERVER_NAME} 433 * CabalBot :Nickname is already in use"
    ))
    .await
    .unwrap();
    conn.expect("NICK CabalBot_").await.unwrap();

    conn.send_raw(&format!(":{SERVER_NAME} CAP * LS :sasl"))
        .await
        .unwrap();
    conn.expect("CAP REQ").await.unwrap();
    conn.send_raw(&format!(":{SERVER_NAME} CAP * ACK :sasl"))
        .await
        .unwrap();
    conn.expect("AUTHENTICATE PLAIN").await.unwrap();
    conn.send_raw("AUTHENTICATE +").await.unwrap();
    conn.expect("AUTHENTICATE ").await.unwrap();
    conn.send_raw(&format!(":{SERVER_NAME} 903 CabalBot_ :SASL authentication successful"))
        .await
        .unwrap();
    conn.expect("CAP END").await.unwrap();

    let lines = conn.welcome("CabalBot_").await.unwrap();
    assert_eq!(
        &lines[..2],
        ["PRIVMSG NickServ :GHOST CabalBot", "NICK CabalBot"]
    );
    assert!(lines.iter().any(|l| l == "JOIN #cabal"));

    match timeout(WAIT, events.recv()).await.unwrap() {
        Some(Recorded::Connected { nickname }) => assert_eq!(nickname, "CabalBot_"),
        other => panic!("expected connect notification, got {:?}", other),
    }

    handle.disconnect("done");
}

#[tokio::test]
async fn test_disconnect_sends_quit_reason() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();

    assert!(handle.disconnect("Killed by a KeyboardInterrupt"));
    let quit = conn.expect("QUIT").await.unwrap();
    assert_eq!(quit, "QUIT :Killed by a KeyboardInterrupt");
    assert!(conn.drain_until_closed().await.is_empty());

    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(handle.state(), SessionState::Disconnected);
    assert!(!handle.disconnect("again"));
}

#[tokio::test]
async fn test_server_error_reconnects() {
    let server = MockServer::bind().await.unwrap();
    let (handler, _events) = RecordingHandler::new();
    let (session, handle) = Session::new(session_config(server.port(), true), handler);
    let _task = session.spawn();

    let mut conn = server.accept().await.unwrap();
    conn.register("CabalBot").await.unwrap();
    conn.send_raw("ERROR :Closing Link: 127.0.0.1 (Ping timeout)")
        .await
        .unwrap();

    let mut again = server.accept().await.expect("bot did not reconnect");
    again.register("CabalBot").await.unwrap();
    assert!(timeout(WAIT, handle.wait_for(SessionState::Connected)).await.unwrap());

    handle.disconnect("done");
}
