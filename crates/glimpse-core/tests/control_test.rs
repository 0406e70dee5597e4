//! Integration test: control protocol
//!
//! Drives the byte-at-a-time parser with whole and fragmented commands,
//! then runs a real client against the non-blocking socket server.
//!
//! Run with: cargo test --test control_test -- --nocapture

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use glimpse_core::control::{encode, ControlCommand, ControlParser, ControlServer};

#[test]
fn test_parse_whole_command() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(b":capture=1;", &mut out);
    match out.as_slice() {
        [ControlCommand::Capture { enabled: true }] => {}
        other => panic!("expected [Capture enabled], got {:?}", other),
    }
}

#[test]
fn test_parse_across_fragments() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    // Non-blocking reads can split a command anywhere.
    for chunk in [b":cap".as_slice(), b"ture".as_slice(), b"=0".as_slice(), b";".as_slice()] {
        parser.feed_slice(chunk, &mut out);
    }
    match out.as_slice() {
        [ControlCommand::Capture { enabled: false }] => {}
        other => panic!("expected [Capture disabled], got {:?}", other),
    }
}

#[test]
fn test_unknown_and_malformed_are_dropped() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(b"garbage before :unknown=7; :capture; more ;;;", &mut out);
    match out.as_slice() {
        // A capture with no parameter reads as disable.
        [ControlCommand::Capture { enabled: false }] => {}
        other => panic!("expected only the bare capture, got {:?}", other),
    }
}

#[test]
fn test_restart_mid_command() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    // A new colon abandons the half-received command.
    parser.feed_slice(b":capt:capture=1;", &mut out);
    match out.as_slice() {
        [ControlCommand::Capture { enabled: true }] => {}
        other => panic!("expected [Capture enabled], got {:?}", other),
    }
}

#[test]
fn test_toggle_hud_takes_no_parameter() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(b":toggle_hud;:toggle_hud=ignored;", &mut out);
    match out.as_slice() {
        [ControlCommand::ToggleHud, ControlCommand::ToggleHud] => {}
        other => panic!("expected two ToggleHud, got {:?}", other),
    }
}

#[test]
fn test_reload_config_command_parses() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(b":reload_config;", &mut out);
    match out.as_slice() {
        [ControlCommand::ReloadConfig] => {}
        other => panic!("expected [ReloadConfig], got {:?}", other),
    }
}

#[test]
fn test_non_numeric_parameter_reads_as_disable() {
    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(b":capture=yes;", &mut out);
    match out.as_slice() {
        [ControlCommand::Capture { enabled: false }] => {}
        other => panic!("expected [Capture disabled], got {:?}", other),
    }
}

#[test]
fn test_encode_roundtrip() {
    if encode("capture", "1") != ":capture=1;" {
        panic!("expected :capture=1;, got {:?}", encode("capture", "1"));
    }
    if encode("capture", "") != ":capture;" {
        panic!("expected :capture;, got {:?}", encode("capture", ""));
    }

    let mut parser = ControlParser::new();
    let mut out = Vec::new();
    parser.feed_slice(encode("capture", "1").as_bytes(), &mut out);
    match out.as_slice() {
        [ControlCommand::Capture { enabled: true }] => {}
        other => panic!("expected the encoded command back, got {:?}", other),
    }
}

fn socket_path(tag: &str) -> String {
    let dir = std::env::temp_dir();
    format!("{}/glimpse-control-{}-{}.sock", dir.display(), std::process::id(), tag)
}

/// Poll the server until it yields commands or the deadline passes.
fn poll_until(server: &mut ControlServer, deadline: Duration) -> Vec<ControlCommand> {
    let start = Instant::now();
    loop {
        let got = server.poll();
        if !got.is_empty() || start.elapsed() > deadline {
            return got;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_server_greets_and_receives() {
    let path = socket_path("greet");
    let mut server = match ControlServer::bind(&path) {
        Ok(s) => s,
        Err(e) => panic!("expected bind to succeed, got {:?}", e),
    };
    server.set_greeting(vec![("GlimpseControlVersion".to_string(), "1".to_string())]);

    let mut client = match UnixStream::connect(&path) {
        Ok(c) => c,
        Err(e) => panic!("expected connect to succeed, got {:?}", e),
    };
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    // The accept happens inside poll.
    server.poll();

    let mut greeting = [0u8; 64];
    let n = client.read(&mut greeting).unwrap();
    let greeting = std::str::from_utf8(&greeting[..n]).unwrap();
    if greeting != ":GlimpseControlVersion=1;" {
        panic!("expected the greeting line, got {:?}", greeting);
    }

    client.write_all(b":capture=1;").unwrap();
    let got = poll_until(&mut server, Duration::from_secs(2));
    match got.as_slice() {
        [ControlCommand::Capture { enabled: true }] => {}
        other => panic!("expected [Capture enabled], got {:?}", other),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_server_survives_disconnect() {
    let path = socket_path("reconnect");
    let mut server = match ControlServer::bind(&path) {
        Ok(s) => s,
        Err(e) => panic!("expected bind to succeed, got {:?}", e),
    };

    {
        let client = UnixStream::connect(&path).unwrap();
        server.poll();
        drop(client);
    }
    // Drain the disconnect.
    poll_until(&mut server, Duration::from_millis(200));

    // A second client must be accepted after the first went away.
    let mut client = UnixStream::connect(&path).unwrap();
    client.write_all(b":capture=0;").unwrap();
    let got = poll_until(&mut server, Duration::from_secs(2));
    match got.as_slice() {
        [ControlCommand::Capture { enabled: false }] => {}
        other => panic!("expected [Capture disabled], got {:?}", other),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_bind_replaces_stale_socket() {
    let path = socket_path("stale");
    {
        let _first = ControlServer::bind(&path).unwrap();
    }
    // The file is still on disk; a rebind must clean it up.
    match ControlServer::bind(&path) {
        Ok(_) => {}
        Err(e) => panic!("expected rebind over a stale socket, got {:?}", e),
    }
    let _ = std::fs::remove_file(&path);
}
