//! Line-oriented control protocol.
//!
//! A command starts with a colon, followed by the command name, an optional
//! `=` and parameter, and ends with a semicolon:
//!
//! ```text
//! :cmd=param;
//! ```
//!
//! Bytes arrive in arbitrary chunks from a non-blocking socket, so the
//! parser is an explicit state value fed one byte at a time. Unknown or
//! malformed commands are ignored.

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use tracing::{debug, warn};

/// Longest accepted command or parameter; overflow invalidates the command.
const TOKEN_MAX: usize = 4096;

/// Commands the overlay understands. Anything else parses and is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Enable or disable dumping of frame stats (`:capture=1;`).
    Capture { enabled: bool },
    /// Flip HUD visibility (`:toggle_hud;`).
    ToggleHud,
    /// Re-read the configuration file (`:reload_config;`).
    ReloadConfig,
}

fn recognize(cmd: &str, param: &str) -> Option<ControlCommand> {
    match cmd {
        "capture" => {
            let value: i64 = param.parse().unwrap_or(0);
            Some(ControlCommand::Capture { enabled: value > 0 })
        }
        "toggle_hud" => Some(ControlCommand::ToggleHud),
        "reload_config" => Some(ControlCommand::ReloadConfig),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    /// Not inside a command; everything is discarded until a colon.
    #[default]
    Idle,
    Cmd,
    Param,
}

/// Incremental parser. One per control connection; no hidden state.
#[derive(Debug, Default)]
pub struct ControlParser {
    mode: Mode,
    cmd: String,
    param: String,
}

impl ControlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; yields a command when a well-formed `;` terminator
    /// completes one that we recognize.
    pub fn feed(&mut self, byte: u8) -> Option<ControlCommand> {
        match byte {
            b':' => {
                self.cmd.clear();
                self.param.clear();
                self.mode = Mode::Cmd;
                None
            }
            b';' => {
                if self.mode == Mode::Idle {
                    return None;
                }
                self.mode = Mode::Idle;
                recognize(&self.cmd, &self.param)
            }
            b'=' => {
                if self.mode == Mode::Cmd {
                    self.mode = Mode::Param;
                }
                None
            }
            c => {
                match self.mode {
                    Mode::Idle => {}
                    Mode::Cmd => {
                        if self.cmd.len() >= TOKEN_MAX {
                            // Overflow means an invalid command.
                            self.mode = Mode::Idle;
                        } else {
                            self.cmd.push(c as char);
                        }
                    }
                    Mode::Param => {
                        if self.param.len() >= TOKEN_MAX {
                            self.mode = Mode::Idle;
                        } else {
                            self.param.push(c as char);
                        }
                    }
                }
                None
            }
        }
    }

    /// Feed a received chunk, collecting every completed command.
    pub fn feed_slice(&mut self, bytes: &[u8], out: &mut Vec<ControlCommand>) {
        for &b in bytes {
            if let Some(cmd) = self.feed(b) {
                out.push(cmd);
            }
        }
    }
}

/// Wire-encode an outbound command.
pub fn encode(cmd: &str, param: &str) -> String {
    if param.is_empty() {
        format!(":{cmd};")
    } else {
        format!(":{cmd}={param};")
    }
}

/// Non-blocking control socket. Polled once per present from the
/// presenting thread; never blocks, at most one client at a time.
pub struct ControlServer {
    listener: UnixListener,
    client: Option<UnixStream>,
    parser: ControlParser,
    greeting: Vec<(String, String)>,
}

impl ControlServer {
    /// Bind the listener at `path`, replacing a stale socket file.
    pub fn bind(path: &str) -> std::io::Result<Self> {
        if Path::new(path).exists() {
            let _ = std::fs::remove_file(path);
        }
        let listener = UnixListener::bind(path)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            client: None,
            parser: ControlParser::new(),
            greeting: Vec::new(),
        })
    }

    /// Key/value pairs sent to every client right after it connects
    /// (protocol version, device name, ...).
    pub fn set_greeting(&mut self, greeting: Vec<(String, String)>) {
        self.greeting = greeting;
    }

    /// Accept a pending client and drain whatever it sent. Returns the
    /// commands completed during this poll.
    pub fn poll(&mut self) -> Vec<ControlCommand> {
        let mut out = Vec::new();

        if self.client.is_none() {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if stream.set_nonblocking(true).is_ok() {
                        debug!("control client connected");
                        let mut stream = stream;
                        for (cmd, param) in &self.greeting {
                            let _ = stream.write_all(encode(cmd, param).as_bytes());
                        }
                        self.client = Some(stream);
                        self.parser = ControlParser::new();
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => warn!("control socket accept failed: {e}"),
            }
        }

        if let Some(stream) = self.client.as_mut() {
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        debug!("control client disconnected");
                        self.client = None;
                        break;
                    }
                    Ok(n) => {
                        self.parser.feed_slice(&buf[..n], &mut out);
                        if n < buf.len() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        if e.kind() != ErrorKind::ConnectionReset {
                            warn!("control connection error: {e}");
                        }
                        self.client = None;
                        break;
                    }
                }
            }
        }

        out
    }
}
