//! STOMP 1.2 wire codec
//!
//! Implements the subset of STOMP the chat broker speaks: client frames
//! CONNECT / SUBSCRIBE / UNSUBSCRIBE / SEND / DISCONNECT and server frames
//! CONNECTED / MESSAGE / ERROR / RECEIPT. One frame travels per WebSocket
//! text message, NUL-terminated; a bare EOL is a heartbeat.

use crate::error::FrameError;

/// STOMP commands used by the chat broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompCommand {
    // Client -> server
    Connect,
    Subscribe,
    Unsubscribe,
    Send,
    Disconnect,
    // Server -> client
    Connected,
    Message,
    Error,
    Receipt,
}

impl StompCommand {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            StompCommand::Connect => "CONNECT",
            StompCommand::Subscribe => "SUBSCRIBE",
            StompCommand::Unsubscribe => "UNSUBSCRIBE",
            StompCommand::Send => "SEND",
            StompCommand::Disconnect => "DISCONNECT",
            StompCommand::Connected => "CONNECTED",
            StompCommand::Message => "MESSAGE",
            StompCommand::Error => "ERROR",
            StompCommand::Receipt => "RECEIPT",
        }
    }

    fn parse(line: &str) -> Result<Self, FrameError> {
        match line {
            "CONNECT" => Ok(StompCommand::Connect),
            "SUBSCRIBE" => Ok(StompCommand::Subscribe),
            "UNSUBSCRIBE" => Ok(StompCommand::Unsubscribe),
            "SEND" => Ok(StompCommand::Send),
            "DISCONNECT" => Ok(StompCommand::Disconnect),
            "CONNECTED" => Ok(StompCommand::Connected),
            "MESSAGE" => Ok(StompCommand::Message),
            "ERROR" => Ok(StompCommand::Error),
            "RECEIPT" => Ok(StompCommand::Receipt),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }

    /// CONNECT and CONNECTED headers are exempt from STOMP header escaping
    fn escapes_headers(&self) -> bool {
        !matches!(self, StompCommand::Connect | StompCommand::Connected)
    }
}

/// A single STOMP frame
///
/// Headers keep insertion order; on lookup the first occurrence of a name
/// wins, as the STOMP spec requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    /// Create a frame with no headers and no body
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header (builder style)
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the frame body (builder style)
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for a header name, if present
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to the wire form (NUL-terminated)
    ///
    /// A `content-length` header is appended automatically for non-empty
    /// bodies unless the caller already set one.
    pub fn serialize(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get_header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame from a WebSocket text message
    ///
    /// Honors `content-length` when present, otherwise reads the body up to
    /// the NUL terminator. Heartbeats are not frames; check
    /// [`is_heartbeat`] before calling.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let (head, body_raw) = match raw.split_once("\r\n\r\n") {
            Some(parts) => parts,
            None => raw.split_once("\n\n").unwrap_or((raw, "")),
        };

        let mut lines = head.lines();
        let command_line = lines.next().ok_or(FrameError::Empty)?;
        if command_line.is_empty() {
            return Err(FrameError::Empty);
        }
        let command = StompCommand::parse(command_line)?;
        let unescape_headers = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if unescape_headers {
                headers.push((unescape_header(name), unescape_header(value)));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Self {
            command,
            headers,
            body: String::new(),
        };

        let body = match frame
            .get_header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
        {
            Some(len) => match body_raw.as_bytes().get(..len) {
                Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                // content-length past the buffer: fall back to the NUL split
                None => body_raw.split('\0').next().unwrap_or("").to_string(),
            },
            None => body_raw.split('\0').next().unwrap_or("").to_string(),
        };

        Ok(Self { body, ..frame })
    }
}

/// The STOMP heartbeat: a text message carrying only EOL
pub fn is_heartbeat(raw: &str) -> bool {
    !raw.is_empty() && raw.trim_matches(|c| c == '\r' || c == '\n').is_empty()
}

/// Wire form of an outgoing heartbeat
pub const HEARTBEAT: &str = "\n";

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            // Undefined escape: keep it verbatim
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
