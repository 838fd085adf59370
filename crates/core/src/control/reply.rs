/// Control protocol replies
///
/// A reply is one or more lines sharing a three digit status:
/// `250-` continues, `250+` starts a dot-terminated data block and
/// `250 ` ends the reply.

use super::ControlError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Asynchronous event, not an answer to a command
    pub fn is_event(&self) -> bool {
        (600..700).contains(&self.status)
    }

    /// Text of the final line.
    pub fn message(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    /// Value of the first `KEY=value` line.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
    }
}

/// Assembles replies from lines as they arrive
#[derive(Debug, Default)]
pub struct ReplyParser {
    status: Option<u16>,
    lines: Vec<String>,
    data: Option<String>,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (line ending optional). Returns the reply once complete.
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>, ControlError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(data) = self.data.as_mut() {
            if line == "." {
                let block = self.data.take().unwrap_or_default();
                self.lines.push(block);
            } else {
                let unstuffed = if line.starts_with("..") { &line[1..] } else { line };
                data.push('\n');
                data.push_str(unstuffed);
            }
            return Ok(None);
        }

        let malformed = || ControlError::Malformed(line.to_string());
        let code = line.get(..3).ok_or_else(malformed)?;
        if !code.bytes().all(|b| b.is_ascii_digit()) || line.len() < 4 {
            return Err(malformed());
        }
        let status: u16 = code.parse().map_err(|_| malformed())?;
        if self.status.is_some_and(|s| s != status) {
            return Err(malformed());
        }

        let text = line.get(4..).ok_or_else(malformed)?;
        match line.as_bytes()[3] {
            b'-' => {
                self.status = Some(status);
                self.lines.push(text.to_string());
                Ok(None)
            }
            b'+' => {
                self.status = Some(status);
                self.data = Some(text.to_string());
                Ok(None)
            }
            b' ' => {
                self.lines.push(text.to_string());
                self.status = None;
                Ok(Some(Reply {
                    status,
                    lines: std::mem::take(&mut self.lines),
                }))
            }
            _ => Err(malformed()),
        }
    }
}

/// Answer to `PROTOCOLINFO`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub auth_methods: Vec<String>,
    pub cookie_file: Option<PathBuf>,
    pub tor_version: Option<String>,
}

impl ProtocolInfo {
    pub fn from_reply(reply: &Reply) -> Result<Self, ControlError> {
        let mut info = ProtocolInfo::default();

        for line in &reply.lines {
            if let Some(rest) = line.strip_prefix("AUTH ") {
                for (key, value) in parse_key_values(rest)? {
                    match key.as_str() {
                        "METHODS" => {
                            info.auth_methods = value.split(',').map(str::to_string).collect()
                        }
                        "COOKIEFILE" => info.cookie_file = Some(PathBuf::from(value)),
                        _ => {}
                    }
                }
            } else if let Some(rest) = line.strip_prefix("VERSION ") {
                info.tor_version = parse_key_values(rest)?
                    .into_iter()
                    .find(|(key, _)| key == "Tor")
                    .map(|(_, value)| value);
            }
        }

        Ok(info)
    }

    pub fn supports(&self, method: &str) -> bool {
        self.auth_methods.iter().any(|m| m == method)
    }
}

/// Quote a string for use as a command argument.
pub(crate) fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Split `KEY=value KEY="quoted value"` pairs.
fn parse_key_values(mut s: &str) -> Result<Vec<(String, String)>, ControlError> {
    let mut pairs = Vec::new();

    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }

        let (key, rest) = s
            .split_once('=')
            .ok_or_else(|| ControlError::Malformed(s.to_string()))?;
        if key.contains(' ') {
            return Err(ControlError::Malformed(s.to_string()));
        }

        let (value, rest) = if rest.starts_with('"') {
            unquote(rest)?
        } else {
            match rest.find(' ') {
                Some(end) => (rest[..end].to_string(), &rest[end..]),
                None => (rest.to_string(), ""),
            }
        };

        pairs.push((key.to_string(), value));
        s = rest;
    }

    Ok(pairs)
}

/// Read a quoted string off the front of `s`, returning it and the remainder.
fn unquote(s: &str) -> Result<(String, &str), ControlError> {
    let mut value = String::new();
    let mut chars = s.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            '"' => return Ok((value, &s[i + 1..])),
            c => value.push(c),
        }
    }

    Err(ControlError::Malformed(format!("unterminated string: {}", s)))
}
