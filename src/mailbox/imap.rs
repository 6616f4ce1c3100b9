//! Minimal IMAP4rev1 client: just enough to search a mailbox and download
//! messages without marking them as read.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::Mailbox;
use crate::error::{Result, SyncError};

pub type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// One untagged response line with any `{n}` literals it carried.
#[derive(Debug, Default, Clone)]
pub struct ResponseLine {
    pub text: String,
    pub literals: Vec<Vec<u8>>,
}

/// An authenticated-or-not IMAP session over any byte stream.
pub struct ImapSession<S: Read + Write> {
    reader: BufReader<S>,
    next_tag: u32,
}

impl ImapSession<TlsStream> {
    /// Opens a TCP connection and wraps it in TLS (implicit TLS, port 993).
    pub fn connect_tls(server: &str, port: u16, timeout: Duration) -> Result<Self> {
        info!("Connecting to IMAP server {server}:{port}");
        let tcp = connect_tcp(server, port, timeout)?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
        );
        let server_name = rustls::pki_types::ServerName::try_from(server.to_string())
            .map_err(|e| SyncError::Imap(format!("invalid server name '{server}': {e}")))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)?;

        Self::new(rustls::StreamOwned::new(conn, tcp))
    }
}

fn connect_tcp(server: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in (server, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => {
                tcp.set_read_timeout(Some(timeout))?;
                tcp.set_write_timeout(Some(timeout))?;
                return Ok(tcp);
            }
            Err(e) => {
                debug!("Connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(SyncError::Io(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address found for {server}"),
        )
    })))
}

impl<S: Read + Write> ImapSession<S> {
    /// Wraps an open stream and consumes the server greeting.
    pub fn new(stream: S) -> Result<Self> {
        let mut session = Self {
            reader: BufReader::new(stream),
            next_tag: 1,
        };
        let greeting = session.read_line()?;
        let status = greeting.trim_end();
        debug!("IMAP greeting: {status}");
        if !(status.starts_with("* OK") || status.starts_with("* PREAUTH")) {
            return Err(SyncError::Imap(format!("unexpected greeting: {status}")));
        }
        Ok(session)
    }

    pub fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let command = format!("LOGIN {} {}", imap_quote(user), imap_quote(password));
        self.command_labeled(&command, "LOGIN")?;
        info!("Logged in to IMAP as {user}");
        Ok(())
    }

    pub fn select(&mut self, mailbox: &str) -> Result<()> {
        let lines = self.command(&format!("SELECT {}", imap_quote(mailbox)))?;
        let exists = lines
            .iter()
            .find_map(|l| {
                let mut parts = l.text.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("*"), Some(n), Some("EXISTS")) => n.parse::<u64>().ok(),
                    _ => None,
                }
            })
            .unwrap_or(0);
        info!("Selected {mailbox} ({exists} messages)");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.command("LOGOUT")?;
        debug!("Logged out of IMAP");
        Ok(())
    }

    fn command(&mut self, command: &str) -> Result<Vec<ResponseLine>> {
        let label = command.split_whitespace().next().unwrap_or("command").to_string();
        self.command_labeled(command, &label)
    }

    /// Sends a tagged command and collects untagged lines until the tagged
    /// completion. `label` is what gets logged, so credentials stay out of
    /// the logs.
    fn command_labeled(&mut self, command: &str, label: &str) -> Result<Vec<ResponseLine>> {
        let tag = format!("A{:04}", self.next_tag);
        self.next_tag += 1;
        debug!("IMAP > {tag} {label}");

        let stream = self.reader.get_mut();
        stream.write_all(format!("{tag} {command}\r\n").as_bytes())?;
        stream.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_response_line()?;
            let text = line.text.trim_end();
            if let Some(rest) = text.strip_prefix(tag.as_str()).and_then(|r| r.strip_prefix(' ')) {
                debug!("IMAP < {tag} {rest}");
                if rest.starts_with("OK") {
                    return Ok(lines);
                }
                return Err(SyncError::Imap(format!("{label} failed: {rest}")));
            }
            if text.starts_with("* BYE") && label != "LOGOUT" {
                return Err(SyncError::Imap(format!("server closed session: {text}")));
            }
            lines.push(line);
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "IMAP connection closed",
            )));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Reads one logical response line, pulling in `{n}` literals byte-exact.
    fn read_response_line(&mut self) -> Result<ResponseLine> {
        let mut response = ResponseLine::default();
        loop {
            let line = self.read_line()?;
            match literal_size(&line) {
                Some(size) => {
                    let mut literal = vec![0u8; size];
                    self.reader.read_exact(&mut literal)?;
                    response.text.push_str(line.trim_end());
                    response.literals.push(literal);
                }
                None => {
                    response.text.push_str(&line);
                    return Ok(response);
                }
            }
        }
    }

    fn fetch_literal(&mut self, seq: u32, item: &str) -> Result<Option<Vec<u8>>> {
        let lines = self.command(&format!("FETCH {seq} {item}"))?;
        let prefix = format!("* {seq} FETCH");
        Ok(lines
            .into_iter()
            .filter(|l| l.text.starts_with(&prefix))
            .find_map(|l| l.literals.into_iter().next()))
    }
}

impl<S: Read + Write> Mailbox for ImapSession<S> {
    fn search_from(&mut self, sender: &str) -> Result<Vec<u32>> {
        let lines = self.command(&format!("SEARCH FROM {}", imap_quote(sender)))?;
        let ids: Vec<u32> = lines
            .iter()
            .filter_map(|l| l.text.trim_end().strip_prefix("* SEARCH"))
            .flat_map(|rest| rest.split_whitespace())
            .filter_map(|n| n.parse().ok())
            .collect();
        debug!("SEARCH FROM {sender}: {} hit(s)", ids.len());
        Ok(ids)
    }

    fn fetch_date_header(&mut self, seq: u32) -> Result<Option<String>> {
        let header = self.fetch_literal(seq, "(BODY.PEEK[HEADER.FIELDS (DATE)])")?;
        Ok(header.and_then(|raw| header_value(&String::from_utf8_lossy(&raw), "Date")))
    }

    fn fetch_message(&mut self, seq: u32) -> Result<Vec<u8>> {
        match self.fetch_literal(seq, "BODY.PEEK[]")? {
            Some(raw) => {
                debug!("Fetched message {seq}: {} bytes", raw.len());
                Ok(raw)
            }
            None => {
                warn!("FETCH {seq} returned no message body");
                Err(SyncError::Imap(format!("message {seq} has no body")))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.logout()
    }
}

/// Size of a trailing `{n}` literal marker, if the line ends with one.
fn literal_size(line: &str) -> Option<usize> {
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line.strip_suffix('}')?;
    let open = body.rfind('{')?;
    body[open + 1..].trim_end_matches('+').parse().ok()
}

/// Quotes a string for use as an IMAP quoted argument.
pub fn imap_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Value of a header in a raw header block, with folded lines joined.
fn header_value(block: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;
    for line in block.lines() {
        if let Some(current) = value.as_mut() {
            if line.starts_with(' ') || line.starts_with('\t') {
                current.push(' ');
                current.push_str(line.trim());
                continue;
            }
            break;
        }
        if let Some((key, rest)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                value = Some(rest.trim().to_string());
            }
        }
    }
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "imap_tests.rs"]
mod tests;
