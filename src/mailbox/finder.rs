use std::cmp::Reverse;

use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use mail_parser::{MessageParser, MimeHeaders};
use regex::Regex;

use super::Mailbox;
use crate::error::{Result, SyncError};

/// Attachment file name matcher: an exact name or a `*`/`?` wildcard
/// pattern, both case-insensitive.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    raw: String,
    wildcard: Option<Regex>,
}

impl FilenamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let raw = pattern.trim().to_string();
        if raw.is_empty() {
            return Err(SyncError::config("ATTACHMENT_FILENAME", "pattern is empty"));
        }
        let wildcard = if raw.contains(['*', '?']) {
            let mut expr = String::from("(?i)^");
            for ch in raw.chars() {
                match ch {
                    '*' => expr.push_str(".*"),
                    '?' => expr.push('.'),
                    other => expr.push_str(&regex::escape(&other.to_string())),
                }
            }
            expr.push('$');
            let regex = Regex::new(&expr).map_err(|e| {
                SyncError::config("ATTACHMENT_FILENAME", format!("invalid pattern: {e}"))
            })?;
            Some(regex)
        } else {
            None
        };
        Ok(Self { raw, wildcard })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        let file_name = file_name.trim();
        match &self.wildcard {
            Some(regex) => regex.is_match(file_name),
            None => file_name.to_lowercase() == self.raw.to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// What to look for in the mailbox.
#[derive(Debug, Clone)]
pub struct AttachmentQuery {
    pub sender: String,
    pub pattern: FilenamePattern,
    /// Case-insensitive substring the subject must contain
    pub subject: Option<String>,
    /// How many of the newest matching messages are downloaded at most
    pub max_checked: usize,
}

#[derive(Debug, Clone)]
pub struct FoundAttachment {
    pub seq: u32,
    pub date: Option<DateTime<FixedOffset>>,
    pub subject: Option<String>,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Finds the newest message from the sender carrying a matching attachment.
///
/// Only the `Date` header of every hit is fetched up front; full messages are
/// downloaded newest first, up to `max_checked` of them. Connection failures
/// abort the search, anything else wrong with a single message is logged and
/// the message skipped.
pub fn find_latest_attachment(
    mailbox: &mut dyn Mailbox,
    query: &AttachmentQuery,
) -> Result<FoundAttachment> {
    let hits = mailbox.search_from(&query.sender)?;
    if hits.is_empty() {
        return Err(SyncError::MessageNotFound(format!(
            "no messages from {}",
            query.sender
        )));
    }
    info!("Found {} message(s) from {}", hits.len(), query.sender);

    let mut dated = Vec::with_capacity(hits.len());
    for seq in hits {
        let date = match mailbox.fetch_date_header(seq) {
            Ok(Some(raw)) => parse_mail_date(&raw).or_else(|| {
                warn!("Message {seq}: unparseable Date header '{raw}'");
                None
            }),
            Ok(None) => None,
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                warn!("Message {seq}: could not read Date header: {e}");
                None
            }
        };
        dated.push((seq, date));
    }
    // Newest first; undated messages last, higher sequence numbers first.
    dated.sort_by_key(|&(seq, date)| Reverse((date, seq)));

    let checked = dated.len().min(query.max_checked);
    for &(seq, date) in dated.iter().take(query.max_checked) {
        let raw = match mailbox.fetch_message(seq) {
            Ok(raw) => raw,
            Err(e) if e.is_connectivity() => return Err(e),
            Err(e) => {
                warn!("Message {seq}: skipped, {e}");
                continue;
            }
        };
        let Some(message) = MessageParser::default().parse(&raw[..]) else {
            warn!("Message {seq}: could not be parsed as MIME, skipped");
            continue;
        };

        let subject = message.subject().map(str::to_string);
        if let Some(wanted) = &query.subject {
            let actual = subject.as_deref().unwrap_or_default().to_lowercase();
            if !actual.contains(&wanted.to_lowercase()) {
                debug!("Message {seq}: subject {subject:?} does not match, skipped");
                continue;
            }
        }

        for part in message.attachments() {
            let Some(name) = part.attachment_name() else {
                continue;
            };
            if query.pattern.matches(name) {
                info!(
                    "Using attachment '{name}' from message {seq} ({})",
                    date.map(|d| d.to_rfc2822())
                        .unwrap_or_else(|| "undated".to_string())
                );
                return Ok(FoundAttachment {
                    seq,
                    date,
                    subject,
                    filename: name.to_string(),
                    data: part.contents().to_vec(),
                });
            }
            debug!("Message {seq}: attachment '{name}' does not match");
        }
    }

    Err(SyncError::MessageNotFound(format!(
        "none of the {checked} newest messages from {} has an attachment matching '{}'",
        query.sender,
        query.pattern.as_str()
    )))
}

/// Parses an RFC 2822 date, tolerating a trailing `(zone name)` comment.
fn parse_mail_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw).ok().or_else(|| {
        let without_comment = raw.split_once('(').map(|(head, _)| head.trim())?;
        DateTime::parse_from_rfc2822(without_comment).ok()
    })
}

#[cfg(test)]
#[path = "finder_tests.rs"]
mod tests;
