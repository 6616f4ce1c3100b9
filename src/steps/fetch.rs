//! Downloads the newest mailed price list and splits it by brand.

use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::catalog::CatalogMapping;
use crate::config::{ImapSettings, PathSettings};
use crate::error::Result;
use crate::mailbox::imap::TlsStream;
use crate::mailbox::{
    find_latest_attachment, AttachmentQuery, FilenamePattern, FoundAttachment, ImapSession,
    Mailbox,
};
use crate::pricelist::archive::{extract_zip, is_zip, pick_price_file};
use crate::pricelist::{read_table, sanitize_filename, split_by_brand, SplitSummary};
use crate::retry::RetryPolicy;

pub const EXTRACT_SUBDIR: &str = "extracted";

#[derive(Debug, Clone)]
pub struct FetchSummary {
    pub attachment: String,
    pub price_file: PathBuf,
    pub split: SplitSummary,
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' -> {} brand file(s), {} of {} row(s) matched",
            self.attachment,
            self.split.files.len(),
            self.split.matched_rows,
            self.split.total_rows
        )
    }
}

impl AttachmentQuery {
    pub fn from_settings(imap: &ImapSettings) -> Result<Self> {
        Ok(Self {
            sender: imap.email_from.clone(),
            pattern: FilenamePattern::new(&imap.attachment_pattern)?,
            subject: imap.subject_filter.clone(),
            max_checked: imap.max_messages_checked,
        })
    }
}

/// Connects, logs in and selects `INBOX`, retrying transient failures.
pub fn open_mailbox(imap: &ImapSettings) -> Result<ImapSession<TlsStream>> {
    let retry = RetryPolicy::from_settings(&imap.http);
    open_with_retry(imap, &retry, || {
        ImapSession::connect_tls(&imap.server, imap.port, imap.http.timeout)
    })
}

/// Every attempt starts from a fresh connection made by `connect`.
pub fn open_with_retry<S, C>(
    imap: &ImapSettings,
    retry: &RetryPolicy,
    mut connect: C,
) -> Result<ImapSession<S>>
where
    S: Read + Write,
    C: FnMut() -> Result<ImapSession<S>>,
{
    retry.run("IMAP login", || {
        let mut session = connect()?;
        session.login(&imap.login, &imap.password)?;
        session.select("INBOX")?;
        Ok(session)
    })
}

/// Searches the mailbox and always closes it, whatever the search outcome.
pub fn download_attachment(
    mailbox: &mut dyn Mailbox,
    query: &AttachmentQuery,
) -> Result<FoundAttachment> {
    let found = find_latest_attachment(mailbox, query);
    if let Err(e) = mailbox.close() {
        warn!("Closing the mailbox failed: {e}");
    }
    found
}

/// Saves the attachment, unpacks it when it is an archive, and splits the
/// price table into `TARGET_DIR`.
pub fn process_attachment(
    found: &FoundAttachment,
    paths: &PathSettings,
    brands: &[String],
    mapping: Option<&CatalogMapping>,
) -> Result<FetchSummary> {
    let saved = save_attachment(found, &paths.download_dir)?;

    let price_file = if is_zip(&saved)? {
        let extracted = extract_zip(&saved, &paths.download_dir.join(EXTRACT_SUBDIR))?;
        if let Err(e) = fs::remove_file(&saved) {
            warn!("Could not delete archive {}: {e}", saved.display());
        }
        pick_price_file(&extracted)?
    } else {
        saved
    };
    info!("Price table: {}", price_file.display());

    let rows = read_table(&price_file)?;
    let split = split_by_brand(&rows, brands, mapping, &paths.target_dir)?;
    let summary = FetchSummary {
        attachment: found.filename.clone(),
        price_file,
        split,
    };
    info!("Price fetch finished: {summary}");
    Ok(summary)
}

fn save_attachment(found: &FoundAttachment, download_dir: &Path) -> Result<PathBuf> {
    // Only the final component of the advertised name is trusted.
    let name = Path::new(&found.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .map(sanitize_filename)
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .unwrap_or_else(|| "attachment.bin".to_string());
    fs::create_dir_all(download_dir)?;
    let path = download_dir.join(name);
    fs::write(&path, &found.data)?;
    info!(
        "Saved attachment ({} bytes) to {}",
        found.data.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
