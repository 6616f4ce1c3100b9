//! Mailbox access used by the price fetcher.

mod finder;
pub mod imap;

pub use finder::{find_latest_attachment, AttachmentQuery, FilenamePattern, FoundAttachment};
pub use imap::ImapSession;

use crate::error::Result;

/// The few mailbox operations the fetcher needs, addressed by message
/// sequence number within the selected folder.
pub trait Mailbox {
    fn search_from(&mut self, sender: &str) -> Result<Vec<u32>>;

    /// Raw `Date` header value, `None` if the message has none.
    fn fetch_date_header(&mut self, seq: u32) -> Result<Option<String>>;

    /// Full RFC 822 message. Must not set the `\Seen` flag.
    fn fetch_message(&mut self, seq: u32) -> Result<Vec<u8>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
