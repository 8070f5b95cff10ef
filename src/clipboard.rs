use anyhow::Context;

use crate::backend::Clipboard;

/// Desktop clipboard through arboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn read_text(&self) -> anyhow::Result<Option<String>> {
        let mut clip = arboard::Clipboard::new().context("init clipboard")?;
        let text = match clip.get_text() {
            Ok(text) => text,
            // Non-text content (e.g. an image) reads as "nothing to paste".
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => return Err(e).context("get clipboard text"),
        };
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}
