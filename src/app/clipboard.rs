//! An abstraction layer over the system clipboard to enable testing.

use anyhow::Result;
use std::io::Write;
use std::sync::Mutex;

/// Destination of the "copy all" payload.
/// This allows for a mock implementation during tests, avoiding the need
/// to touch the real system clipboard.
pub trait ClipboardService: Send + Sync {
    fn set_text(&self, text: &str) -> Result<()>;
}

/// The production implementation backed by `arboard`.
///
/// The handle is opened on first use and kept for the life of the process,
/// since on X11 the copied text is only served while its owner is alive.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardService for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("Clipboard mutex was poisoned"))?;
        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new()?);
        }
        match guard.as_mut() {
            Some(clipboard) => clipboard.set_text(text)?,
            None => anyhow::bail!("Clipboard is not available"),
        }
        Ok(())
    }
}

/// Writes the payload to standard output instead of the clipboard.
pub struct StdoutClipboard;

impl ClipboardService for StdoutClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        Ok(())
    }
}
