//! Clipboard copy with a terminal fallback.
//!
//! The desktop clipboard is tried first through `arboard`. Over SSH or on a
//! headless box there is none, so the text is sent as an OSC 52 escape
//! sequence, which most terminal emulators turn into a clipboard write. A
//! failed copy is reported to the caller as `false` and is never an error.

use std::io::{IsTerminal, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Something that can receive copied text.
pub trait Clipboard {
    /// Copy `text`. Returns whether any mechanism accepted it.
    fn copy(&self, text: &str) -> bool;
}

/// The real desktop clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> bool {
        copy_to_clipboard(text)
    }
}

/// Copy `text` using the first mechanism that works.
pub fn copy_to_clipboard(text: &str) -> bool {
    native_copy(text).is_ok() || osc52_copy(text)
}

fn native_copy(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_owned())
}

/// Escape sequence asking the terminal to set the clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

fn osc52_copy(text: &str) -> bool {
    let mut stderr = std::io::stderr();
    if !stderr.is_terminal() {
        return false;
    }
    stderr
        .write_all(osc52_sequence(text).as_bytes())
        .and_then(|()| stderr.flush())
        .is_ok()
}
