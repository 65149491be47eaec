use std::io::Read;

use tracing::warn;

use crate::entry::Entry;
use crate::error::EntryError;

pub const SELECT_PROMPT: &str = "Select a file to see a preview";
pub const NO_PREVIEW: &str = "No preview available for this file type";
pub const READ_FAILED: &str = "Could not read file for preview";
pub const INVALID_ROOT: &str = "Please provide a valid path";

/// How a selected entry should be previewed, decided without any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Nothing selected.
    Placeholder,
    Unsupported,
    Text,
    Image { svg: bool },
}

impl PreviewKind {
    pub fn classify(entry: Option<&dyn Entry>) -> Self {
        let Some(entry) = entry else {
            return PreviewKind::Placeholder;
        };
        let Some(content_type) = entry.content_type() else {
            return PreviewKind::Unsupported;
        };

        match content_type.split('/').next().unwrap_or_default() {
            "text" => PreviewKind::Text,
            "image" => PreviewKind::Image {
                svg: content_type == "image/svg+xml",
            },
            _ => PreviewKind::Unsupported,
        }
    }

    /// Whether showing this kind requires reading the content stream.
    pub fn needs_read(&self) -> bool {
        matches!(self, PreviewKind::Text | PreviewKind::Image { .. })
    }
}

/// What the preview pane currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Placeholder,
    Unsupported,
    Loading,
    Text { text: String, truncated: bool },
    /// Raw image bytes; decoding is left to the host.
    Image {
        content_type: String,
        svg: bool,
        bytes: Vec<u8>,
        truncated: bool,
    },
    Failed,
}

impl Preview {
    /// Fixed message for the non-content states.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Preview::Placeholder => Some(SELECT_PROMPT),
            Preview::Unsupported => Some(NO_PREVIEW),
            Preview::Failed => Some(READ_FAILED),
            _ => None,
        }
    }

    /// State shown before (or instead of) a read.
    pub fn initial(kind: PreviewKind) -> Self {
        match kind {
            PreviewKind::Placeholder => Preview::Placeholder,
            PreviewKind::Unsupported => Preview::Unsupported,
            PreviewKind::Text | PreviewKind::Image { .. } => Preview::Loading,
        }
    }
}

/// Read the entry's content for display. The stream is dropped on every
/// return path.
pub fn read_preview(entry: &dyn Entry, kind: PreviewKind, max_bytes: usize) -> Preview {
    if !kind.needs_read() {
        return Preview::initial(kind);
    }

    let (bytes, truncated) = match read_limited(entry, max_bytes) {
        Ok(read) => read,
        Err(err) => {
            warn!(entry = entry.label(), error = %err, "preview read failed");
            return Preview::Failed;
        }
    };

    match kind {
        PreviewKind::Text => Preview::Text {
            text: decode_text(bytes),
            truncated,
        },
        PreviewKind::Image { svg } => Preview::Image {
            content_type: entry.content_type().unwrap_or_default().to_string(),
            svg,
            bytes,
            truncated,
        },
        _ => Preview::initial(kind),
    }
}

fn read_limited(entry: &dyn Entry, max_bytes: usize) -> Result<(Vec<u8>, bool), EntryError> {
    let stream = entry.open_content()?;
    let mut bytes = Vec::new();
    // One extra byte tells us whether the content was cut.
    stream
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| EntryError::io(entry.label(), e))?;

    let truncated = bytes.len() > max_bytes;
    bytes.truncate(max_bytes);
    Ok((bytes, truncated))
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
