use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading bytes inspected when the extension is unknown.
const SNIFF_LEN: usize = 512;

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("rs", "text/x-rust"),
    ("toml", "text/x-toml"),
    ("yaml", "text/yaml"),
    ("yml", "text/yaml"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("kt", "text/x-kotlin"),
    ("py", "text/x-python"),
    ("sh", "text/x-shellscript"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("xml", "text/xml"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("mkv", "video/x-matroska"),
];

/// Decides the content type of a leaf. Swappable so hosts can plug in their
/// own inference.
pub trait ContentTypePolicy: Send + Sync {
    fn guess(&self, path: &Path) -> Option<String>;
}

/// Extension lookup with optional content sniffing for unknown extensions.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionPolicy {
    pub sniff_unknown: bool,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self {
            sniff_unknown: true,
        }
    }
}

impl ContentTypePolicy for ExtensionPolicy {
    fn guess(&self, path: &Path) -> Option<String> {
        if let Some(found) = from_extension(path) {
            return Some(found.to_string());
        }
        if !self.sniff_unknown {
            return None;
        }
        let head = read_head(path)?;
        sniff(&head).map(str::to_string)
    }
}

pub fn from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    Some(head)
}

/// Classify a byte prefix by magic number, falling back to "is it text".
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    const MAGIC: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
    ];

    if head.is_empty() {
        return Some("text/plain");
    }
    for (magic, mime) in MAGIC {
        if head.starts_with(magic) {
            return Some(mime);
        }
    }
    if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if head.contains(&0) {
        return None;
    }
    // A multi-byte char may be cut at the sniff boundary.
    let text = match std::str::from_utf8(head) {
        Ok(text) => text,
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&head[..err.valid_up_to()]).ok()?
        }
        Err(_) => return None,
    };
    let trimmed = text.trim_start();
    if trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && trimmed.contains("<svg")) {
        return Some("image/svg+xml");
    }
    Some("text/plain")
}
